use anyhow::Context;
use libris_app::modules;
use libris_kernel::settings::{Settings, StoreBackend};
use libris_kernel::{InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load libris settings")?;
    libris_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.database.backend,
        "libris-app bootstrap starting"
    );

    let pool = match settings.database.backend {
        StoreBackend::Postgres => Some(libris_db::create_pool(&settings.database)?),
        StoreBackend::Memory => None,
    };

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &settings, pool.clone());
    tracing::info!(
        core = registry.core_module_count(),
        custom = registry.custom_module_count(),
        "modules registered"
    );

    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_core_modules(&ctx).await?;
    if let Some(pool) = &pool {
        let applied = libris_db::migrate(pool, &registry.collect_migrations())
            .await
            .with_context(|| "failed to apply migrations")?;
        tracing::info!(applied, "migrations up to date");
    }
    registry.init_custom_modules(&ctx).await?;

    registry.start_core_modules(&ctx).await?;
    registry.start_custom_modules(&ctx).await?;

    let served = libris_http::start_server(&registry, &settings).await;

    registry.stop_custom_modules().await?;
    registry.stop_core_modules().await?;

    served
}
