use anyhow::Context;
use clap::{Parser, Subcommand};
use libris_kernel::settings::Settings;
use libris_kernel::ModuleRegistry;

#[derive(Debug, Parser)]
#[command(name = "libris-cli", about = "Operator commands for the libris catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations to the configured Postgres database
    Migrate,
    /// Print the effective settings as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().with_context(|| "failed to load libris settings")?;
    libris_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Migrate => migrate(&settings).await,
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .with_context(|| "failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
    }
}

async fn migrate(settings: &Settings) -> anyhow::Result<()> {
    let pool = libris_db::create_pool(&settings.database)?;

    let mut registry = ModuleRegistry::new();
    libris_app::modules::register_all(&mut registry, settings, Some(pool.clone()));

    let applied = libris_db::migrate(&pool, &registry.collect_migrations()).await?;
    tracing::info!(applied, "migrations applied");

    pool.close().await;
    Ok(())
}
