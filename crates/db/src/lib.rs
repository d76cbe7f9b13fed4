//! Postgres pool factory, the `db` core module, and the migration runner.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use libris_kernel::settings::DatabaseSettings;
use libris_kernel::{InitCtx, Migration, Module};
use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Ledger of applied migrations, keyed by `(module, id)`.
const LEDGER_DDL: &str = "\
    CREATE TABLE IF NOT EXISTS libris_migrations (\
        module TEXT NOT NULL, \
        id TEXT NOT NULL, \
        applied_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
        PRIMARY KEY (module, id))";

/// Create a lazily-connecting pool from database settings.
///
/// No connection is opened until first use; the `db` module verifies
/// connectivity during init.
pub fn create_pool(settings: &DatabaseSettings) -> anyhow::Result<DbPool> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
        .connect_lazy(&settings.url)
        .with_context(|| "invalid database url")
}

/// Core module owning the connection pool lifecycle.
pub struct DbModule {
    pool: DbPool,
}

impl DbModule {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Module for DbModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .with_context(|| "database is unreachable")?;
        tracing::info!(target: "libris-db", "database connection verified");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.pool.close().await;
        tracing::info!(target: "libris-db", "database pool closed");
        Ok(())
    }
}

/// Migrations from `candidates` not yet recorded in `applied`, order kept.
pub fn pending_migrations<'a>(
    applied: &HashSet<(String, String)>,
    candidates: &'a [(String, Migration)],
) -> Vec<&'a (String, Migration)> {
    candidates
        .iter()
        .filter(|(module, migration)| {
            !applied.contains(&(module.clone(), migration.id.to_string()))
        })
        .collect()
}

/// Apply pending migrations, each in its own transaction.
///
/// Returns the number of migrations applied.
pub async fn migrate(pool: &DbPool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::raw_sql(LEDGER_DDL)
        .execute(pool)
        .await
        .with_context(|| "failed to create migration ledger")?;

    let applied: HashSet<(String, String)> =
        sqlx::query_as::<_, (String, String)>("SELECT module, id FROM libris_migrations")
            .fetch_all(pool)
            .await
            .with_context(|| "failed to read migration ledger")?
            .into_iter()
            .collect();

    let pending = pending_migrations(&applied, migrations);
    for (module, migration) in &pending {
        tracing::info!(
            target: "libris-db",
            module = %module,
            id = migration.id,
            "applying migration"
        );

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;
        sqlx::query("INSERT INTO libris_migrations (module, id) VALUES ($1, $2)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    Ok(pending.len())
}
