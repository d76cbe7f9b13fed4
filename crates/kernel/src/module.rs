use async_trait::async_trait;
use axum::Router;

/// Context handed to modules during initialization and start-up.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// SQL migration contributed by a module.
///
/// `id` must sort in application order within its module
/// (e.g. `001_catalog`, `002_isbn_index`).
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Lifecycle contract shared by core and feature modules.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context.
    /// Core modules run before migrations, feature modules after.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes mounted under `/api/{module_name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` and `components.schemas`) merged into the
    /// served document
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Migrations contributed by this module, in application order
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Called once every module is initialized and migrations are applied
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release resources during shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
