pub mod books;

use std::sync::Arc;

use libris_db::{DbModule, DbPool};
use libris_kernel::settings::Settings;
use libris_kernel::ModuleRegistry;

use books::memory::InMemoryStore;
use books::postgres::PgCatalogStore;
use books::service::BooksService;

/// Register the `db` core module (when a pool is given) and every feature
/// module.
///
/// Without a pool the catalog runs on the in-memory store.
pub fn register_all(registry: &mut ModuleRegistry, settings: &Settings, pool: Option<DbPool>) {
    let service = match pool {
        Some(pool) => {
            registry.register_core(Arc::new(DbModule::new(pool.clone())));
            BooksService::from_store(Arc::new(PgCatalogStore::new(pool)))
        }
        None => {
            tracing::warn!("no database pool configured, catalog data is kept in memory");
            BooksService::from_store(Arc::new(InMemoryStore::new()))
        }
    };

    registry.register_custom(books::create_module(
        Arc::new(service),
        settings.catalog.clone(),
    ));
}
