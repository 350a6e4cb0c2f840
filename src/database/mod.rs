pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod repository;

use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, StoreBackend};
use models::Journal;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryRepository;
pub use postgres::PgRepository;
pub use repository::{Entity, Repository};

/// Open the journal store selected by configuration, migrating PostgreSQL
/// first when `run_migrations` is set
pub async fn open_repository(config: &AppConfig) -> Result<Arc<dyn Repository<Journal>>, DatabaseError> {
    match config.database.backend {
        StoreBackend::Memory => {
            info!("Using in-memory journal store");
            Ok(Arc::new(MemoryRepository::<Journal>::new()))
        }
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            if config.database.run_migrations {
                DatabaseManager::migrate(&pool).await?;
            }
            Ok(Arc::new(PgRepository::<Journal>::new(pool)))
        }
    }
}
