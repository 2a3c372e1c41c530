//! Store backend selection

use std::sync::Arc;
use tracing::debug;
use widecolumn::{MemoryStore, SqliteStore, StoreError, WideColumnStore};

use crate::config::{StoreBackend, StoreConfig};

/// Open the store backend named in the config
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn WideColumnStore>, StoreError> {
    debug!(backend = ?config.backend, app_profile = %config.app_profile, "create_store: called");
    match config.backend {
        StoreBackend::Sqlite => {
            debug!(path = %config.path.display(), "create_store: opening SQLite store");
            Ok(Arc::new(SqliteStore::open(&config.path)?))
        }
        StoreBackend::Memory => {
            debug!("create_store: using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
