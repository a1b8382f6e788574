//! Persistence capability for shelf: explicit table mappings, a canonical
//! condition tree, and SQLite / in-memory store backends.

use std::sync::Arc;

pub mod condition;
pub mod entity;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod store;
pub mod value;

pub use condition::Condition;
pub use entity::{Entity, EntityRepository};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use schema::{ColumnMapping, IdentityStrategy, TableMapping};
pub use sqlite::SqliteStore;
pub use store::{Page, Record, Select, Store};
pub use value::{ColumnType, Value};

/// Open the store named by `url`.
///
/// Accepted forms: `sqlite::memory:`, `sqlite://<path>`, `memory://`.
pub fn open(url: &str) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match url {
        "sqlite::memory:" => Arc::new(SqliteStore::open_in_memory()?),
        "memory://" => Arc::new(MemoryStore::new()),
        _ => match url.strip_prefix("sqlite://") {
            Some(path) if !path.is_empty() => Arc::new(SqliteStore::open(path)?),
            _ => return Err(StoreError::UnsupportedUrl(url.to_string())),
        },
    };
    tracing::info!(target: "shelf-db", backend = store.backend(), "store ready");
    Ok(store)
}
