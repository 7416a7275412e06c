//! Storage for the rental store's collections.
//!
//! [`DocumentStore`] is the one interface callers depend on. Two backends
//! implement it:
//!
//! | Type | Mode |
//! |------|------|
//! | [`JsonFileStore`] | one JSON file holding every collection (development) |
//! | [`sqlite::SqliteDocumentStore`] | SQLite `documents` table (production) |
//!
//! [`Backend`] picks one of them from configuration at startup.

mod backend;
mod filter;
mod json_store;
mod schema;
pub mod sqlite;
mod traits;

pub use backend::Backend;
pub use filter::Filter;
pub use json_store::{JsonFileStore, DB_FILE_NAME};
pub use schema::{Collection, CollectionCounts, Document, StoreSchema};
pub use traits::DocumentStore;

use crate::models::RequestStatus;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Conflict in {collection}: {reason}")]
    Conflict {
        collection: Collection,
        reason: String,
    },
    #[error("Invalid record for {collection}: {reason}")]
    Invalid {
        collection: Collection,
        reason: String,
    },
    #[error("Request {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: RequestStatus,
        to: RequestStatus,
    },
    #[error("Gave up updating {collection}/{id} after {attempts} concurrent modifications")]
    Contention {
        collection: Collection,
        id: String,
        attempts: u32,
    },
}

impl PersistenceError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, PersistenceError::Conflict { .. })
    }
}
