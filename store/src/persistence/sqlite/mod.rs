//! SQLite-backed document store.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**: one writer alongside concurrent readers.
//! - **Busy timeout**: writers wait for the lock instead of failing at once.
//! - **Embedded migrations**: `sqlx::migrate!` runs `migrations/001_documents.sql`
//!   automatically when [`Database::open`] is called. The schema is idempotent.
//!
//! ## Layout
//!
//! All collections share the `documents` table, one row per record, keyed by
//! `(collection, id)`. Queries filter on `json_extract(body, '$.field')`, see
//! [`helpers`]. Rows carry a `version` column for optimistic updates.
//!
//! ## JSON import
//!
//! [`import_json_store`] performs a one-time, idempotent copy of a file-mode
//! store. It is run from the `rentease import-json` command. The source file
//! is not modified.

mod database;
mod document_repo;
pub(crate) mod helpers;
mod import_json;

pub use database::Database;
pub use document_repo::{SqliteDocumentStore, MAX_UPDATE_ATTEMPTS};
pub use import_json::{import_json_store, ImportReport};
