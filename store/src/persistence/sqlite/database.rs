//! Opening the SQLite file that holds the `documents` table.
//!
//! The table (see `migrations/001_documents.sql`) is the only schema:
//!
//! - `(collection, id)` is unique, so the same id may appear once per
//!   collection.
//! - `body` must be valid JSON; SQLite rejects anything else.
//! - `seq` grows with every insert and gives collections their insertion
//!   order.
//! - `version` starts at 0 and is bumped by each successful update.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::persistence::PersistenceError;

/// Writers wait this long for the database lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create the database file at `path`, creating its directory,
    /// and bring the `documents` table up to date.
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let db = Self::connect(options, 5).await?;
        info!(path = %path.display(), "Opened SQLite document store");
        Ok(db)
    }

    /// A private in-memory database. One connection, since every
    /// connection to `:memory:` would otherwise see its own empty database.
    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options, 1).await
    }

    async fn connect(
        options: SqliteConnectOptions,
        max_connections: u32,
    ) -> Result<Self, PersistenceError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| PersistenceError::Migration(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn insert_raw(db: &Database, collection: &str, id: &str, body: &str) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(id)
            .bind(body)
            .execute(db.pool())
            .await
            .map(|_| ())
    }

    #[tokio::test]
    async fn test_body_must_be_json() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(insert_raw(&db, "users", "u1", "nope").await.is_err());
        assert!(insert_raw(&db, "users", "u1", r#"{"id":"u1"}"#).await.is_ok());
    }

    #[tokio::test]
    async fn test_ids_are_unique_per_collection() {
        let db = Database::new_in_memory().await.unwrap();
        insert_raw(&db, "users", "x", "{}").await.unwrap();
        insert_raw(&db, "bills", "x", "{}").await.unwrap();

        let err = insert_raw(&db, "users", "x", "{}").await.unwrap_err();
        match err {
            sqlx::Error::Database(e) => assert!(e.is_unique_violation()),
            other => panic!("expected a unique violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_new_rows_get_increasing_seq_and_version_zero() {
        let db = Database::new_in_memory().await.unwrap();
        for id in ["b", "a", "c"] {
            insert_raw(&db, "users", id, "{}").await.unwrap();
        }
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT id, version FROM documents ORDER BY seq")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(
            rows,
            vec![("b".to_string(), 0), ("a".to_string(), 0), ("c".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn test_reopening_a_file_keeps_documents() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("data").join("rentease.db");

        let db = Database::open(&db_path).await.unwrap();
        insert_raw(&db, "users", "u1", "{}").await.unwrap();
        db.pool().close().await;

        let reopened = Database::open(&db_path).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM documents")
            .fetch_one(reopened.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
