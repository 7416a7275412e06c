//! One-time copy of a file-mode store into the SQLite document table.

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};

use super::document_repo::collection_counts;
use crate::persistence::{CollectionCounts, Document, JsonFileStore, PersistenceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// The database already held documents, so nothing was imported.
    pub skipped: bool,
    /// Records imported per collection (or present, when skipped).
    pub counts: CollectionCounts,
    /// Records dropped because an earlier record in the file had the same id.
    pub duplicates: u64,
    /// Records left behind because they do not match their collection's
    /// layout.
    pub unrecognized: u64,
}

/// Import every collection of `source` into the database behind `pool`.
///
/// Idempotent: does nothing when the database already contains documents.
/// The import runs in a single transaction. The source file is read
/// strictly, so a malformed file fails the import instead of importing an
/// empty store, and it is never modified.
pub async fn import_json_store(
    pool: &SqlitePool,
    source: &JsonFileStore,
) -> Result<ImportReport, PersistenceError> {
    info!(path = %source.path().display(), "Starting JSON store import");

    let existing = collection_counts(pool).await?;
    if existing.values().any(|n| *n > 0) {
        info!("SQLite already contains documents, skipping JSON import");
        return Ok(ImportReport {
            skipped: true,
            counts: existing,
            duplicates: 0,
            unrecognized: 0,
        });
    }

    let schema = source.read_strict().await?;
    let unrecognized = schema.unrecognized.record_count();
    if unrecognized > 0 {
        warn!(unrecognized, "Some records do not match their collection's layout and will not be imported");
    }

    let mut tx = pool.begin().await?;
    let mut duplicates = 0;
    duplicates += insert_all(&mut tx, &schema.users).await?;
    duplicates += insert_all(&mut tx, &schema.properties).await?;
    duplicates += insert_all(&mut tx, &schema.verification_requests).await?;
    duplicates += insert_all(&mut tx, &schema.tenant_stays).await?;
    duplicates += insert_all(&mut tx, &schema.history).await?;
    duplicates += insert_all(&mut tx, &schema.notifications).await?;
    duplicates += insert_all(&mut tx, &schema.bills).await?;
    duplicates += insert_all(&mut tx, &schema.documents).await?;
    duplicates += insert_all(&mut tx, &schema.messages).await?;
    duplicates += insert_all(&mut tx, &schema.reviews).await?;
    tx.commit().await?;

    let report = ImportReport {
        skipped: false,
        counts: collection_counts(pool).await?,
        duplicates,
        unrecognized,
    };

    info!(
        records = report.counts.values().sum::<u64>(),
        duplicates = report.duplicates,
        unrecognized = report.unrecognized,
        "JSON store import completed"
    );

    Ok(report)
}

/// Insert records in file order. Returns how many were ignored as
/// duplicate ids.
async fn insert_all<T: Document>(
    tx: &mut Transaction<'_, Sqlite>,
    items: &[T],
) -> Result<u64, PersistenceError> {
    let mut duplicates = 0;
    for doc in items {
        let body = serde_json::to_string(doc)?;
        let result =
            sqlx::query("INSERT OR IGNORE INTO documents (collection, id, body) VALUES (?, ?, ?)")
                .bind(T::COLLECTION.as_str())
                .bind(doc.id())
                .bind(body)
                .execute(&mut **tx)
                .await?;
        if result.rows_affected() == 0 {
            warn!(collection = %T::COLLECTION, id = doc.id(), "Skipping duplicate id during import");
            duplicates += 1;
        }
    }
    Ok(duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use crate::persistence::sqlite::{Database, SqliteDocumentStore};
    use crate::persistence::{Collection, DocumentStore, StoreSchema};

    fn user(id: &str) -> User {
        User::new(id, "Imported", &format!("{id}@example.com"), "hash", Role::Tenant)
    }

    #[tokio::test]
    async fn test_import_copies_collections_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileStore::in_dir(dir.path());
        let schema = StoreSchema {
            users: vec![user("z"), user("a"), user("m")],
            ..Default::default()
        };
        source.write(&schema).await.unwrap();

        let db = Database::new_in_memory().await.unwrap();
        let report = import_json_store(db.pool(), &source).await.unwrap();
        assert!(!report.skipped);
        assert_eq!(report.counts[&Collection::Users], 3);
        assert_eq!(report.duplicates, 0);

        let store = SqliteDocumentStore::new(db.pool().clone());
        let ids: Vec<String> = store
            .list::<User>()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[tokio::test]
    async fn test_import_skips_populated_database() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileStore::in_dir(dir.path());
        source
            .write(&StoreSchema {
                users: vec![user("u1")],
                ..Default::default()
            })
            .await
            .unwrap();

        let db = Database::new_in_memory().await.unwrap();
        let store = SqliteDocumentStore::new(db.pool().clone());
        store.insert(&user("existing")).await.unwrap();

        let report = import_json_store(db.pool(), &source).await.unwrap();
        assert!(report.skipped);
        assert_eq!(store.list::<User>().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import_counts_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileStore::in_dir(dir.path());
        source
            .write(&StoreSchema {
                users: vec![user("u1"), user("u1")],
                ..Default::default()
            })
            .await
            .unwrap();

        let db = Database::new_in_memory().await.unwrap();
        let report = import_json_store(db.pool(), &source).await.unwrap();
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.counts[&Collection::Users], 1);
    }

    #[tokio::test]
    async fn test_import_leaves_mismatched_records_behind() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileStore::in_dir(dir.path());
        let contents = serde_json::json!({
            "users": [serde_json::to_value(user("u1")).unwrap()],
            "reviews": [{"id": "legacy", "userId": "u1", "rating": 5}]
        });
        std::fs::write(source.path(), contents.to_string()).unwrap();

        let db = Database::new_in_memory().await.unwrap();
        let report = import_json_store(db.pool(), &source).await.unwrap();
        assert_eq!(report.counts[&Collection::Users], 1);
        assert_eq!(report.counts[&Collection::Reviews], 0);
        assert_eq!(report.unrecognized, 1);
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileStore::in_dir(dir.path());
        std::fs::write(source.path(), "[1, 2").unwrap();

        let db = Database::new_in_memory().await.unwrap();
        let result = import_json_store(db.pool(), &source).await;
        assert!(matches!(result, Err(PersistenceError::Json(_))));
    }
}
