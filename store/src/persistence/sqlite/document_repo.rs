//! SQLite implementation of [`DocumentStore`].
//!
//! Every record is one row of `documents`, its JSON in `body`. Updates are
//! optimistic: read `(body, version)`, apply the change in Rust, then write
//! back only if `version` is unchanged. A lost race re-reads and re-applies,
//! up to [`MAX_UPDATE_ATTEMPTS`] times.

use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::helpers::{bind_query, bind_query_as, decode_collection, where_clauses};
use crate::persistence::traits::DocumentStore;
use crate::persistence::{Collection, CollectionCounts, Document, Filter, PersistenceError};

/// How many times an update re-reads after losing a version race.
pub const MAX_UPDATE_ATTEMPTS: u32 = 8;

#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_versioned<T: Document>(
        &self,
        id: &str,
    ) -> Result<Option<(T, i64)>, PersistenceError> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT body, version FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(T::COLLECTION.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(body, version)| Ok((serde_json::from_str(&body)?, version)))
            .transpose()
    }

    /// Write `doc` only if the stored version is still `expected_version`
    /// and, when `unique` is given, no other record of the collection
    /// matches it. Returns whether this write won.
    async fn compare_and_swap<T: Document>(
        &self,
        doc: &T,
        expected_version: i64,
        unique: Option<&Filter>,
    ) -> Result<bool, PersistenceError> {
        let body = serde_json::to_string(doc)?;
        let collection = T::COLLECTION.as_str();
        let result = match unique {
            None => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET body = ?, version = version + 1
                    WHERE collection = ? AND id = ? AND version = ?
                    "#,
                )
                .bind(body)
                .bind(collection)
                .bind(doc.id())
                .bind(expected_version)
                .execute(&self.pool)
                .await?
            }
            Some(filter) => {
                let (clauses, args) = where_clauses(filter);
                let sql = format!(
                    "UPDATE documents \
                     SET body = ?, version = version + 1 \
                     WHERE collection = ? AND id = ? AND version = ? \
                     AND NOT EXISTS (SELECT 1 FROM documents WHERE collection = ? AND id != ?{clauses})"
                );
                let query = sqlx::query(&sql)
                    .bind(body)
                    .bind(collection)
                    .bind(doc.id())
                    .bind(expected_version)
                    .bind(collection)
                    .bind(doc.id());
                bind_query(query, &args).execute(&self.pool).await?
            }
        };

        Ok(result.rows_affected() == 1)
    }

    /// Whether a record other than `id` matches `filter`.
    async fn other_matches<T: Document>(
        &self,
        id: &str,
        filter: &Filter,
    ) -> Result<bool, PersistenceError> {
        let (clauses, args) = where_clauses(filter);
        let sql = format!(
            "SELECT COUNT(*) FROM documents WHERE collection = ? AND id != ?{clauses}"
        );
        let query = sqlx::query_as::<_, (i64,)>(&sql)
            .bind(T::COLLECTION.as_str())
            .bind(id);
        let (count,) = bind_query_as(query, &args).fetch_one(&self.pool).await?;
        Ok(count > 0)
    }

    /// Versioned read-modify-write of a single record. `guard`, when given,
    /// must still match the freshly read record or the record is skipped.
    /// `unique`, when given, must match no other record once `f` has run.
    /// Returns the record and whether `f` changed it.
    async fn update_one<T, F>(
        &self,
        id: &str,
        guard: Option<&Filter>,
        unique: Option<&Filter>,
        f: &mut F,
    ) -> Result<Option<(T, bool)>, PersistenceError>
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let Some((mut doc, version)) = self.fetch_versioned::<T>(id).await? else {
                return Ok(None);
            };
            if let Some(filter) = guard {
                if !filter.matches(&doc)? {
                    return Ok(None);
                }
            }
            if !f(&mut doc) {
                return Ok(Some((doc, false)));
            }
            if self.compare_and_swap(&doc, version, unique).await? {
                return Ok(Some((doc, true)));
            }
            if let Some(filter) = unique {
                if self.other_matches::<T>(id, filter).await? {
                    return Err(PersistenceError::Conflict {
                        collection: T::COLLECTION,
                        reason: format!("a record with {filter} already exists"),
                    });
                }
            }
            debug!(collection = %T::COLLECTION, id, attempt, "Record changed underneath update, retrying");
        }

        warn!(collection = %T::COLLECTION, id, "Update abandoned after repeated version conflicts");
        Err(PersistenceError::Contention {
            collection: T::COLLECTION,
            id: id.to_string(),
            attempts: MAX_UPDATE_ATTEMPTS,
        })
    }

    async fn append<T: Document>(
        &self,
        doc: &T,
        unique: Option<&Filter>,
    ) -> Result<(), PersistenceError> {
        let body = serde_json::to_string(doc)?;
        let collection = T::COLLECTION.as_str();

        let result = match unique {
            None => {
                sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
                    .bind(collection)
                    .bind(doc.id())
                    .bind(body)
                    .execute(&self.pool)
                    .await
            }
            Some(filter) => {
                let (clauses, args) = where_clauses(filter);
                let sql = format!(
                    "INSERT INTO documents (collection, id, body) \
                     SELECT ?, ?, ? \
                     WHERE NOT EXISTS (SELECT 1 FROM documents WHERE collection = ?{clauses})"
                );
                let query = sqlx::query(&sql)
                    .bind(collection)
                    .bind(doc.id())
                    .bind(body)
                    .bind(collection);
                bind_query(query, &args).execute(&self.pool).await
            }
        };

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(PersistenceError::Conflict {
                collection: T::COLLECTION,
                reason: format!(
                    "a record with {} already exists",
                    unique.map(ToString::to_string).unwrap_or_default()
                ),
            }),
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(PersistenceError::Conflict {
                    collection: T::COLLECTION,
                    reason: format!("id {} already exists", doc.id()),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn decode_bodies<T: Document>(rows: Vec<(String,)>) -> Result<Vec<T>, PersistenceError> {
    rows.into_iter()
        .map(|(body,)| serde_json::from_str(&body).map_err(PersistenceError::from))
        .collect()
}

/// Row count per collection, with zero for collections that have no rows.
pub(crate) async fn collection_counts(
    pool: &SqlitePool,
) -> Result<CollectionCounts, PersistenceError> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT collection, COUNT(*) FROM documents GROUP BY collection")
            .fetch_all(pool)
            .await?;

    let mut counts: CollectionCounts = Collection::ALL.into_iter().map(|c| (c, 0)).collect();
    for (name, count) in rows {
        match decode_collection(&name) {
            Some(collection) => {
                counts.insert(collection, count as u64);
            }
            None => warn!(collection = %name, "Ignoring rows in unknown collection"),
        }
    }
    Ok(counts)
}

impl DocumentStore for SqliteDocumentStore {
    async fn insert<T: Document>(&self, doc: &T) -> Result<(), PersistenceError> {
        self.append(doc, None).await
    }

    async fn insert_unless<T: Document>(
        &self,
        doc: &T,
        unique: &Filter,
    ) -> Result<(), PersistenceError> {
        self.append(doc, Some(unique)).await
    }

    async fn get<T: Document>(&self, id: &str) -> Result<Option<T>, PersistenceError> {
        Ok(self.fetch_versioned::<T>(id).await?.map(|(doc, _)| doc))
    }

    async fn list<T: Document>(&self) -> Result<Vec<T>, PersistenceError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT body FROM documents WHERE collection = ? ORDER BY seq")
                .bind(T::COLLECTION.as_str())
                .fetch_all(&self.pool)
                .await?;
        decode_bodies(rows)
    }

    async fn find<T: Document>(&self, filter: &Filter) -> Result<Vec<T>, PersistenceError> {
        let (clauses, args) = where_clauses(filter);
        let sql = format!("SELECT body FROM documents WHERE collection = ?{clauses} ORDER BY seq");
        let query = sqlx::query_as::<_, (String,)>(&sql).bind(T::COLLECTION.as_str());
        let rows = bind_query_as(query, &args).fetch_all(&self.pool).await?;
        decode_bodies(rows)
    }

    async fn update<T, F>(&self, id: &str, mut f: F) -> Result<Option<T>, PersistenceError>
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send,
    {
        Ok(self
            .update_one::<T, F>(id, None, None, &mut f)
            .await?
            .map(|(doc, _)| doc))
    }

    async fn update_unless<T, F>(
        &self,
        id: &str,
        unique: &Filter,
        mut f: F,
    ) -> Result<Option<T>, PersistenceError>
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send,
    {
        Ok(self
            .update_one::<T, F>(id, None, Some(unique), &mut f)
            .await?
            .map(|(doc, _)| doc))
    }

    async fn update_where<T, F>(&self, filter: &Filter, mut f: F) -> Result<Vec<T>, PersistenceError>
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send,
    {
        let (clauses, args) = where_clauses(filter);
        let sql = format!("SELECT id FROM documents WHERE collection = ?{clauses} ORDER BY seq");
        let query = sqlx::query_as::<_, (String,)>(&sql).bind(T::COLLECTION.as_str());
        let ids = bind_query_as(query, &args).fetch_all(&self.pool).await?;

        let mut changed = Vec::new();
        for (id,) in ids {
            if let Some((doc, true)) = self.update_one::<T, F>(&id, Some(filter), None, &mut f).await? {
                changed.push(doc);
            }
        }
        Ok(changed)
    }

    async fn remove<T: Document>(&self, id: &str) -> Result<bool, PersistenceError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(T::COLLECTION.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn counts(&self) -> Result<CollectionCounts, PersistenceError> {
        collection_counts(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use crate::persistence::sqlite::Database;

    async fn test_store() -> (Database, SqliteDocumentStore) {
        let db = Database::new_in_memory().await.unwrap();
        let store = SqliteDocumentStore::new(db.pool().clone());
        (db, store)
    }

    fn user(id: &str, email: &str, role: Role) -> User {
        User::new(id, "Test User", email, "hash", role)
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let (_db, store) = test_store().await;
        let u = user("u1", "a@example.com", Role::Landlord);
        store.insert(&u).await.unwrap();
        assert_eq!(store.get::<User>("u1").await.unwrap(), Some(u));
        assert_eq!(store.get::<User>("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_a_conflict() {
        let (_db, store) = test_store().await;
        store.insert(&user("u1", "a@example.com", Role::Tenant)).await.unwrap();
        let err = store
            .insert(&user("u1", "b@example.com", Role::Tenant))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_insert_unless_refuses_matching_record() {
        let (_db, store) = test_store().await;
        let unique = Filter::eq("email", "a@example.com");
        store
            .insert_unless(&user("u1", "a@example.com", Role::Tenant), &unique)
            .await
            .unwrap();
        let err = store
            .insert_unless(&user("u2", "a@example.com", Role::Tenant), &unique)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.list::<User>().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let (_db, store) = test_store().await;
        for id in ["c", "a", "b"] {
            store
                .insert(&user(id, &format!("{id}@example.com"), Role::Tenant))
                .await
                .unwrap();
        }
        let ids: Vec<String> = store
            .list::<User>()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_find_by_enum_field() {
        let (_db, store) = test_store().await;
        store.insert(&user("l1", "l1@example.com", Role::Landlord)).await.unwrap();
        store.insert(&user("t1", "t1@example.com", Role::Tenant)).await.unwrap();
        store.insert(&user("l2", "l2@example.com", Role::Landlord)).await.unwrap();

        let landlords = store
            .find::<User>(&Filter::eq("role", Role::Landlord.as_str()))
            .await
            .unwrap();
        let ids: Vec<&str> = landlords.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["l1", "l2"]);
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let (_db, store) = test_store().await;
        store.insert(&user("u1", "a@example.com", Role::Tenant)).await.unwrap();

        let updated = store
            .update::<User, _>("u1", |u| {
                u.name = "Renamed".into();
                true
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Renamed");

        let (_, version) = store.fetch_versioned::<User>("u1").await.unwrap().unwrap();
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn test_unchanged_update_does_not_write() {
        let (_db, store) = test_store().await;
        store.insert(&user("u1", "a@example.com", Role::Tenant)).await.unwrap();
        store.update::<User, _>("u1", |_| false).await.unwrap();
        let (_, version) = store.fetch_versioned::<User>("u1").await.unwrap().unwrap();
        assert_eq!(version, 0);
    }

    #[tokio::test]
    async fn test_stale_version_loses_the_swap() {
        let (_db, store) = test_store().await;
        store.insert(&user("u1", "a@example.com", Role::Tenant)).await.unwrap();
        let (mut stale, version) = store.fetch_versioned::<User>("u1").await.unwrap().unwrap();

        store
            .update::<User, _>("u1", |u| {
                u.mobile = Some("111".into());
                true
            })
            .await
            .unwrap();

        stale.name = "Stale".into();
        assert!(!store.compare_and_swap(&stale, version, None).await.unwrap());
        let current = store.get::<User>("u1").await.unwrap().unwrap();
        assert_eq!(current.name, "Test User");
        assert_eq!(current.mobile.as_deref(), Some("111"));
    }

    #[tokio::test]
    async fn test_update_where_reports_changed_records() {
        let (_db, store) = test_store().await;
        store.insert(&user("t1", "t1@example.com", Role::Tenant)).await.unwrap();
        store.insert(&user("t2", "t2@example.com", Role::Tenant)).await.unwrap();
        store.insert(&user("l1", "l1@example.com", Role::Landlord)).await.unwrap();

        let changed = store
            .update_where::<User, _>(&Filter::eq("role", "tenant"), |u| {
                if u.id == "t2" {
                    return false;
                }
                u.mobile = Some("000".into());
                true
            })
            .await
            .unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].id, "t1");
    }

    #[tokio::test]
    async fn test_remove_and_counts() {
        let (_db, store) = test_store().await;
        store.insert(&user("u1", "a@example.com", Role::Tenant)).await.unwrap();
        store.insert(&user("u2", "b@example.com", Role::Tenant)).await.unwrap();
        assert!(store.remove::<User>("u1").await.unwrap());
        assert!(!store.remove::<User>("u1").await.unwrap());

        let counts = store.counts().await.unwrap();
        assert_eq!(counts[&Collection::Users], 1);
        assert_eq!(counts[&Collection::Bills], 0);
    }
}
