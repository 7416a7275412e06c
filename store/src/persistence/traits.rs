//! The storage interface both backends implement.
//!
//! One generic trait covers every collection: callers name the record type
//! and the backend finds its collection through [`Document`]. Methods return
//! `impl Future + Send` rather than using `async fn` so the futures are
//! guaranteed `Send` and can be driven from `tokio::spawn`.
//!
//! Mutating methods are atomic per record: the read that feeds a closure and
//! the write of its result cannot interleave with another writer touching
//! the same record. Nothing is atomic *across* calls; a flow that touches two
//! collections makes two independent calls.

use super::{CollectionCounts, Document, Filter, PersistenceError};
use std::future::Future;

pub trait DocumentStore: Send + Sync {
    /// Append a record. Fails with [`PersistenceError::Conflict`] if a record
    /// with the same id already exists in the collection.
    fn insert<T: Document>(&self, doc: &T)
        -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Append a record unless any existing record of the collection matches
    /// `unique`. The check and the append happen as one step.
    fn insert_unless<T: Document>(
        &self,
        doc: &T,
        unique: &Filter,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    fn get<T: Document>(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<T>, PersistenceError>> + Send;

    /// Every record of the collection, in insertion order.
    fn list<T: Document>(&self) -> impl Future<Output = Result<Vec<T>, PersistenceError>> + Send;

    /// Records matching every clause of `filter`, in insertion order.
    fn find<T: Document>(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<T>, PersistenceError>> + Send;

    /// Read-modify-write one record. `f` returns whether it changed the
    /// record; nothing is written when it did not. Returns `None` without
    /// writing if no record has that id, otherwise the record as stored
    /// afterwards. `f` may run more than once if the backend retries.
    fn update<T, F>(
        &self,
        id: &str,
        f: F,
    ) -> impl Future<Output = Result<Option<T>, PersistenceError>> + Send
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send;

    /// Like [`update`](Self::update), but fails with
    /// [`PersistenceError::Conflict`] if a record other than `id` matches
    /// `unique` once `f` has changed the record. The check and the write
    /// happen as one step.
    fn update_unless<T, F>(
        &self,
        id: &str,
        unique: &Filter,
        f: F,
    ) -> impl Future<Output = Result<Option<T>, PersistenceError>> + Send
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send;

    /// Read-modify-write every record matching `filter`, one record at a
    /// time. Returns the records `f` reported as changed, in insertion order.
    fn update_where<T, F>(
        &self,
        filter: &Filter,
        f: F,
    ) -> impl Future<Output = Result<Vec<T>, PersistenceError>> + Send
    where
        T: Document,
        F: FnMut(&mut T) -> bool + Send;

    /// Delete a record. Returns whether one was removed.
    fn remove<T: Document>(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;

    fn counts(&self) -> impl Future<Output = Result<CollectionCounts, PersistenceError>> + Send;
}
