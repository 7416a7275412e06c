//! Entity-level operations over any [`DocumentStore`].
//!
//! [`RentalStore`] is what request handlers hold. It is built once at startup
//! around the configured backend and passed to whoever needs it; there is no
//! global instance.
//!
//! Lookups return `Ok(None)` when nothing matches. Updates return the record
//! as stored afterwards, or `Ok(None)` if the id is unknown, in which case
//! nothing is written. Storage failures surface as [`PersistenceError`].
//!
//! [`PersistenceError`]: crate::persistence::PersistenceError

mod billing;
mod messaging;
mod properties;
mod requests;
mod stays;
mod users;


use crate::persistence::DocumentStore;

pub struct RentalStore<S> {
    store: S,
}

impl<S: DocumentStore> RentalStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The storage engine underneath.
    pub fn backend(&self) -> &S {
        &self.store
    }
}
