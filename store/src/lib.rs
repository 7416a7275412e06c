//! Persistence core for the RentEase landlord/tenant platform.
//!
//! - [`models`]: the entity records.
//! - [`persistence`]: the [`DocumentStore`](persistence::DocumentStore)
//!   interface and its JSON-file and SQLite backends.
//! - [`adapter`]: [`RentalStore`], the entity-level operations handlers call.
//! - [`identity`]: password hashing, session credentials and accounts.
//! - [`config`]: environment-driven [`StoreConfig`](config::StoreConfig).

pub mod adapter;
pub mod config;
pub mod identity;
pub mod models;
pub mod persistence;

pub use adapter::RentalStore;
