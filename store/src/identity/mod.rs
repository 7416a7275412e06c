//! Accounts and sessions.
//!
//! - [`password`]: Argon2id hashing and verification.
//! - [`token`]: HS256 session credentials carrying the user's id, name,
//!   email and role.
//! - [`accounts`]: registration, login and session lookup on top of
//!   [`RentalStore`](crate::adapter::RentalStore).

pub mod accounts;
pub mod password;
pub mod token;

pub use accounts::{AccountError, AccountService, PublicUser, Registration, Session};
pub use token::{SessionClaims, SessionKeys};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Crypto error: {0}")]
    Crypto(String),
    #[error("Session has expired")]
    TokenExpired,
    #[error("Invalid session token: {0}")]
    TokenInvalid(String),
}
