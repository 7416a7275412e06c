//! Registration, login and "who am I" for session holders.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use super::token::{SessionKeys, LOGIN_SESSION_SECS, REGISTRATION_SESSION_SECS};
use super::IdentityError;
use crate::adapter::RentalStore;
use crate::config::StoreConfig;
use crate::models::{Role, TenantProfile, User};
use crate::persistence::{DocumentStore, PersistenceError};

/// Stored in place of a password hash for users rebuilt from a session
/// credential. Not a PHC string, so no password ever verifies against it.
pub const RECOVERED_PASSWORD_HASH: &str = "!session-recovered";

const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+";
const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error("User already exists")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account exists but is registered as a {registered}")]
    RoleMismatch { registered: Role },
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// The user as shown to its own session: never the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_profile: Option<TenantProfile>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            tenant_profile: user.tenant_profile,
        }
    }
}

/// A signed-in user and the credential to hand back to them.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: PublicUser,
    pub token: String,
}

pub struct AccountService<S> {
    store: Arc<RentalStore<S>>,
    keys: SessionKeys,
    session_recovery: bool,
}

impl<S: DocumentStore> AccountService<S> {
    pub fn new(store: Arc<RentalStore<S>>, config: &StoreConfig) -> Self {
        Self {
            store,
            keys: SessionKeys::from_secret(&config.jwt_secret),
            session_recovery: config.session_recovery,
        }
    }

    pub async fn register(&self, registration: Registration) -> Result<Session, AccountError> {
        let Registration {
            name,
            email,
            password,
            role,
        } = registration;

        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AccountError::Invalid("All fields are required"));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(AccountError::Invalid("Invalid email format"));
        }
        if !is_strong_password(&password) {
            return Err(AccountError::Invalid(
                "Password does not meet security requirements",
            ));
        }

        let hash = hash_password(&password)?;
        let user = User::new(&Uuid::new_v4().to_string(), &name, &email, &hash, role);
        let user = match self.store.add_user(user).await {
            Ok(user) => user,
            Err(e) if e.is_conflict() => return Err(AccountError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        let token = self.keys.issue(&user, REGISTRATION_SESSION_SECS)?;
        info!(id = %user.id, role = %user.role, "Registered user");
        Ok(Session {
            user: user.into(),
            token,
        })
    }

    /// Sign in. The role chosen at login must be the one the account was
    /// registered with.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Session, AccountError> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            return Err(AccountError::InvalidCredentials);
        };
        if user.role != role {
            return Err(AccountError::RoleMismatch {
                registered: user.role,
            });
        }
        if user.password_hash == RECOVERED_PASSWORD_HASH
            || !verify_password(password, &user.password_hash)?
        {
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.keys.issue(&user, LOGIN_SESSION_SECS)?;
        debug!(id = %user.id, "User logged in");
        Ok(Session {
            user: user.into(),
            token,
        })
    }

    /// The user a session credential belongs to.
    ///
    /// An invalid or expired credential yields `None`. So does a valid one
    /// whose user no longer exists, unless session recovery is enabled, in
    /// which case the user is recreated from the credential's claims with a
    /// password that can never be used to log in.
    pub async fn current_user(&self, token: &str) -> Result<Option<PublicUser>, AccountError> {
        let claims = match self.keys.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Rejected session credential");
                return Ok(None);
            }
        };

        if let Some(user) = self.store.find_user_by_id(&claims.sub).await? {
            return Ok(Some(user.into()));
        }
        if !self.session_recovery {
            debug!(id = %claims.sub, "Session refers to a missing user");
            return Ok(None);
        }

        let ghost = User::new(
            &claims.sub,
            &claims.name,
            &claims.email,
            RECOVERED_PASSWORD_HASH,
            claims.role,
        );
        match self.store.add_user(ghost).await {
            Ok(user) => {
                warn!(id = %user.id, email = %user.email, "Recreated missing user from session credential");
                Ok(Some(user.into()))
            }
            Err(e) if e.is_conflict() => {
                // Lost a race with another recovery of the same id, or the
                // email now belongs to someone else.
                Ok(self.store.find_user_by_id(&claims.sub).await?.map(Into::into))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// At least eight characters drawn from letters, digits and
/// `!@#$%^&*()_+`, with at least one of each: lowercase, uppercase, digit,
/// symbol.
pub fn is_strong_password(password: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || PASSWORD_SYMBOLS.contains(c);
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().all(allowed)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}
