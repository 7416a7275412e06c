//! Signed session credentials (HS256 JWTs).

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::IdentityError;
use crate::models::{Role, User};

/// Lifetime in seconds of the session issued at registration.
pub const REGISTRATION_SESSION_SECS: i64 = 24 * 60 * 60;
/// Lifetime in seconds of the session issued at login.
pub const LOGIN_SESSION_SECS: i64 = 30 * 24 * 60 * 60;

/// Claims carried by every session credential. Enough to rebuild the user
/// record if it has gone missing from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id.
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// Signing and verification keys derived from one shared secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a credential for `user` valid for `lifetime_secs` seconds.
    pub fn issue(&self, user: &User, lifetime_secs: i64) -> Result<String, IdentityError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + lifetime_secs,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| IdentityError::Crypto(format!("JWT encode: {e}")))
    }

    /// Verify signature and expiry and return the claims.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, IdentityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
                _ => IdentityError::TokenInvalid(e.to_string()),
            })
    }
}
