use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of a tenancy an account is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Landlord,
    Tenant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Landlord => "landlord",
            Role::Tenant => "tenant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "landlord" => Ok(Role::Landlord),
            "tenant" => Ok(Role::Tenant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Payment state recorded on a tenant's onboarding profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfilePaymentStatus {
    #[default]
    Pending,
    Paid,
}

/// Extra details a tenant fills in during onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantProfile {
    pub mobile: String,
    pub city: String,
    pub state: String,
    pub aadhaar_number: String,
    #[serde(default)]
    pub is_profile_complete: bool,
    #[serde(default)]
    pub payment_status: ProfilePaymentStatus,
}

/// A registered account.
///
/// `email` is unique across accounts; [`crate::RentalStore::add_user`]
/// refuses a second registration with the same address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhaar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_profile: Option<TenantProfile>,
}

impl User {
    pub fn new(id: &str, name: &str, email: &str, password_hash: &str, role: Role) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            mobile: None,
            aadhaar: None,
            tenant_profile: None,
        }
    }
}

/// Fields a profile update may replace. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub mobile: Option<String>,
    pub aadhaar: Option<String>,
    pub tenant_profile: Option<TenantProfile>,
}

impl UserPatch {
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(mobile) = &self.mobile {
            user.mobile = Some(mobile.clone());
        }
        if let Some(aadhaar) = &self.aadhaar {
            user.aadhaar = Some(aadhaar.clone());
        }
        // Replaced whole, never merged field by field.
        if let Some(profile) = &self.tenant_profile {
            user.tenant_profile = Some(profile.clone());
        }
    }
}

/// Landlord listing shown to tenants picking who to apply to. Carries no
/// credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandlordSummary {
    pub id: String,
    pub name: String,
}
