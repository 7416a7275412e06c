//! Entity records kept by the rental store.
//!
//! Every record is a flat, serde-serializable struct keyed by an opaque
//! string `id` supplied by the caller. Field names serialize in camelCase so
//! the JSON file layout matches the one the web front end reads.

mod billing;
mod messaging;
mod property;
mod tenancy;
mod user;

pub use billing::{Bill, BillKind, BillStatus, StoredDocument};
pub use messaging::{Message, MessageKind, Notification, NotificationKind, NotificationPatch, Review};
pub use property::{Property, PropertyPatch, PropertyType};
pub use tenancy::{
    HistoryKind, HistoryStatus, IdProofType, LandlordTenant, RequestExtras, RequestPatch,
    RequestPaymentStatus, RequestStatus, StayStatus, TenantHistory, TenantStay,
    VerificationRequest,
};
pub use user::{LandlordSummary, ProfilePaymentStatus, Role, TenantProfile, User, UserPatch};
