use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Verification requests ──────────────────────────────────────────────

/// Lifecycle of a tenant's application to a landlord.
///
/// ```text
/// pending --approve--> approved --end stay--> moved_out
/// pending --reject---> rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    MovedOut,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::MovedOut => "moved_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::MovedOut)
    }

    /// Whether a request in this status may be moved to `next`.
    /// Re-applying the current status is always allowed.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
                | (RequestStatus::Approved, RequestStatus::MovedOut)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdProofType {
    #[default]
    Aadhaar,
    Passport,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPaymentStatus {
    Pending,
    Paid,
}

/// A tenant's application to live at one of a landlord's properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub id: String,
    pub tenant_id: String,
    pub landlord_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub id_proof_type: IdProofType,
    #[serde(default)]
    pub id_proof_number: String,
    #[serde(default)]
    pub city: String,
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<RequestPaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joining_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utility_details: Option<String>,
}

impl VerificationRequest {
    /// A fresh pending request with no applicant details filled in.
    pub fn new(id: &str, tenant_id: &str, landlord_id: &str, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            tenant_id: tenant_id.to_string(),
            landlord_id: landlord_id.to_string(),
            property_id: None,
            full_name: String::new(),
            mobile: String::new(),
            id_proof_type: IdProofType::default(),
            id_proof_number: String::new(),
            city: String::new(),
            status: RequestStatus::Pending,
            payment_status: None,
            payment_amount: None,
            transaction_id: None,
            remarks: None,
            submitted_at,
            updated_at: None,
            verified_at: None,
            joining_date: None,
            rent_notes: None,
            utility_details: None,
        }
    }
}

/// Applicant-editable fields of a request. Status is deliberately absent:
/// it only moves through [`crate::RentalStore::update_request_status`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPatch {
    pub property_id: Option<String>,
    pub full_name: Option<String>,
    pub mobile: Option<String>,
    pub id_proof_type: Option<IdProofType>,
    pub id_proof_number: Option<String>,
    pub city: Option<String>,
    pub payment_status: Option<RequestPaymentStatus>,
    pub payment_amount: Option<f64>,
    pub transaction_id: Option<String>,
    pub remarks: Option<String>,
    pub joining_date: Option<String>,
    pub rent_notes: Option<String>,
    pub utility_details: Option<String>,
}

impl RequestPatch {
    pub fn apply(&self, req: &mut VerificationRequest) {
        if let Some(v) = &self.property_id {
            req.property_id = Some(v.clone());
        }
        if let Some(v) = &self.full_name {
            req.full_name = v.clone();
        }
        if let Some(v) = &self.mobile {
            req.mobile = v.clone();
        }
        if let Some(v) = self.id_proof_type {
            req.id_proof_type = v;
        }
        if let Some(v) = &self.id_proof_number {
            req.id_proof_number = v.clone();
        }
        if let Some(v) = &self.city {
            req.city = v.clone();
        }
        if let Some(v) = self.payment_status {
            req.payment_status = Some(v);
        }
        if let Some(v) = self.payment_amount {
            req.payment_amount = Some(v);
        }
        if let Some(v) = &self.transaction_id {
            req.transaction_id = Some(v.clone());
        }
        if let Some(v) = &self.remarks {
            req.remarks = Some(v.clone());
        }
        RequestExtras {
            joining_date: self.joining_date.clone(),
            rent_notes: self.rent_notes.clone(),
            utility_details: self.utility_details.clone(),
        }
        .apply(req);
    }
}

/// Move-in details a landlord may attach when deciding on a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestExtras {
    pub joining_date: Option<String>,
    pub rent_notes: Option<String>,
    pub utility_details: Option<String>,
}

impl RequestExtras {
    pub fn apply(&self, req: &mut VerificationRequest) {
        if let Some(v) = &self.joining_date {
            req.joining_date = Some(v.clone());
        }
        if let Some(v) = &self.rent_notes {
            req.rent_notes = Some(v.clone());
        }
        if let Some(v) = &self.utility_details {
            req.utility_details = Some(v.clone());
        }
    }
}

// ── Tenant stays ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StayStatus {
    Active,
    MovedOut,
}

impl StayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StayStatus::Active => "ACTIVE",
            StayStatus::MovedOut => "MOVED_OUT",
        }
    }
}

/// The record of who currently lives where. A tenant has at most one
/// `Active` stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantStay {
    pub id: String,
    pub tenant_id: String,
    pub landlord_id: String,
    pub property_id: String,
    pub join_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_out_date: Option<DateTime<Utc>>,
    pub status: StayStatus,
}

/// An active stay joined with the names a landlord's tenant list shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandlordTenant {
    #[serde(flatten)]
    pub stay: TenantStay,
    pub tenant_name: String,
    pub property_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_address: Option<String>,
}

// ── History ledger ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryKind {
    Joined,
    LightBill,
    Remark,
    RentPayment,
    MoveOut,
    Payment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Paid,
    Pending,
}

/// Append-only ledger entry on a tenant's record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantHistory {
    pub id: String,
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<HistoryStatus>,
    pub date: DateTime<Utc>,
    pub created_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_transitions_only_move_forward() {
        use RequestStatus::{Approved, MovedOut, Pending, Rejected};

        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(MovedOut));
        assert!(Approved.can_transition_to(Approved));

        assert!(!Approved.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!MovedOut.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(MovedOut));

        assert!(Rejected.is_terminal());
        assert!(MovedOut.is_terminal());
        assert!(!Approved.is_terminal());
    }

    #[test]
    fn statuses_keep_their_stored_spelling() {
        assert_eq!(
            serde_json::to_string(&RequestStatus::MovedOut).unwrap(),
            "\"moved_out\""
        );
        assert_eq!(
            serde_json::to_string(&StayStatus::MovedOut).unwrap(),
            "\"MOVED_OUT\""
        );
        assert_eq!(
            serde_json::to_string(&HistoryKind::LightBill).unwrap(),
            "\"LIGHT_BILL\""
        );
    }

    #[test]
    fn landlord_tenant_flattens_stay() {
        let stay = TenantStay {
            id: "s1".into(),
            tenant_id: "t1".into(),
            landlord_id: "l1".into(),
            property_id: "p1".into(),
            join_date: Utc::now(),
            move_out_date: None,
            status: StayStatus::Active,
        };
        let row = LandlordTenant {
            stay,
            tenant_name: "Ravi".into(),
            property_name: "Lake View".into(),
            property_address: None,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["tenantId"], "t1");
        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["tenantName"], "Ravi");
    }

    #[test]
    fn patch_keeps_unlisted_fields() {
        let mut req = VerificationRequest::new("r1", "t1", "l1", Utc::now());
        req.city = "Pune".into();
        RequestPatch {
            remarks: Some("docs verified".into()),
            rent_notes: Some("due on 5th".into()),
            ..Default::default()
        }
        .apply(&mut req);
        assert_eq!(req.city, "Pune");
        assert_eq!(req.remarks.as_deref(), Some("docs verified"));
        assert_eq!(req.rent_notes.as_deref(), Some("due on 5th"));
        assert_eq!(req.status, RequestStatus::Pending);
    }
}
