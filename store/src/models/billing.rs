use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillKind {
    Rent,
    Electricity,
    Water,
    Maintenance,
    Other,
}

impl BillKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillKind::Rent => "RENT",
            BillKind::Electricity => "ELECTRICITY",
            BillKind::Water => "WATER",
            BillKind::Maintenance => "MAINTENANCE",
            BillKind::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Pending,
    Paid,
    Overdue,
}

/// A charge raised against a stay for one billing month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    pub stay_id: String,
    pub tenant_id: String,
    pub landlord_id: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: BillKind,
    /// Display month, e.g. `"December 2025"`.
    pub month: String,
    /// Metered units for utility bills.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<u32>,
    pub due_date: DateTime<Utc>,
    pub status: BillStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

/// Metadata for an uploaded file (rent agreement, ID scan, receipt). The
/// bytes themselves live outside the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub id: String,
    pub landlord_id: String,
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stay_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub uploaded_at: DateTime<Utc>,
}
