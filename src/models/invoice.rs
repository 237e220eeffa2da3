use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Billing document status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Signed,
    Pending,
    Paid,
}

/// One billed line on a quote or invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

/// A quote (`D…` document number) or invoice (`F…`). Related to interventions
/// by client name only; there is no enforced foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub doc_number: String,
    pub client_name: String,
    pub client_email: Option<String>,
    pub status: InvoiceStatus,
    pub items: Vec<InvoiceItem>,
    pub labor_cost: f64,
    pub travel_cost: f64,
    pub amount_ht: f64,
    pub amount_ttc: f64,
    /// Base64-encoded signature image, set once the client signs.
    pub signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
