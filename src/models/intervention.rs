use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle status of a field intervention.
///
/// `ongoing` is the initial state; `completed` and `missed` are terminal and
/// only ever set by the owning professional.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InterventionStatus {
    Ongoing,
    Completed,
    Missed,
}

/// Which client-facing experience a short-lived link grants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LinkKind {
    Tracking,
    Diagnostic,
}

/// One field-service visit. The id is both the primary key and the bearer
/// capability embedded in the `/track` and `/diag` URLs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intervention {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub client_name: String,
    pub location: String,
    pub intervention_type: String,
    pub status: InterventionStatus,
    pub diag_photos: Option<Vec<String>>,
    pub track_expires_at: DateTime<Utc>,
    pub diag_expires_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display information about the owning professional, joined from `profiles`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub director_name: Option<String>,
    pub avatar_url: Option<String>,
}
