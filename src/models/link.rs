use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::intervention::{InterventionStatus, LinkKind};

/// Request to issue a short-lived client link.
#[derive(Debug, Deserialize, Validate)]
pub struct IssueLinkRequest {
    #[garde(length(min = 1, max = 200))]
    pub client_name: String,

    #[garde(skip)]
    pub kind: LinkKind,
}

/// Response after issuing a link. Both URLs are always returned: the record
/// carries both horizons regardless of which kind was requested.
#[derive(Debug, Serialize, Deserialize)]
pub struct IssueLinkResponse {
    pub id: Uuid,
    pub track_url: String,
    pub diag_url: String,
    pub track_expires_at: DateTime<Utc>,
    pub diag_expires_at: DateTime<Utc>,
}

/// What the access gate exposes to an anonymous client holding a valid token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessResponse {
    pub client_name: String,
    pub intervention_type: String,
    pub location: String,
    pub status: InterventionStatus,
    pub professional_name: Option<String>,
    pub professional_avatar_url: Option<String>,
    /// Expiry of the horizon matching the requested experience.
    pub expires_at: DateTime<Utc>,
}

/// Request to update an intervention's lifecycle status.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: InterventionStatus,
}

/// A position report for a tracked intervention.
#[derive(Debug, Deserialize, Validate)]
pub struct PositionRequest {
    #[garde(range(min = -90.0, max = 90.0))]
    pub lat: f64,

    #[garde(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}
