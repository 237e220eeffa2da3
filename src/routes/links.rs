use axum::extract::State;
use axum::Json;
use chrono::Utc;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::intervention::LinkKind;
use crate::models::link::{IssueLinkRequest, IssueLinkResponse};
use crate::routes::{ApiError, AuthOwner};
use crate::services::feed::{ChangeAction, ChangeEvent, Collection};
use crate::services::gate;

/// POST /api/v1/links — issue a short-lived client link.
///
/// One intervention record per press; both horizons are computed whichever
/// kind was requested. The token is a fresh UUID v4 generated here, never a
/// database sequence: it doubles as the bearer capability in the URL.
pub async fn issue_link(
    State(state): State<AppState>,
    owner: AuthOwner,
    Json(request): Json<IssueLinkRequest>,
) -> Result<Json<IssueLinkResponse>, ApiError> {
    request.validate()?;

    let client_name = request.client_name.trim();
    if client_name.is_empty() {
        return Err(ApiError::Validation(
            "client_name must not be blank".to_string(),
        ));
    }

    let now = Utc::now();
    let token = Uuid::new_v4();
    let horizons = gate::horizons(now);

    let intervention_type = match request.kind {
        LinkKind::Diagnostic => "Diagnostic",
        LinkKind::Tracking => "Dépannage",
    };

    let intervention = queries::create_intervention(
        &state.db,
        token,
        owner.id,
        client_name,
        intervention_type,
        horizons,
        now,
    )
    .await?;

    metrics::counter!("links_issued_total").increment(1);
    tracing::info!(
        intervention_id = %intervention.id,
        kind = %request.kind,
        "link issued"
    );

    state.feed.publish(ChangeEvent::new(
        Collection::Interventions,
        ChangeAction::Insert,
        intervention.id,
        owner.id,
    ));

    let base = &state.public_base_url;
    Ok(Json(IssueLinkResponse {
        id: intervention.id,
        track_url: format!("{base}/track/{}", intervention.id),
        diag_url: format!("{base}/diag/{}", intervention.id),
        track_expires_at: intervention.track_expires_at,
        diag_expires_at: intervention.diag_expires_at,
    }))
}
