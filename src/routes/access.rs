use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::Utc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::intervention::LinkKind;
use crate::models::link::AccessResponse;
use crate::routes::ApiError;
use crate::services::gate;

/// Run the access gate for a token: fetch, then existence + expiry check for
/// the requested experience. Pure read; grants nothing but a view.
async fn admit(
    state: &AppState,
    token: Uuid,
    kind: LinkKind,
) -> Result<AccessResponse, ApiError> {
    let record = queries::get_intervention_with_profile(&state.db, token).await?;

    let outcome = gate::check(record.as_ref().map(|(i, _)| i), kind, Utc::now());
    let label = match &outcome {
        Ok(_) => "granted",
        Err(gate::GateError::NotFound) => "not_found",
        Err(gate::GateError::Expired) => "expired",
    };
    metrics::counter!("gate_checks_total", "outcome" => label).increment(1);

    let intervention = outcome?;
    let (_, profile) = record.as_ref().ok_or(ApiError::InvalidLink)?;

    tracing::info!(token = %token, kind = %kind, "client admitted");

    Ok(AccessResponse {
        client_name: intervention.client_name.clone(),
        intervention_type: intervention.intervention_type.clone(),
        location: intervention.location.clone(),
        status: intervention.status,
        professional_name: profile.director_name.clone(),
        professional_avatar_url: profile.avatar_url.clone(),
        expires_at: gate::expiry_for(intervention, kind),
    })
}

/// GET /api/v1/track/{token} — admit a live tracking session.
pub async fn track_access(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<Json<AccessResponse>, ApiError> {
    admit(&state, token, LinkKind::Tracking).await.map(Json)
}

/// GET /api/v1/diag/{token} — admit a diagnostic intake session.
pub async fn diag_access(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<Json<AccessResponse>, ApiError> {
    admit(&state, token, LinkKind::Diagnostic).await.map(Json)
}

/// GET /api/v1/track/{token}/positions — stream position reports for a
/// tracked intervention as SSE, gated by the tracking horizon. The latest
/// known position is replayed first so a fresh session has something to
/// render before the next report.
pub async fn track_positions(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    // Same gate as the tracking view itself.
    admit(&state, token, LinkKind::Tracking).await?;

    // Subscribe before snapshotting the last value: a report landing in
    // between then shows up on the live stream instead of being lost. At
    // worst the client renders the same position twice.
    let live = BroadcastStream::new(state.positions.subscribe()).filter_map(move |update| {
        // Lagged receivers drop events; clients re-sync on the next report.
        update.ok().filter(|u| u.intervention_id == token)
    });
    let replay = state.positions.latest(token);

    let stream = tokio_stream::iter(replay).chain(live).map(|update| {
        Ok(Event::default()
            .event("position")
            .data(serde_json::to_string(&update).unwrap_or_default()))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
