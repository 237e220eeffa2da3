use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::intervention::Intervention;
use crate::models::link::{PositionRequest, StatusUpdateRequest};
use crate::routes::{ApiError, AuthOwner};
use crate::services::feed::{ChangeAction, ChangeEvent, Collection};
use crate::services::positions::PositionUpdate;

/// GET /api/v1/interventions — the professional's records, newest first.
pub async fn list(
    State(state): State<AppState>,
    owner: AuthOwner,
) -> Result<Json<Vec<Intervention>>, ApiError> {
    let interventions = queries::list_interventions(&state.db, owner.id).await?;
    Ok(Json(interventions))
}

/// GET /api/v1/interventions/export — CSV export of the professional's
/// interventions, mirroring the dashboard export format.
pub async fn export_csv(
    State(state): State<AppState>,
    owner: AuthOwner,
) -> Result<Response, ApiError> {
    let interventions = queries::list_interventions(&state.db, owner.id).await?;

    let mut csv = String::from("ID,Client,Lieu,Heure,Type\n");
    for i in &interventions {
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            i.id,
            i.client_name,
            i.location,
            i.created_at.format("%H:%M"),
            i.intervention_type
        ));
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"interventions_export.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

/// PATCH /api/v1/interventions/{id}/status — set the lifecycle status.
/// `completed` and `missed` are terminal; only the owner may transition.
pub async fn set_status(
    State(state): State<AppState>,
    owner: AuthOwner,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = queries::update_status(&state.db, id, owner.id, request.status).await?;
    if !updated {
        return Err(ApiError::NotFound);
    }

    tracing::info!(intervention_id = %id, status = %request.status, "status updated");

    state.feed.publish(ChangeEvent::new(
        Collection::Interventions,
        ChangeAction::Update,
        id,
        owner.id,
    ));

    Ok(Json(serde_json::json!({ "status": request.status })))
}

/// PUT /api/v1/interventions/{id}/position — publish the professional's
/// current position for the tracking view. Ephemeral: fanned out, never
/// persisted.
pub async fn publish_position(
    State(state): State<AppState>,
    owner: AuthOwner,
    Path(id): Path<Uuid>,
    Json(request): Json<PositionRequest>,
) -> Result<Json<PositionUpdate>, ApiError> {
    request.validate()?;

    // Only the owner of the intervention may feed its position stream.
    let record = queries::get_intervention(&state.db, id).await?;
    match record {
        Some(ref i) if i.owner_id == owner.id => {}
        _ => return Err(ApiError::NotFound),
    }

    let update = state.positions.publish(id, request.lat, request.lng);
    Ok(Json(update))
}
