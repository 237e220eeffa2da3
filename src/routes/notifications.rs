use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::notification::Notification;
use crate::routes::{ApiError, AuthOwner};
use crate::services::feed::{ChangeAction, ChangeEvent, Collection};

/// GET /api/v1/notifications — the professional's notifications, newest
/// first.
pub async fn list(
    State(state): State<AppState>,
    owner: AuthOwner,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = queries::list_notifications(&state.db, owner.id).await?;
    Ok(Json(notifications))
}

/// POST /api/v1/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    owner: AuthOwner,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = queries::mark_notification_read(&state.db, id, owner.id).await?;
    if !updated {
        return Err(ApiError::NotFound);
    }

    state.feed.publish(ChangeEvent::new(
        Collection::Notifications,
        ChangeAction::Update,
        id,
        owner.id,
    ));

    Ok(Json(serde_json::json!({ "read": true })))
}
