use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::intervention::LinkKind;
use crate::models::notification::NotificationKind;
use crate::routes::ApiError;
use crate::services::feed::{ChangeAction, ChangeEvent, Collection};
use crate::services::gate;
use crate::services::intake::{self, PhotoBatch, SubmissionReport};

/// POST /api/v1/diag/{token}/photos — submit diagnostic photos.
///
/// Gated by the diagnostic horizon. Accepts up to 3 `photo` parts in capture
/// order; extra parts are dropped without error. Uploads are awaited
/// sequentially, a photo that still fails after retries is omitted but
/// counted, and the record is updated exactly once per submission.
pub async fn submit_photos(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SubmissionReport>, ApiError> {
    let record = queries::get_intervention(&state.db, token).await?;
    let intervention = gate::check(record.as_ref(), LinkKind::Diagnostic, Utc::now())?;
    let owner_id = intervention.owner_id;
    let client_name = intervention.client_name.clone();

    let mut batch = PhotoBatch::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart body".to_string()))?
    {
        if field.name() != Some("photo") {
            continue;
        }

        // Captures beyond the cap are dropped without being read, so a
        // malformed extra part cannot fail the submission.
        if batch.is_full() {
            tracing::debug!(token = %token, "photo beyond cap dropped");
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::Validation("unreadable photo part".to_string()))?;

        intake::accept_part(&mut batch, &data)
            .map_err(|_| ApiError::Validation("unsupported image format".to_string()))?;
    }

    if batch.is_empty() {
        return Err(ApiError::Validation(
            "at least one photo is required".to_string(),
        ));
    }

    // Upload in capture order, awaited one by one. An individual failure is
    // recorded, not fatal.
    let submitted_at = Utc::now();
    let mut results = Vec::with_capacity(batch.len());

    for (index, photo) in batch.into_photos().into_iter().enumerate() {
        let key = intake::photo_key(
            token,
            submitted_at.timestamp_millis(),
            index,
            &photo.extension,
        );

        let result = state
            .storage
            .upload_with_retry(&key, &photo.bytes, &photo.content_type)
            .await
            .map(|()| state.storage.public_url(&key));

        match &result {
            Ok(url) => {
                metrics::counter!("diag_photos_uploaded_total").increment(1);
                tracing::debug!(token = %token, url, "photo stored");
            }
            Err(e) => {
                metrics::counter!("diag_photos_failed_total").increment(1);
                tracing::warn!(token = %token, index, error = %e, "photo upload abandoned");
            }
        }

        results.push(result);
    }

    let report = intake::collect_report(results);

    // Single final update: photos plus the `ongoing` re-assertion. The
    // diagnostic horizon is re-checked at the update boundary.
    let updated =
        queries::attach_diag_photos(&state.db, token, &report.photo_urls, Utc::now()).await?;
    if !updated {
        return Err(ApiError::LinkExpired);
    }

    let notification = queries::create_notification(
        &state.db,
        owner_id,
        "Diagnostic reçu",
        &format!(
            "{} photo(s) envoyée(s) par {}",
            report.uploaded, client_name
        ),
        NotificationKind::Success,
    )
    .await?;

    state.feed.publish(ChangeEvent::new(
        Collection::Interventions,
        ChangeAction::Update,
        token,
        owner_id,
    ));
    state.feed.publish(ChangeEvent::new(
        Collection::Notifications,
        ChangeAction::Insert,
        notification.id,
        owner_id,
    ));

    tracing::info!(
        token = %token,
        accepted = report.accepted,
        uploaded = report.uploaded,
        "diagnostic submitted"
    );

    Ok(Json(report))
}
