use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::intervention::{Intervention, InterventionStatus, OwnerProfile};
use crate::models::notification::{Notification, NotificationKind};
use crate::services::gate::Horizons;

const INTERVENTION_COLUMNS: &str = "id, owner_id, client_name, location, intervention_type, \
     status, diag_photos, track_expires_at, diag_expires_at, scheduled_at, created_at, updated_at";

fn intervention_from_row(row: &PgRow) -> Result<Intervention, sqlx::Error> {
    let status: String = row.try_get("status")?;

    Ok(Intervention {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        client_name: row.try_get("client_name")?,
        location: row.try_get("location")?,
        intervention_type: row.try_get("intervention_type")?,
        status: status.parse().unwrap_or(InterventionStatus::Ongoing),
        diag_photos: row.try_get("diag_photos")?,
        track_expires_at: row.try_get("track_expires_at")?,
        diag_expires_at: row.try_get("diag_expires_at")?,
        scheduled_at: row.try_get("scheduled_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a new intervention with both expiry horizons fixed at creation.
/// Single statement: the record either exists in full or not at all.
pub async fn create_intervention(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
    client_name: &str,
    intervention_type: &str,
    horizons: Horizons,
    scheduled_at: DateTime<Utc>,
) -> Result<Intervention, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO interventions
            (id, owner_id, client_name, intervention_type, status,
             track_expires_at, diag_expires_at, scheduled_at)
        VALUES ($1, $2, $3, $4, 'ongoing', $5, $6, $7)
        RETURNING {INTERVENTION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(owner_id)
    .bind(client_name)
    .bind(intervention_type)
    .bind(horizons.track_expires_at)
    .bind(horizons.diag_expires_at)
    .bind(scheduled_at)
    .fetch_one(pool)
    .await?;

    intervention_from_row(&row)
}

/// Get an intervention by its token.
pub async fn get_intervention(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<Intervention>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {INTERVENTION_COLUMNS} FROM interventions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(intervention_from_row).transpose()
}

/// Get an intervention together with the owning professional's display
/// profile, for the client-facing views.
pub async fn get_intervention_with_profile(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<(Intervention, OwnerProfile)>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT i.id, i.owner_id, i.client_name, i.location, i.intervention_type,
               i.status, i.diag_photos, i.track_expires_at, i.diag_expires_at,
               i.scheduled_at, i.created_at, i.updated_at,
               p.director_name, p.avatar_url
        FROM interventions i
        LEFT JOIN profiles p ON p.user_id = i.owner_id
        WHERE i.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => {
            let intervention = intervention_from_row(&r)?;
            let profile = OwnerProfile {
                director_name: r.try_get("director_name")?,
                avatar_url: r.try_get("avatar_url")?,
            };
            Ok(Some((intervention, profile)))
        }
        None => Ok(None),
    }
}

/// List a professional's interventions, newest first.
pub async fn list_interventions(
    pool: &PgPool,
    owner_id: Uuid,
) -> Result<Vec<Intervention>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {INTERVENTION_COLUMNS} FROM interventions \
         WHERE owner_id = $1 ORDER BY created_at DESC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(intervention_from_row).collect()
}

/// Set an intervention's lifecycle status, scoped to its owner.
/// Returns false when no owned record matched.
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
    status: InterventionStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE interventions
        SET status = $1, updated_at = NOW()
        WHERE id = $2 AND owner_id = $3
        "#,
    )
    .bind(status.to_string())
    .bind(id)
    .bind(owner_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Attach diagnostic photos and re-assert `ongoing`, in one update.
///
/// The diagnostic horizon is re-checked here: the gate ran before the
/// uploads, and the horizon may have lapsed meanwhile. Returns false when
/// the record is gone or its diagnostic window has closed.
pub async fn attach_diag_photos(
    pool: &PgPool,
    id: Uuid,
    photo_urls: &[String],
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE interventions
        SET diag_photos = $1, status = 'ongoing', updated_at = NOW()
        WHERE id = $2 AND diag_expires_at > $3
        "#,
    )
    .bind(photo_urls)
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn notification_from_row(row: &PgRow) -> Result<Notification, sqlx::Error> {
    let kind: String = row.try_get("kind")?;

    Ok(Notification {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        kind: kind.parse().unwrap_or(NotificationKind::Info),
        read: row.try_get("read")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert a dashboard notification for a professional.
pub async fn create_notification(
    pool: &PgPool,
    owner_id: Uuid,
    title: &str,
    message: &str,
    kind: NotificationKind,
) -> Result<Notification, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO notifications (id, owner_id, title, message, kind)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, owner_id, title, message, kind, read, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .bind(title)
    .bind(message)
    .bind(kind.to_string())
    .fetch_one(pool)
    .await?;

    notification_from_row(&row)
}

/// List a professional's notifications, newest first.
pub async fn list_notifications(
    pool: &PgPool,
    owner_id: Uuid,
) -> Result<Vec<Notification>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, owner_id, title, message, kind, read, created_at \
         FROM notifications WHERE owner_id = $1 ORDER BY created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(notification_from_row).collect()
}

/// Mark a notification read. Returns false when no owned record matched.
pub async fn mark_notification_read(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET read = TRUE WHERE id = $1 AND owner_id = $2",
    )
    .bind(id)
    .bind(owner_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
