use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::app_state::AppState;
use crate::routes::{ApiError, AuthOwner};

/// GET /api/v1/events — the professional dashboard's realtime change feed.
///
/// Streams change events for the caller's own records across all three
/// collections. Events carry identity only; the dashboard re-queries the
/// touched collection on receipt. A subscriber that lags past the channel
/// capacity silently loses events and is expected to re-query everything
/// when it resumes.
pub async fn change_feed(
    State(state): State<AppState>,
    owner: AuthOwner,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let owner_id = owner.id;

    let stream = BroadcastStream::new(state.feed.subscribe())
        .filter_map(move |event| event.ok().filter(|e| e.owner_id == owner_id))
        .map(|event| {
            Ok(Event::default()
                .event("change")
                .data(serde_json::to_string(&event).unwrap_or_default()))
        });

    tracing::debug!(owner_id = %owner_id, "dashboard subscribed to change feed");

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
