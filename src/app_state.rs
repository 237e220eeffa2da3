use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{
    auth::JwtKeys,
    feed::ChangeFeed,
    positions::PositionHub,
    storage::StorageClient,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub storage: Arc<StorageClient>,
    pub feed: ChangeFeed,
    pub positions: Arc<PositionHub>,
    pub auth: Arc<JwtKeys>,
    /// Base URL under which `/track/{token}` and `/diag/{token}` are shared.
    pub public_base_url: Arc<str>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        storage: StorageClient,
        feed: ChangeFeed,
        positions: PositionHub,
        auth: JwtKeys,
        public_base_url: &str,
    ) -> Self {
        Self {
            db,
            storage: Arc::new(storage),
            feed,
            positions: Arc::new(positions),
            auth: Arc::new(auth),
            public_base_url: Arc::from(public_base_url.trim_end_matches('/')),
        }
    }
}
