use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::services::gate::GateError;
use crate::services::storage::StorageError;

pub mod access;
pub mod events;
pub mod health;
pub mod intake;
pub mod interventions;
pub mod invoices;
pub mod links;
pub mod notifications;

/// Error surface of the HTTP API. NotFound and Expired are terminal gate
/// outcomes with distinct client messages; transient backend faults are
/// retryable and say so.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Ce lien est invalide.")]
    InvalidLink,

    #[error("Ce lien est arrivé à expiration.")]
    LinkExpired,

    #[error("resource not found")]
    NotFound,

    #[error("missing or invalid credentials")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("service temporarily unavailable, please retry")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidLink => "invalid_link",
            ApiError::LinkExpired => "link_expired",
            ApiError::NotFound => "not_found",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Validation(_) => "validation_failed",
            ApiError::Conflict(_) => "conflict",
            ApiError::Backend(_) => "backend_unavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidLink | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::LinkExpired => StatusCode::GONE,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Backend(ref source) = self {
            tracing::error!(error = %source, "backend fault surfaced to client");
        }

        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::NotFound => ApiError::InvalidLink,
            GateError::Expired => ApiError::LinkExpired,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ApiError::Conflict("conflicting write, please retry")
            }
            other => ApiError::Backend(Box::new(other)),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Backend(Box::new(err))
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::Validation(report.to_string())
    }
}

/// The authenticated professional, extracted from the bearer token on every
/// owner-facing route.
#[derive(Debug, Clone)]
pub struct AuthOwner {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl FromRequestParts<AppState> for AuthOwner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let claims = state
            .auth
            .verify(token)
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthOwner {
            id: claims.sub,
            name: claims.name,
            avatar_url: claims.avatar_url,
        })
    }
}
