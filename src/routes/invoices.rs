use axum::extract::{Path, State};
use axum::Json;
use chrono::{Datelike, Utc};
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::invoice_queries;
use crate::models::invoice::{Invoice, InvoiceItem, InvoiceStatus};
use crate::routes::{ApiError, AuthOwner};
use crate::services::billing::{self, DocKind};
use crate::services::feed::{ChangeAction, ChangeEvent, Collection};

#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[garde(length(min = 1, max = 200))]
    pub client_name: String,

    #[garde(skip)]
    pub client_email: Option<String>,

    #[garde(skip)]
    pub kind: DocKind,

    #[garde(skip)]
    #[serde(default)]
    pub items: Vec<InvoiceItem>,

    #[garde(range(min = 0.0))]
    #[serde(default)]
    pub labor_cost: f64,

    #[garde(range(min = 0.0))]
    #[serde(default)]
    pub travel_cost: f64,
}

#[derive(Debug, serde::Deserialize)]
pub struct SignRequest {
    /// Base64-encoded signature image captured client-side.
    pub signature: String,
}

/// POST /api/v1/invoices — create a quote (`D…`, draft) or invoice
/// (`F…`, pending). Totals are always recomputed server-side.
pub async fn create(
    State(state): State<AppState>,
    owner: AuthOwner,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<Json<Invoice>, ApiError> {
    request.validate()?;

    let now = Utc::now();
    let sequence = invoice_queries::next_sequence(&state.db, owner.id, now.year()).await?;
    let doc_number = billing::doc_number(request.kind, now.year(), sequence);

    let status = match request.kind {
        DocKind::Quote => InvoiceStatus::Draft,
        DocKind::Invoice => InvoiceStatus::Pending,
    };

    let totals = billing::compute_totals(
        &request.items,
        request.labor_cost,
        request.travel_cost,
    );

    let invoice = invoice_queries::create_invoice(
        &state.db,
        owner.id,
        &doc_number,
        request.client_name.trim(),
        request.client_email.as_deref(),
        status,
        &request.items,
        request.labor_cost,
        request.travel_cost,
        totals,
    )
    .await?;

    tracing::info!(invoice_id = %invoice.id, doc_number = %invoice.doc_number, "document created");

    state.feed.publish(ChangeEvent::new(
        Collection::Invoices,
        ChangeAction::Insert,
        invoice.id,
        owner.id,
    ));

    Ok(Json(invoice))
}

/// GET /api/v1/invoices — the professional's documents, newest first.
pub async fn list(
    State(state): State<AppState>,
    owner: AuthOwner,
) -> Result<Json<Vec<Invoice>>, ApiError> {
    let invoices = invoice_queries::list_invoices(&state.db, owner.id).await?;
    Ok(Json(invoices))
}

/// GET /api/v1/invoices/{id}
pub async fn get(
    State(state): State<AppState>,
    owner: AuthOwner,
    Path(id): Path<Uuid>,
) -> Result<Json<Invoice>, ApiError> {
    let invoice = invoice_queries::get_invoice(&state.db, id, owner.id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(invoice))
}

/// POST /api/v1/invoices/{id}/sign — attach a client signature to a draft
/// quote; the document moves to `signed`.
pub async fn sign(
    State(state): State<AppState>,
    owner: AuthOwner,
    Path(id): Path<Uuid>,
    Json(request): Json<SignRequest>,
) -> Result<Json<Invoice>, ApiError> {
    use base64::Engine;
    if base64::engine::general_purpose::STANDARD
        .decode(request.signature.as_bytes())
        .is_err()
    {
        return Err(ApiError::Validation(
            "signature must be base64-encoded image data".to_string(),
        ));
    }

    let invoice = invoice_queries::sign_invoice(&state.db, id, owner.id, &request.signature)
        .await?
        .ok_or(ApiError::Conflict("only draft documents can be signed"))?;

    state.feed.publish(ChangeEvent::new(
        Collection::Invoices,
        ChangeAction::Update,
        invoice.id,
        owner.id,
    ));

    Ok(Json(invoice))
}

/// POST /api/v1/invoices/{id}/convert — turn a quote into an invoice:
/// `D…` renumbers to `F…`, status moves to `pending`.
pub async fn convert(
    State(state): State<AppState>,
    owner: AuthOwner,
    Path(id): Path<Uuid>,
) -> Result<Json<Invoice>, ApiError> {
    let existing = invoice_queries::get_invoice(&state.db, id, owner.id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let new_number = billing::convert_doc_number(&existing.doc_number);
    let invoice = invoice_queries::convert_invoice(&state.db, id, owner.id, &new_number)
        .await?
        .ok_or(ApiError::Conflict("only quotes can be converted"))?;

    tracing::info!(invoice_id = %id, doc_number = %invoice.doc_number, "quote converted");

    state.feed.publish(ChangeEvent::new(
        Collection::Invoices,
        ChangeAction::Update,
        invoice.id,
        owner.id,
    ));

    Ok(Json(invoice))
}

/// POST /api/v1/invoices/{id}/paid
pub async fn mark_paid(
    State(state): State<AppState>,
    owner: AuthOwner,
    Path(id): Path<Uuid>,
) -> Result<Json<Invoice>, ApiError> {
    let invoice = invoice_queries::mark_paid(&state.db, id, owner.id)
        .await?
        .ok_or(ApiError::NotFound)?;

    state.feed.publish(ChangeEvent::new(
        Collection::Invoices,
        ChangeAction::Update,
        invoice.id,
        owner.id,
    ));

    Ok(Json(invoice))
}

/// DELETE /api/v1/invoices/{id}
pub async fn delete(
    State(state): State<AppState>,
    owner: AuthOwner,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = invoice_queries::delete_invoice(&state.db, id, owner.id).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }

    state.feed.publish(ChangeEvent::new(
        Collection::Invoices,
        ChangeAction::Delete,
        id,
        owner.id,
    ));

    Ok(Json(serde_json::json!({ "deleted": true })))
}
