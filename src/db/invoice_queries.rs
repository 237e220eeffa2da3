use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::invoice::{Invoice, InvoiceItem, InvoiceStatus};
use crate::services::billing::Totals;

const INVOICE_COLUMNS: &str = "id, owner_id, doc_number, client_name, client_email, status, \
     items, labor_cost, travel_cost, amount_ht, amount_ttc, signature, created_at, updated_at";

fn invoice_from_row(row: &PgRow) -> Result<Invoice, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let items: serde_json::Value = row.try_get("items")?;
    let items: Vec<InvoiceItem> = serde_json::from_value(items).unwrap_or_default();

    Ok(Invoice {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        doc_number: row.try_get("doc_number")?,
        client_name: row.try_get("client_name")?,
        client_email: row.try_get("client_email")?,
        status: status.parse().unwrap_or(InvoiceStatus::Draft),
        items,
        labor_cost: row.try_get("labor_cost")?,
        travel_cost: row.try_get("travel_cost")?,
        amount_ht: row.try_get("amount_ht")?,
        amount_ttc: row.try_get("amount_ttc")?,
        signature: row.try_get("signature")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Next document sequence number for an owner in the given year.
pub async fn next_sequence(pool: &PgPool, owner_id: Uuid, year: i32) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS existing
        FROM invoices
        WHERE owner_id = $1 AND date_part('year', created_at) = $2
        "#,
    )
    .bind(owner_id)
    .bind(f64::from(year))
    .fetch_one(pool)
    .await?;

    let existing: i64 = row.try_get("existing")?;
    Ok(existing + 1)
}

/// Insert a new billing document with server-computed totals.
#[allow(clippy::too_many_arguments)]
pub async fn create_invoice(
    pool: &PgPool,
    owner_id: Uuid,
    doc_number: &str,
    client_name: &str,
    client_email: Option<&str>,
    status: InvoiceStatus,
    items: &[InvoiceItem],
    labor_cost: f64,
    travel_cost: f64,
    totals: Totals,
) -> Result<Invoice, sqlx::Error> {
    let items_json = serde_json::to_value(items).unwrap_or_else(|_| serde_json::json!([]));

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO invoices
            (id, owner_id, doc_number, client_name, client_email, status,
             items, labor_cost, travel_cost, amount_ht, amount_ttc)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {INVOICE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .bind(doc_number)
    .bind(client_name)
    .bind(client_email)
    .bind(status.to_string())
    .bind(items_json)
    .bind(labor_cost)
    .bind(travel_cost)
    .bind(totals.amount_ht)
    .bind(totals.amount_ttc)
    .fetch_one(pool)
    .await?;

    invoice_from_row(&row)
}

/// Get one owned billing document.
pub async fn get_invoice(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
) -> Result<Option<Invoice>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 AND owner_id = $2"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(invoice_from_row).transpose()
}

/// List an owner's billing documents, newest first.
pub async fn list_invoices(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Invoice>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices \
         WHERE owner_id = $1 ORDER BY created_at DESC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(invoice_from_row).collect()
}

/// Attach a signature to a draft quote and move it to `signed`.
/// Returns None when the document is missing or not in `draft`.
pub async fn sign_invoice(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
    signature: &str,
) -> Result<Option<Invoice>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE invoices
        SET signature = $1, status = 'signed', updated_at = NOW()
        WHERE id = $2 AND owner_id = $3 AND status = 'draft'
        RETURNING {INVOICE_COLUMNS}
        "#
    ))
    .bind(signature)
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(invoice_from_row).transpose()
}

/// Convert a quote into an invoice: renumber `D…` to `F…`, status to
/// `pending`. Returns None when the document is missing or already an
/// invoice.
pub async fn convert_invoice(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
    new_number: &str,
) -> Result<Option<Invoice>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE invoices
        SET doc_number = $1, status = 'pending', updated_at = NOW()
        WHERE id = $2 AND owner_id = $3 AND doc_number LIKE 'D%'
        RETURNING {INVOICE_COLUMNS}
        "#
    ))
    .bind(new_number)
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(invoice_from_row).transpose()
}

/// Mark an invoice paid.
pub async fn mark_paid(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
) -> Result<Option<Invoice>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE invoices
        SET status = 'paid', updated_at = NOW()
        WHERE id = $1 AND owner_id = $2
        RETURNING {INVOICE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(invoice_from_row).transpose()
}

/// Delete a billing document. Returns false when no owned record matched.
pub async fn delete_invoice(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM invoices WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
