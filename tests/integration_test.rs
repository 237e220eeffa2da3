use chrono::Utc;
use fieldlink::{
    config::AppConfig,
    db::{self, invoice_queries, queries},
    models::intervention::{InterventionStatus, LinkKind},
    models::invoice::{InvoiceItem, InvoiceStatus},
    models::notification::NotificationKind,
    services::{billing, billing::DocKind, gate, intake, storage::StorageClient},
};
use uuid::Uuid;

/// Integration test: full link lifecycle
///
/// Covers the complete flow against live dependencies:
/// 1. Database connection, schema and migrations
/// 2. Link issuance (record creation with both horizons)
/// 3. Access gate decisions for both link kinds
/// 4. Photo storage (upload/public URL/delete)
/// 5. Diagnostic submission (single photo-attach update)
/// 6. Notifications and billing documents
///
/// Note: This requires a running PostgreSQL instance and an S3-compatible
/// bucket configured via environment variables.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_full_link_lifecycle() {
    // Load config from environment
    let config = AppConfig::from_env().expect("Failed to load config");

    // Initialize database
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    // Initialize storage
    let storage = StorageClient::new(
        &config.storage_bucket,
        &config.storage_endpoint,
        &config.storage_access_key,
        &config.storage_secret_key,
        &config.storage_public_url,
    )
    .expect("Failed to initialize storage");

    storage.check().await.expect("Storage probe failed");

    // Seed an owning professional profile
    let owner_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO profiles (user_id, director_name, company_name, avatar_url)
         VALUES ($1, 'Marc Dubois', 'Dubois Plomberie', NULL)",
    )
    .bind(owner_id)
    .execute(&pool)
    .await
    .expect("Failed to seed profile");

    // 1. Issue a link: one record, both horizons fixed at creation
    let now = Utc::now();
    let token = Uuid::new_v4();
    let horizons = gate::horizons(now);
    assert!(horizons.diag_expires_at < horizons.track_expires_at);

    let intervention = queries::create_intervention(
        &pool,
        token,
        owner_id,
        "M. Jean Dupont",
        "Diagnostic",
        horizons,
        now,
    )
    .await
    .expect("Failed to create intervention");

    assert_eq!(intervention.id, token);
    assert_eq!(intervention.status, InterventionStatus::Ongoing);
    assert_eq!(intervention.client_name, "M. Jean Dupont");
    assert!(intervention.diag_photos.is_none());

    // 2. Access gate: immediate resolve renders the client name for both kinds
    let (fetched, profile) = queries::get_intervention_with_profile(&pool, token)
        .await
        .expect("Failed to fetch intervention")
        .expect("Intervention not found");

    assert_eq!(profile.director_name.as_deref(), Some("Marc Dubois"));

    let admitted = gate::check(Some(&fetched), LinkKind::Diagnostic, Utc::now())
        .expect("Diagnostic gate should admit a fresh link");
    assert_eq!(admitted.client_name, "M. Jean Dupont");
    gate::check(Some(&fetched), LinkKind::Tracking, Utc::now())
        .expect("Tracking gate should admit a fresh link");

    // Unknown token is NotFound, never Expired
    let missing = queries::get_intervention(&pool, Uuid::new_v4())
        .await
        .expect("Failed to query missing token");
    assert_eq!(
        gate::check(missing.as_ref(), LinkKind::Tracking, Utc::now()),
        Err(gate::GateError::NotFound)
    );

    // 3. Upload two diagnostic photos
    let submitted_at = Utc::now().timestamp_millis();
    let mut urls = Vec::new();
    for (index, bytes) in [b"fake photo one".as_slice(), b"fake photo two"].iter().enumerate() {
        let key = intake::photo_key(token, submitted_at, index, "jpg");
        storage
            .upload_with_retry(&key, bytes, "image/jpeg")
            .await
            .expect("Photo upload failed");
        urls.push(storage.public_url(&key));
    }

    // 4. Single final update: photos attached, status re-asserted
    let updated = queries::attach_diag_photos(&pool, token, &urls, Utc::now())
        .await
        .expect("Failed to attach photos");
    assert!(updated);

    let after = queries::get_intervention(&pool, token)
        .await
        .expect("Failed to refetch")
        .expect("Intervention disappeared");

    assert_eq!(after.status, InterventionStatus::Ongoing);
    assert_eq!(after.diag_photos.as_deref(), Some(urls.as_slice()));

    // 5. Notification for the professional
    let notification = queries::create_notification(
        &pool,
        owner_id,
        "Diagnostic reçu",
        "2 photo(s) envoyée(s) par M. Jean Dupont",
        NotificationKind::Success,
    )
    .await
    .expect("Failed to create notification");

    assert!(!notification.read);

    let marked = queries::mark_notification_read(&pool, notification.id, owner_id)
        .await
        .expect("Failed to mark read");
    assert!(marked);

    // 6. Billing document lifecycle: quote → signed → invoice → paid
    let year = Utc::now().format("%Y").to_string().parse::<i32>().unwrap();
    let sequence = invoice_queries::next_sequence(&pool, owner_id, year)
        .await
        .expect("Failed to compute sequence");
    let doc_number = billing::doc_number(DocKind::Quote, year, sequence);
    assert!(doc_number.starts_with('D'));

    let items = vec![InvoiceItem {
        description: "Remplacement chauffe-eau".to_string(),
        quantity: 1.0,
        unit_price: 890.0,
    }];
    let totals = billing::compute_totals(&items, 150.0, 40.0);

    let quote = invoice_queries::create_invoice(
        &pool,
        owner_id,
        &doc_number,
        "M. Jean Dupont",
        None,
        InvoiceStatus::Draft,
        &items,
        150.0,
        40.0,
        totals,
    )
    .await
    .expect("Failed to create quote");

    assert_eq!(quote.status, InvoiceStatus::Draft);
    assert_eq!(quote.amount_ht, 1080.0);
    assert_eq!(quote.amount_ttc, 1296.0);

    // Re-using a document number for the same owner trips the unique guard
    let duplicate = invoice_queries::create_invoice(
        &pool,
        owner_id,
        &doc_number,
        "M. Jean Dupont",
        None,
        InvoiceStatus::Draft,
        &items,
        150.0,
        40.0,
        totals,
    )
    .await;
    assert!(duplicate.is_err());

    let signed = invoice_queries::sign_invoice(&pool, quote.id, owner_id, "aGVsbG8=")
        .await
        .expect("Failed to sign")
        .expect("Draft should be signable");
    assert_eq!(signed.status, InvoiceStatus::Signed);

    // Signing twice is refused: no longer a draft
    let resigned = invoice_queries::sign_invoice(&pool, quote.id, owner_id, "aGVsbG8=")
        .await
        .expect("Failed to re-sign");
    assert!(resigned.is_none());

    let converted = invoice_queries::convert_invoice(
        &pool,
        quote.id,
        owner_id,
        &billing::convert_doc_number(&signed.doc_number),
    )
    .await
    .expect("Failed to convert")
    .expect("Quote should convert");
    assert!(converted.doc_number.starts_with('F'));
    assert_eq!(converted.status, InvoiceStatus::Pending);

    let paid = invoice_queries::mark_paid(&pool, quote.id, owner_id)
        .await
        .expect("Failed to mark paid")
        .expect("Invoice should exist");
    assert_eq!(paid.status, InvoiceStatus::Paid);

    // Cleanup
    for (index, _) in urls.iter().enumerate() {
        let key = intake::photo_key(token, submitted_at, index, "jpg");
        storage.delete(&key).await.expect("Failed to delete photo");
    }

    sqlx::query("DELETE FROM invoices WHERE owner_id = $1")
        .bind(owner_id)
        .execute(&pool)
        .await
        .expect("Failed to clean invoices");
    sqlx::query("DELETE FROM notifications WHERE owner_id = $1")
        .bind(owner_id)
        .execute(&pool)
        .await
        .expect("Failed to clean notifications");
    sqlx::query("DELETE FROM interventions WHERE owner_id = $1")
        .bind(owner_id)
        .execute(&pool)
        .await
        .expect("Failed to clean interventions");
    sqlx::query("DELETE FROM profiles WHERE user_id = $1")
        .bind(owner_id)
        .execute(&pool)
        .await
        .expect("Failed to clean profile");

    println!("✅ Full link lifecycle passed");
}

/// The expired-diagnostic update path: once the diagnostic horizon lapses,
/// the final photo-attach update refuses to touch the record even though
/// the tracking horizon is still open.
#[tokio::test]
#[ignore]
async fn test_attach_refused_after_diag_horizon() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let owner_id = Uuid::new_v4();
    let token = Uuid::new_v4();

    // Backdate issuance by 3 hours: diag horizon lapsed, track still open.
    let issued = Utc::now() - chrono::Duration::hours(3);
    let horizons = gate::horizons(issued);

    let record = queries::create_intervention(
        &pool,
        token,
        owner_id,
        "Mme Martin",
        "Diagnostic",
        horizons,
        issued,
    )
    .await
    .expect("Failed to create intervention");

    assert_eq!(
        gate::check(Some(&record), LinkKind::Diagnostic, Utc::now()),
        Err(gate::GateError::Expired)
    );
    assert!(gate::check(Some(&record), LinkKind::Tracking, Utc::now()).is_ok());

    let urls = vec!["https://cdn.example/late.jpg".to_string()];
    let updated = queries::attach_diag_photos(&pool, token, &urls, Utc::now())
        .await
        .expect("Update query failed");
    assert!(!updated);

    let after = queries::get_intervention(&pool, token)
        .await
        .expect("Failed to refetch")
        .expect("Intervention disappeared");
    assert!(after.diag_photos.is_none());

    sqlx::query("DELETE FROM interventions WHERE id = $1")
        .bind(token)
        .execute(&pool)
        .await
        .expect("Failed to clean intervention");
}
