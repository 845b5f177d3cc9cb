//! End-to-end tests of the return-request API over HTTP.
//!
//! Each test starts its own server on an ephemeral port; see
//! [`returndesk_integration_tests::TestServer`].

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::StatusCode;
use rust_decimal::Decimal;

use returndesk_admin::client::{ClientError, ImageUpload, ReturnsApi};
use returndesk_admin::models::{ApproveBody, RejectBody};
use returndesk_core::{
    CurrencyCode, Money, PageRequest, ReasonCategory, RefundCap, ReturnError, ReturnStatus,
    StatusFilter,
};
use returndesk_integration_tests::{
    ADMIN_TOKEN, CUSTOMER_TOKEN, DELIVERED, DELIVERED_TOO, PNG, SHIPPED, STRANGER_TOKEN,
    TestServer, VIEWER_TOKEN,
};

fn png(name: &str) -> ImageUpload {
    ImageUpload {
        file_name: name.to_string(),
        content_type: "image/png".to_string(),
        bytes: PNG.to_vec(),
    }
}

fn approve(comment: &str, refund: Option<Decimal>) -> ApproveBody {
    ApproveBody {
        admin_comment: comment.to_string(),
        refund_amount: refund,
    }
}

fn reject(comment: &str) -> RejectBody {
    RejectBody {
        admin_comment: comment.to_string(),
    }
}

fn return_error(err: &ClientError) -> ReturnError {
    err.return_error()
        .unwrap_or_else(|| panic!("expected a return error, got {err:?}"))
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_full_lifecycle_records_one_refund() {
    let server = TestServer::start().await;
    let customer = server.client(CUSTOMER_TOKEN);
    let admin = server.client(ADMIN_TOKEN);

    let submitted = customer
        .submit(
            DELIVERED,
            ReasonCategory::DamagedItem,
            "Box arrived crushed",
            vec![png("front.png")],
        )
        .await
        .unwrap();
    assert_eq!(
        submitted.return_request.request_status,
        ReturnStatus::Pending
    );
    assert_eq!(submitted.image_urls.len(), 1);

    // Uploaded evidence is served back
    let image = reqwest::get(&submitted.image_urls[0]).await.unwrap();
    assert_eq!(image.status(), StatusCode::OK);
    assert_eq!(image.bytes().await.unwrap().as_ref(), PNG);

    let counts = admin.counts().await.unwrap();
    assert_eq!(counts.pending, 1);

    let approved = admin
        .approve(
            DELIVERED,
            &approve("Refunding half", Some(Decimal::new(500, 0))),
        )
        .await
        .unwrap();
    assert_eq!(approved.return_request.request_status, ReturnStatus::Approved);
    assert_eq!(
        approved.return_request.refund_amount,
        Some(Decimal::new(500, 0))
    );

    let seen = customer.get(DELIVERED).await.unwrap();
    assert_eq!(seen.return_request.request_status, ReturnStatus::Approved);
    assert_eq!(
        seen.return_request.admin_comment.as_deref(),
        Some("Refunding half")
    );

    let completed = admin.complete(DELIVERED).await.unwrap();
    assert_eq!(
        completed.return_request.request_status,
        ReturnStatus::Completed
    );
    assert!(completed.return_request.completed_at.is_some());

    // Completing again is a no-op
    let again = admin.complete(DELIVERED).await.unwrap();
    assert_eq!(
        again.return_request.completed_at,
        completed.return_request.completed_at
    );

    let refunds = server.store().refunds().await;
    assert_eq!(refunds.len(), 1);
    assert_eq!(
        refunds[0].amount,
        Money::new(Decimal::new(500, 0), CurrencyCode::INR)
    );
}

#[tokio::test]
async fn test_approve_without_amount_refunds_order_total() {
    let server = TestServer::start().await;
    let admin = server.client(ADMIN_TOKEN);

    server
        .client(CUSTOMER_TOKEN)
        .submit(DELIVERED, ReasonCategory::WrongItem, "Wrong colour", vec![])
        .await
        .unwrap();

    let approved = admin
        .approve(DELIVERED, &approve("Full refund", None))
        .await
        .unwrap();
    assert_eq!(
        approved.return_request.refund_amount,
        Some(approved.total_amount)
    );
}

#[tokio::test]
async fn test_admin_initiated_request_is_completed_by_customer() {
    let server = TestServer::start().await;
    let admin = server.client(ADMIN_TOKEN);
    let customer = server.client(CUSTOMER_TOKEN);

    let opened = admin.initiate(DELIVERED).await.unwrap();
    assert_eq!(opened.return_request.request_status, ReturnStatus::Pending);
    assert!(opened.return_request.reason.is_none());

    let filled = customer
        .submit(
            DELIVERED,
            ReasonCategory::SizeIssue,
            "Too small",
            vec![png("tag.png")],
        )
        .await
        .unwrap();
    assert_eq!(filled.return_request.requested_at, opened.return_request.requested_at);
    assert_eq!(filled.return_request.reason.as_deref(), Some("Too small"));

    // A second submission conflicts now that details exist
    let err = customer
        .submit(DELIVERED, ReasonCategory::SizeIssue, "Again", vec![])
        .await
        .unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::Conflict(_)));
}

#[tokio::test]
async fn test_cancel_then_resubmit() {
    let server = TestServer::start().await;
    let customer = server.client(CUSTOMER_TOKEN);

    customer
        .submit(DELIVERED, ReasonCategory::ChangedMind, "Not needed", vec![])
        .await
        .unwrap();
    customer.cancel(DELIVERED).await.unwrap();

    let err = customer.get(DELIVERED).await.unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::NotFound(_)));

    let again = customer
        .submit(DELIVERED, ReasonCategory::QualityIssue, "Stitching came loose", vec![])
        .await
        .unwrap();
    assert_eq!(again.return_request.request_status, ReturnStatus::Pending);
}

#[tokio::test]
async fn test_rejected_request_cannot_be_resubmitted_or_completed() {
    let server = TestServer::start().await;
    let customer = server.client(CUSTOMER_TOKEN);
    let admin = server.client(ADMIN_TOKEN);

    customer
        .submit(DELIVERED, ReasonCategory::NotAsDescribed, "Different fabric", vec![])
        .await
        .unwrap();
    admin
        .reject(DELIVERED, &reject("Outside the return window"))
        .await
        .unwrap();

    let err = customer
        .submit(DELIVERED, ReasonCategory::Other, "Please reconsider", vec![])
        .await
        .unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::Conflict(_)));

    let err = admin.complete(DELIVERED).await.unwrap_err();
    assert!(matches!(
        return_error(&err),
        ReturnError::PreconditionFailed(_)
    ));

    let err = customer.cancel(DELIVERED).await.unwrap_err();
    assert!(matches!(
        return_error(&err),
        ReturnError::PreconditionFailed(_)
    ));
    assert!(server.store().refunds().await.is_empty());
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_submit_requires_delivered_order() {
    let server = TestServer::start().await;

    let err = server
        .client(CUSTOMER_TOKEN)
        .submit(SHIPPED, ReasonCategory::DamagedItem, "Dented", vec![])
        .await
        .unwrap_err();
    assert!(matches!(
        return_error(&err),
        ReturnError::PreconditionFailed(_)
    ));
}

#[tokio::test]
async fn test_submit_rejects_blank_reason_and_extra_images() {
    let server = TestServer::start().await;
    let customer = server.client(CUSTOMER_TOKEN);

    // Blank reasons are caught by the client before sending
    let err = customer
        .submit(DELIVERED, ReasonCategory::DamagedItem, "   ", vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Invalid(ReturnError::InvalidInput(_))));

    let err = customer
        .submit(
            DELIVERED,
            ReasonCategory::DamagedItem,
            "Cracked",
            vec![png("a.png"), png("b.png"), png("c.png")],
        )
        .await
        .unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::InvalidInput(_)));

    let err = customer
        .submit(
            DELIVERED,
            ReasonCategory::DamagedItem,
            "Cracked",
            vec![ImageUpload {
                file_name: "notes.txt".to_string(),
                content_type: "image/png".to_string(),
                bytes: b"not an image".to_vec(),
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::InvalidInput(_)));

    // Nothing was stored by the failed attempts
    let err = customer.get(DELIVERED).await.unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::NotFound(_)));
}

#[tokio::test]
async fn test_refund_cap_limits_approval() {
    let server = TestServer::start_with(RefundCap::OrderTotal).await;
    let admin = server.client(ADMIN_TOKEN);

    server
        .client(CUSTOMER_TOKEN)
        .submit(DELIVERED, ReasonCategory::DamagedItem, "Shattered", vec![])
        .await
        .unwrap();

    let err = admin
        .approve(DELIVERED, &approve("Too generous", Some(Decimal::new(1000, 0))))
        .await
        .unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::InvalidInput(_)));

    let err = admin
        .approve(DELIVERED, &approve("Negative", Some(Decimal::new(-1, 0))))
        .await
        .unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::InvalidInput(_)));

    let err = admin
        .approve(DELIVERED, &approve("  ", None))
        .await
        .unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::InvalidInput(_)));

    let view = admin.get(DELIVERED).await.unwrap();
    assert_eq!(view.return_request.request_status, ReturnStatus::Pending);
}

// ============================================================================
// Access control
// ============================================================================

#[tokio::test]
async fn test_missing_or_unknown_token_is_unauthenticated() {
    let server = TestServer::start().await;

    let err = server.client("no-such-token").counts().await.unwrap_err();
    match err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(code, "unauthenticated");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_customers_only_see_their_own_requests() {
    let server = TestServer::start().await;

    server
        .client(CUSTOMER_TOKEN)
        .submit(DELIVERED, ReasonCategory::DamagedItem, "Torn", vec![])
        .await
        .unwrap();

    let stranger = server.client(STRANGER_TOKEN);
    let err = stranger.get(DELIVERED).await.unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::Unauthorized(_)));

    let err = stranger.cancel(DELIVERED).await.unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::Unauthorized(_)));

    let mine = stranger
        .list_mine(StatusFilter::All, PageRequest::default())
        .await
        .unwrap();
    assert!(mine.return_requests.is_empty());

    // Customers cannot use admin endpoints
    let err = server.client(CUSTOMER_TOKEN).counts().await.unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::Unauthorized(_)));
}

#[tokio::test]
async fn test_viewer_reads_but_cannot_decide() {
    let server = TestServer::start().await;
    let viewer = server.client(VIEWER_TOKEN);

    server
        .client(CUSTOMER_TOKEN)
        .submit(DELIVERED, ReasonCategory::DamagedItem, "Scratched", vec![])
        .await
        .unwrap();

    let listed = viewer
        .list(StatusFilter::Only(ReturnStatus::Pending), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.return_requests.len(), 1);

    let err = viewer
        .approve(DELIVERED, &approve("ok", None))
        .await
        .unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::Unauthorized(_)));

    let err = viewer.initiate(DELIVERED_TOO).await.unwrap_err();
    assert!(matches!(return_error(&err), ReturnError::Unauthorized(_)));
}

// ============================================================================
// Listing and concurrency
// ============================================================================

#[tokio::test]
async fn test_listing_filters_and_pages() {
    let server = TestServer::start().await;
    let customer = server.client(CUSTOMER_TOKEN);
    let admin = server.client(ADMIN_TOKEN);

    customer
        .submit(DELIVERED, ReasonCategory::DamagedItem, "First", vec![])
        .await
        .unwrap();
    customer
        .submit(DELIVERED_TOO, ReasonCategory::WrongItem, "Second", vec![])
        .await
        .unwrap();
    admin
        .reject(DELIVERED, &reject("Used item"))
        .await
        .unwrap();

    let page = PageRequest::new(Some(1), Some(1)).unwrap();
    let first = admin.list(StatusFilter::All, page).await.unwrap();
    assert_eq!(first.pagination.total, 2);
    assert_eq!(first.pagination.pages, 2);
    assert_eq!(first.return_requests.len(), 1);
    // Newest first
    assert_eq!(first.return_requests[0].order_id, DELIVERED_TOO);

    let rejected = customer
        .list_mine(
            StatusFilter::Only(ReturnStatus::Rejected),
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(rejected.return_requests.len(), 1);
    assert_eq!(rejected.return_requests[0].order_id, DELIVERED);

    let counts = admin.counts().await.unwrap();
    assert_eq!((counts.pending, counts.rejected), (1, 1));
}

#[tokio::test]
async fn test_concurrent_decisions_have_one_winner() {
    let server = TestServer::start().await;
    let admin = server.client(ADMIN_TOKEN);

    server
        .client(CUSTOMER_TOKEN)
        .submit(DELIVERED, ReasonCategory::DamagedItem, "Leaking", vec![])
        .await
        .unwrap();

    let approve_body = approve("Approved", None);
    let reject_body = reject("Rejected");
    let (approved, rejected) = tokio::join!(
        admin.approve(DELIVERED, &approve_body),
        admin.reject(DELIVERED, &reject_body),
    );

    assert!(approved.is_ok() != rejected.is_ok());
    let loser = approved.err().or(rejected.err()).unwrap();
    assert!(matches!(
        return_error(&loser),
        ReturnError::PreconditionFailed(_)
    ));
}

// ============================================================================
// PostgreSQL
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_postgres_store_round_trip() {
    use std::sync::Arc;

    use returndesk_admin::config::ReturnsConfig;
    use returndesk_admin::db::{self, ApiTokenRepository, PgPrincipalStore, PgReturnStore};
    use returndesk_admin::routes;
    use returndesk_admin::services::tokens::IssuedToken;
    use returndesk_admin::state::AppState;
    use returndesk_core::{CustomerId, OrderId};
    use secrecy::SecretString;

    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL");
    let pool = db::create_pool(&SecretString::from(url)).await.unwrap();
    sqlx::migrate!("../admin/migrations").run(&pool).await.unwrap();

    let suffix = std::process::id();
    let customer_id: i32 = sqlx::query_scalar(
        "INSERT INTO admin.customer (email, name) VALUES ($1, 'Test Customer') RETURNING id",
    )
    .bind(format!("returns-{suffix}@example.com"))
    .fetch_one(&pool)
    .await
    .unwrap();
    let order_id: i32 = sqlx::query_scalar(
        "INSERT INTO admin.customer_order (customer_id, total_amount, status)
         VALUES ($1, 250.00, 'delivered') RETURNING id",
    )
    .bind(customer_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    let admin_id: i32 = sqlx::query_scalar(
        "INSERT INTO admin.admin_user (email, name, role) VALUES ($1, 'Test Admin', 'admin') RETURNING id",
    )
    .bind(format!("admin-{suffix}@example.com"))
    .fetch_one(&pool)
    .await
    .unwrap();

    let tokens = ApiTokenRepository::new(&pool);
    let customer_token = IssuedToken::generate();
    tokens
        .create(
            &customer_token.hash,
            "test",
            db::api_tokens::TokenOwner::Customer(CustomerId::new(customer_id)),
        )
        .await
        .unwrap();
    let admin_token = IssuedToken::generate();
    tokens
        .create(
            &admin_token.hash,
            "test",
            db::api_tokens::TokenOwner::Admin(returndesk_core::AdminUserId::new(admin_id)),
        )
        .await
        .unwrap();

    let uploads = tempfile::tempdir().unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = PgReturnStore::new(pool.clone());
    let state = AppState::new(
        ReturnsConfig::new(uploads.path(), format!("http://{addr}")),
        Arc::new(store.clone()),
        Arc::new(PgPrincipalStore::new(pool)),
    );
    tokio::spawn(async move {
        axum::serve(listener, routes::app(state)).await.unwrap();
    });

    let base = format!("http://{addr}");
    let customer = returndesk_admin::client::ReturnsClient::new(
        &base,
        SecretString::from(customer_token.token),
    )
    .unwrap();
    let admin =
        returndesk_admin::client::ReturnsClient::new(&base, SecretString::from(admin_token.token))
            .unwrap();
    let order = OrderId::new(order_id);

    customer
        .submit(order, ReasonCategory::DamagedItem, "Cracked lid", vec![png("lid.png")])
        .await
        .unwrap();
    admin.approve(order, &approve("ok", None)).await.unwrap();
    admin.complete(order).await.unwrap();
    admin.complete(order).await.unwrap();

    let refunds = store.refunds_for(order).await.unwrap();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount.amount, Decimal::new(25000, 2));
}
