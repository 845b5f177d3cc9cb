//! Integration tests for Return Desk.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process server over an in-memory store
//! cargo test -p returndesk-integration-tests
//!
//! # Against PostgreSQL as well
//! TEST_DATABASE_URL=postgres://... cargo test -p returndesk-integration-tests -- --ignored
//! ```
//!
//! [`TestServer`] binds the real router to an ephemeral port so tests talk
//! to it over HTTP through [`ReturnsClient`], exactly as the CLI does.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;
use tempfile::TempDir;

use returndesk_admin::client::ReturnsClient;
use returndesk_admin::config::ReturnsConfig;
use returndesk_admin::db::MemoryStore;
use returndesk_admin::models::{CurrentAdmin, CurrentCustomer, CustomerSummary, Principal};
use returndesk_admin::routes;
use returndesk_admin::state::AppState;
use returndesk_core::{
    AdminRole, AdminUserId, CurrencyCode, CustomerId, Money, OrderId, OrderSnapshot, OrderStatus,
    RefundCap,
};

/// Bearer token of the seeded admin.
pub const ADMIN_TOKEN: &str = "admin-token";
/// Bearer token of the seeded read-only admin.
pub const VIEWER_TOKEN: &str = "viewer-token";
/// Bearer token of the customer who owns the seeded orders.
pub const CUSTOMER_TOKEN: &str = "customer-token";
/// Bearer token of a customer with no orders.
pub const STRANGER_TOKEN: &str = "stranger-token";

/// Delivered order of 999.00 INR.
pub const DELIVERED: OrderId = OrderId::new(1001);
/// Second delivered order, used for listings.
pub const DELIVERED_TOO: OrderId = OrderId::new(1002);
/// Order that has only shipped.
pub const SHIPPED: OrderId = OrderId::new(1003);

/// Valid PNG header; enough to pass content sniffing.
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// An API server running on a background task.
pub struct TestServer {
    addr: SocketAddr,
    store: Arc<MemoryStore>,
    _uploads: TempDir,
}

impl TestServer {
    /// Start a server with no refund cap.
    pub async fn start() -> Self {
        Self::start_with(RefundCap::Unbounded).await
    }

    /// Start a server with the given refund cap.
    pub async fn start_with(refund_cap: RefundCap) -> Self {
        let uploads = tempfile::tempdir().expect("create upload dir");
        let store = Arc::new(seeded_store());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");

        let mut config = ReturnsConfig::new(uploads.path(), format!("http://{addr}"));
        config.refund_cap = refund_cap;
        config.max_images = 2;

        let app = routes::app(AppState::new(config, store.clone(), store.clone()));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });

        Self {
            addr,
            store,
            _uploads: uploads,
        }
    }

    /// Base URL of the running server.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client authenticated with `token`.
    #[must_use]
    pub fn client(&self, token: &str) -> ReturnsClient {
        ReturnsClient::new(&self.base_url(), SecretString::from(token.to_string()))
            .expect("build client")
    }

    /// The backing store, for inspecting recorded refunds.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

fn order(id: OrderId, total: i64, status: OrderStatus) -> OrderSnapshot {
    OrderSnapshot {
        id,
        customer_id: CustomerId::new(7),
        total: Money::new(Decimal::new(total, 0), CurrencyCode::INR),
        status,
    }
}

fn seeded_store() -> MemoryStore {
    MemoryStore::new()
        .with_customer(CustomerSummary {
            id: CustomerId::new(7),
            name: "Ravi Kumar".to_string(),
            email: "ravi@example.com".to_string(),
        })
        .with_order(order(DELIVERED, 999, OrderStatus::Delivered))
        .with_order(order(DELIVERED_TOO, 450, OrderStatus::Delivered))
        .with_order(order(SHIPPED, 300, OrderStatus::Shipped))
        .with_token(
            ADMIN_TOKEN,
            Principal::Admin(CurrentAdmin {
                id: AdminUserId::new(1),
                name: "Asha".to_string(),
                role: AdminRole::Admin,
            }),
        )
        .with_token(
            VIEWER_TOKEN,
            Principal::Admin(CurrentAdmin {
                id: AdminUserId::new(2),
                name: "Vik".to_string(),
                role: AdminRole::Viewer,
            }),
        )
        .with_token(
            CUSTOMER_TOKEN,
            Principal::Customer(CurrentCustomer {
                id: CustomerId::new(7),
            }),
        )
        .with_token(
            STRANGER_TOKEN,
            Principal::Customer(CurrentCustomer {
                id: CustomerId::new(8),
            }),
        )
}
