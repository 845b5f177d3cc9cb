//! Review-queue commands, run against the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! rd-cli returns list --status pending --page 2
//! rd-cli returns show 1001
//! rd-cli returns approve 1001 --comment "Inspected, refunding" --refund 499.00
//! rd-cli returns reject 1001 --comment "Outside return window"
//! rd-cli returns complete 1001
//! rd-cli returns initiate 1001
//! ```
//!
//! # Environment Variables
//!
//! - `RD_API_URL` - Base URL of the admin API (default `http://127.0.0.1:3001`)
//! - `RD_API_TOKEN` - Admin bearer token

use returndesk_admin::client::{ClientError, NoticeKind, ReturnBoard, ReturnsApi, ReturnsClient};
use returndesk_admin::models::ReturnRequestView;
use returndesk_core::{OrderId, StatusFilter};
use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_API_URL: &str = "http://127.0.0.1:3001";

/// Errors that can occur during review commands.
#[derive(Debug, Error)]
pub enum ReturnsError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// The API call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// What to do on the board.
#[derive(Debug, Clone)]
pub enum Action {
    List { status: StatusFilter, page: u32 },
    Counts,
    Show(OrderId),
    Initiate(OrderId),
    Approve {
        order_id: OrderId,
        comment: String,
        refund: String,
    },
    Reject { order_id: OrderId, comment: String },
    Complete(OrderId),
}

fn client() -> Result<ReturnsClient, ReturnsError> {
    dotenvy::dotenv().ok();

    let base_url = std::env::var("RD_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
    let token = std::env::var("RD_API_TOKEN")
        .map(SecretString::from)
        .map_err(|_| ReturnsError::MissingEnvVar("RD_API_TOKEN"))?;

    Ok(ReturnsClient::new(&base_url, token)?)
}

fn log_row(view: &ReturnRequestView) {
    let record = &view.return_request;
    let customer = view
        .customer
        .as_ref()
        .map_or_else(|| record.customer_id.to_string(), |c| c.email.clone());
    tracing::info!(
        "#{:<8} {:<10} {:<18} {:>12} {:<28} {}",
        view.order_id,
        record.request_status.to_string(),
        record
            .reason_category
            .map_or_else(|| "-".to_owned(), |c| c.to_string()),
        view.order_total().to_string(),
        customer,
        record.requested_at.format("%Y-%m-%d %H:%M")
    );
}

fn log_detail(view: &ReturnRequestView) {
    log_row(view);
    let record = &view.return_request;
    if let Some(reason) = &record.reason {
        tracing::info!("  reason:   {reason}");
    }
    if let Some(comment) = &record.admin_comment {
        tracing::info!("  comment:  {comment}");
    }
    if let Some(refund) = record.refund_amount {
        tracing::info!("  refund:   {refund} {}", record.currency.code());
    }
    for url in &view.image_urls {
        tracing::info!("  image:    {url}");
    }
}

/// Run one review action and log the result.
///
/// # Errors
///
/// Returns an error if the token is missing or the API call fails.
pub async fn run(action: Action) -> Result<(), ReturnsError> {
    let client = client()?;

    if let Action::Show(order_id) = action {
        log_detail(&client.get(order_id).await?);
        return Ok(());
    }

    let mut board = ReturnBoard::new(client);
    match action {
        Action::List { status, page } => {
            board.set_filter(status).await?;
            if page > 1 {
                board.go_to_page(page).await?;
            }
            for view in board.requests() {
                log_row(view);
            }
            tracing::info!("page {} of {}", board.page(), board.last_page());
        }
        Action::Counts => {
            board.refresh().await?;
            let counts = board.counts();
            tracing::info!(
                "pending {}  approved {}  rejected {}  completed {}  total {}",
                counts.pending,
                counts.approved,
                counts.rejected,
                counts.completed,
                counts.total()
            );
        }
        Action::Initiate(order_id) => board.initiate(order_id).await?,
        Action::Approve {
            order_id,
            comment,
            refund,
        } => board.approve(order_id, &comment, &refund).await?,
        Action::Reject { order_id, comment } => board.reject(order_id, &comment).await?,
        Action::Complete(order_id) => board.complete(order_id).await?,
        Action::Show(_) => {}
    }

    if let Some(notice) = board.notice() {
        match notice.kind {
            NoticeKind::Warning => tracing::warn!("{}", notice.message),
            _ => tracing::info!("{}", notice.message),
        }
    }
    Ok(())
}
