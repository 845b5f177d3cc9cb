//! Typed HTTP client for the return-request API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, multipart};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use returndesk_core::{
    OrderId, PageRequest, ReasonCategory, ReturnReason, StatusCounts, StatusFilter,
};

use super::error::ClientError;
use crate::models::{
    ApiEnvelope, ApiErrorBody, ApproveBody, RejectBody, ReturnListView, ReturnRequestView,
};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The calls a dashboard makes against the return-request API.
#[async_trait]
pub trait ReturnsApi: Send + Sync {
    /// List requests, newest first.
    async fn list(
        &self,
        status: StatusFilter,
        page: PageRequest,
    ) -> Result<ReturnListView, ClientError>;

    /// Requests per status.
    async fn counts(&self) -> Result<StatusCounts, ClientError>;

    /// A single request.
    async fn get(&self, order_id: OrderId) -> Result<ReturnRequestView, ClientError>;

    /// Open a request on a customer's behalf.
    async fn initiate(&self, order_id: OrderId) -> Result<ReturnRequestView, ClientError>;

    /// Approve a pending request.
    async fn approve(
        &self,
        order_id: OrderId,
        body: &ApproveBody,
    ) -> Result<ReturnRequestView, ClientError>;

    /// Reject a pending request.
    async fn reject(
        &self,
        order_id: OrderId,
        body: &RejectBody,
    ) -> Result<ReturnRequestView, ClientError>;

    /// Complete an approved request.
    async fn complete(&self, order_id: OrderId) -> Result<ReturnRequestView, ClientError>;
}

/// Tuning for [`ReturnsClient`].
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Extra attempts for reads after a transient failure.
    pub read_retries: u32,
    /// Delay before the first retry; later retries wait proportionally longer.
    pub retry_backoff: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            read_retries: 2,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

/// An evidence image to upload with a submission.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Return-request API client.
///
/// Reads are retried on transport failures and 5xx responses; writes are
/// sent exactly once.
#[derive(Clone)]
pub struct ReturnsClient {
    client: Client,
    base_url: String,
    token: SecretString,
    options: ClientOptions,
}

impl std::fmt::Debug for ReturnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReturnsClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ReturnsClient {
    /// Create a client with default options.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Request` if `base_url` is not a valid URL or
    /// the HTTP client cannot be built.
    pub fn new(base_url: &str, token: SecretString) -> Result<Self, ClientError> {
        Self::with_options(base_url, token, ClientOptions::default())
    }

    /// Create a client with explicit options.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Request` if `base_url` is not a valid URL or
    /// the HTTP client cannot be built.
    pub fn with_options(
        base_url: &str,
        token: SecretString,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        url::Url::parse(base_url)
            .map_err(|e| ClientError::Request(format!("invalid base URL {base_url}: {e}")))?;

        let client = Client::builder().timeout(options.timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            options,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(self.token.expose_secret())
    }

    /// Decode an envelope, or the error body on a non-2xx status.
    async fn read<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            let envelope: ApiEnvelope<T> = response.json().await?;
            return Ok(envelope.data);
        }

        let text = response.text().await?;
        match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) => Err(ClientError::Api {
                status,
                code: body.error,
                message: body.message,
            }),
            Err(_) => Err(ClientError::Api {
                status,
                code: "internal".to_string(),
                message: if text.is_empty() {
                    status.to_string()
                } else {
                    text
                },
            }),
        }
    }

    /// Send a request once.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        Self::read(response).await
    }

    /// Send a read, retrying transient failures with linear backoff.
    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let mut attempt = 0;
        loop {
            let result = self
                .send(self.request(Method::GET, path).query(query))
                .await;
            match result {
                Err(e) if e.is_transient() && attempt < self.options.read_retries => {
                    attempt += 1;
                    warn!(path, attempt, error = %e, "Retrying read");
                    tokio::time::sleep(self.options.retry_backoff * attempt).await;
                }
                other => return other,
            }
        }
    }

    fn list_query(status: StatusFilter, page: PageRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", page.page().to_string()),
            ("limit", page.limit().to_string()),
        ];
        if let Some(status) = status.as_param() {
            query.push(("status", status.to_string()));
        }
        query
    }

    // =========================================================================
    // Customer calls
    // =========================================================================

    /// The calling customer's requests.
    ///
    /// # Errors
    ///
    /// Returns the server's error, or a transport error after retries.
    #[instrument(skip(self))]
    pub async fn list_mine(
        &self,
        status: StatusFilter,
        page: PageRequest,
    ) -> Result<ReturnListView, ClientError> {
        self.fetch(
            "/orders/my-return-requests",
            &Self::list_query(status, page),
        )
        .await
    }

    /// Submit a return with optional evidence images.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Invalid` without sending anything for a blank
    /// or overlong reason, otherwise the server's error or a transport error.
    #[instrument(skip(self, reason, images), fields(order_id = %order_id, images = images.len()))]
    pub async fn submit(
        &self,
        order_id: OrderId,
        category: ReasonCategory,
        reason: &str,
        images: Vec<ImageUpload>,
    ) -> Result<ReturnRequestView, ClientError> {
        let reason = ReturnReason::parse(reason)?;
        let mut form = multipart::Form::new()
            .text("reasonCategory", category.as_str())
            .text("reason", reason.as_str().to_string());
        for image in images {
            let part = multipart::Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.content_type)?;
            form = form.part("images", part);
        }

        self.send(
            self.request(Method::POST, &format!("/orders/{order_id}/return-request"))
                .multipart(form),
        )
        .await
    }

    /// Withdraw a pending request.
    ///
    /// # Errors
    ///
    /// Returns the server's error or a transport error.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<(), ClientError> {
        self.send(self.request(
            Method::POST,
            &format!("/orders/{order_id}/return-request/cancel"),
        ))
        .await
    }
}

#[async_trait]
impl ReturnsApi for ReturnsClient {
    #[instrument(skip(self))]
    async fn list(
        &self,
        status: StatusFilter,
        page: PageRequest,
    ) -> Result<ReturnListView, ClientError> {
        self.fetch("/orders/return-requests", &Self::list_query(status, page))
            .await
    }

    #[instrument(skip(self))]
    async fn counts(&self) -> Result<StatusCounts, ClientError> {
        self.fetch("/orders/return-requests/counts", &[]).await
    }

    #[instrument(skip(self))]
    async fn get(&self, order_id: OrderId) -> Result<ReturnRequestView, ClientError> {
        self.fetch(&format!("/orders/{order_id}/return-request"), &[])
            .await
    }

    #[instrument(skip(self))]
    async fn initiate(&self, order_id: OrderId) -> Result<ReturnRequestView, ClientError> {
        self.send(self.request(
            Method::POST,
            &format!("/orders/{order_id}/return-request/initiate"),
        ))
        .await
    }

    #[instrument(skip(self, body))]
    async fn approve(
        &self,
        order_id: OrderId,
        body: &ApproveBody,
    ) -> Result<ReturnRequestView, ClientError> {
        debug!(refund_amount = ?body.refund_amount, "Approving return request");
        self.send(
            self.request(
                Method::POST,
                &format!("/orders/{order_id}/return-request/approve"),
            )
            .json(body),
        )
        .await
    }

    #[instrument(skip(self, body))]
    async fn reject(
        &self,
        order_id: OrderId,
        body: &RejectBody,
    ) -> Result<ReturnRequestView, ClientError> {
        self.send(
            self.request(
                Method::POST,
                &format!("/orders/{order_id}/return-request/reject"),
            )
            .json(body),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn complete(&self, order_id: OrderId) -> Result<ReturnRequestView, ClientError> {
        self.send(self.request(
            Method::POST,
            &format!("/orders/{order_id}/return-request/complete"),
        ))
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use returndesk_core::{ReturnError, ReturnStatus};

    #[test]
    fn test_rejects_bad_base_url() {
        let err = ReturnsClient::new("not a url", SecretString::from("t")).unwrap_err();
        assert!(matches!(err, ClientError::Request(_)));
    }

    #[test]
    fn test_list_query() {
        let page = PageRequest::new(Some(2), Some(8)).unwrap();
        let query = ReturnsClient::list_query(StatusFilter::Only(ReturnStatus::Approved), page);
        assert_eq!(
            query,
            vec![
                ("page", "2".to_string()),
                ("limit", "8".to_string()),
                ("status", "approved".to_string()),
            ]
        );
        assert_eq!(
            ReturnsClient::list_query(StatusFilter::All, page).len(),
            2
        );
    }

    #[tokio::test]
    async fn test_submit_checks_reason_before_sending() {
        // Nothing listens on the discard port; reaching the network would
        // surface as ClientError::Request.
        let client =
            ReturnsClient::new("http://127.0.0.1:9", SecretString::from("t")).unwrap();

        let overlong = "x".repeat(ReturnReason::MAX_LENGTH + 1);
        for reason in ["", "   ", overlong.as_str()] {
            let err = client
                .submit(
                    OrderId::new(1001),
                    ReasonCategory::WrongItem,
                    reason,
                    Vec::new(),
                )
                .await
                .unwrap_err();
            assert!(
                matches!(err, ClientError::Invalid(ReturnError::InvalidInput(_))),
                "{err:?}"
            );
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = ReturnsClient::new("http://localhost:3001/", SecretString::from("s3cret"))
            .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("http://localhost:3001"));
    }
}
