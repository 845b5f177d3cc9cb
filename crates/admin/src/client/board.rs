//! Review board: the client-side view of the return-request queue.
//!
//! The board never edits its list in place. Every action that reaches the
//! server, successful or not, is followed by a fresh fetch of the current
//! page and the status counts, so what it shows is what the server last said.
//! If that reload fails the action's outcome still stands and the notice is
//! downgraded to a warning that the list may be stale.

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use returndesk_core::{
    AdminComment, OrderId, PageRequest, Pagination, ReturnError, StatusCounts, StatusFilter,
};

use super::api::ReturnsApi;
use super::error::ClientError;
use crate::models::{ApproveBody, RejectBody, ReturnListView, ReturnRequestView};

/// Rows per page on the board.
pub const ITEMS_PER_PAGE: u32 = 8;

/// Whether a notice reports success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    /// The action went through but the list could not be reloaded.
    Warning,
    Error,
}

/// Feedback from the last action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Parse a refund amount typed by an admin.
///
/// Blank means "use the order total".
///
/// # Errors
///
/// Returns `ReturnError::InvalidInput` for text that is not a number or is
/// negative.
pub fn parse_refund_amount(input: &str) -> Result<Option<Decimal>, ReturnError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let amount: Decimal = trimmed
        .parse()
        .map_err(|_| ReturnError::InvalidInput(format!("{trimmed} is not a valid amount")))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ReturnError::InvalidInput(
            "refund amount cannot be negative".to_string(),
        ));
    }
    Ok(Some(amount))
}

/// Client-side state of the review queue.
#[derive(Debug)]
pub struct ReturnBoard<A> {
    api: A,
    filter: StatusFilter,
    page: u32,
    requests: Vec<ReturnRequestView>,
    pagination: Option<Pagination>,
    counts: StatusCounts,
    notice: Option<Notice>,
}

impl<A: ReturnsApi> ReturnBoard<A> {
    /// An empty board showing all statuses from page 1.
    pub fn new(api: A) -> Self {
        Self {
            api,
            filter: StatusFilter::All,
            page: 1,
            requests: Vec::new(),
            pagination: None,
            counts: StatusCounts::default(),
            notice: None,
        }
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    pub const fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Requests on the current page.
    pub fn requests(&self) -> &[ReturnRequestView] {
        &self.requests
    }

    pub const fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    pub const fn counts(&self) -> &StatusCounts {
        &self.counts
    }

    pub const fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Last page number, at least 1.
    pub fn last_page(&self) -> u32 {
        self.pagination
            .map_or(1, |p| u32::try_from(p.pages).unwrap_or(u32::MAX).max(1))
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        self.notice = Some(Notice {
            kind: NoticeKind::Error,
            message: err.user_message(),
        });
        err
    }

    /// Fetch the current page and the status counts.
    ///
    /// If the current page no longer exists (the last row on it was decided
    /// away), the board moves to the new last page and fetches that instead.
    ///
    /// # Errors
    ///
    /// Returns the first failing call's error; the board keeps its previous
    /// contents.
    #[instrument(skip(self), fields(filter = %self.filter, page = self.page))]
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let mut list = match self.fetch_page(self.page).await {
            Ok(list) => list,
            Err(e) => return Err(self.fail(e)),
        };
        let last = u32::try_from(list.pagination.pages)
            .unwrap_or(u32::MAX)
            .max(1);
        if self.page > last {
            list = match self.fetch_page(last).await {
                Ok(list) => list,
                Err(e) => return Err(self.fail(e)),
            };
            self.page = last;
        }
        let counts = match self.api.counts().await {
            Ok(counts) => counts,
            Err(e) => return Err(self.fail(e)),
        };

        self.requests = list.return_requests;
        self.pagination = Some(list.pagination);
        self.counts = counts;
        Ok(())
    }

    async fn fetch_page(&self, page: u32) -> Result<ReturnListView, ClientError> {
        let page = PageRequest::new(Some(page), Some(ITEMS_PER_PAGE))?;
        self.api.list(self.filter, page).await
    }

    /// Show only `filter`, starting again from page 1.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Self::refresh`].
    pub async fn set_filter(&mut self, filter: StatusFilter) -> Result<(), ClientError> {
        self.filter = filter;
        self.page = 1;
        self.refresh().await
    }

    /// Move to `page`, clamped to the known range.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Self::refresh`].
    pub async fn go_to_page(&mut self, page: u32) -> Result<(), ClientError> {
        self.page = page.clamp(1, self.last_page());
        self.refresh().await
    }

    /// After a successful action: report it, then reload.
    ///
    /// The action already happened on the server, so a failed reload only
    /// turns the notice into a warning.
    async fn succeeded(&mut self, message: String) {
        info!(%message, "Return board action succeeded");
        match self.refresh().await {
            Ok(()) => {
                self.notice = Some(Notice {
                    kind: NoticeKind::Success,
                    message,
                });
            }
            Err(e) => {
                warn!(error = %e, "Reload after action failed");
                self.notice = Some(Notice {
                    kind: NoticeKind::Warning,
                    message: format!(
                        "{message}; the list may be out of date ({})",
                        e.user_message()
                    ),
                });
            }
        }
    }

    /// After the server refused an action: reload, then report the refusal.
    async fn rejected(&mut self, err: ClientError) -> ClientError {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Reload after failed action failed");
        }
        self.fail(err)
    }

    /// Approve a request. `refund_amount` is the raw text field; blank
    /// refunds the order total.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Invalid` without contacting the server for an
    /// empty comment or a malformed amount, otherwise the server's error.
    /// Once the server has approved, a failed reload is reported as a
    /// warning notice and this still returns `Ok`.
    #[instrument(skip(self, comment))]
    pub async fn approve(
        &mut self,
        order_id: OrderId,
        comment: &str,
        refund_amount: &str,
    ) -> Result<(), ClientError> {
        let checked = AdminComment::parse(comment)
            .and_then(|comment| Ok((comment, parse_refund_amount(refund_amount)?)));
        let (comment, refund_amount) = match checked {
            Ok(checked) => checked,
            Err(e) => return Err(self.fail(e.into())),
        };

        let body = ApproveBody {
            admin_comment: comment.as_str().to_string(),
            refund_amount,
        };
        if let Err(e) = self.api.approve(order_id, &body).await {
            return Err(self.rejected(e).await);
        }
        self.succeeded(format!("Return request for order #{order_id} approved"))
            .await;
        Ok(())
    }

    /// Reject a request.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Invalid` without contacting the server for an
    /// empty comment, otherwise the server's error.
    #[instrument(skip(self, comment))]
    pub async fn reject(&mut self, order_id: OrderId, comment: &str) -> Result<(), ClientError> {
        let comment = match AdminComment::parse(comment) {
            Ok(comment) => comment,
            Err(e) => return Err(self.fail(e.into())),
        };

        let body = RejectBody {
            admin_comment: comment.as_str().to_string(),
        };
        if let Err(e) = self.api.reject(order_id, &body).await {
            return Err(self.rejected(e).await);
        }
        self.succeeded(format!("Return request for order #{order_id} rejected"))
            .await;
        Ok(())
    }

    /// Complete an approved request.
    ///
    /// # Errors
    ///
    /// Returns the server's error.
    #[instrument(skip(self))]
    pub async fn complete(&mut self, order_id: OrderId) -> Result<(), ClientError> {
        if let Err(e) = self.api.complete(order_id).await {
            return Err(self.rejected(e).await);
        }
        self.succeeded(format!("Return request for order #{order_id} completed"))
            .await;
        Ok(())
    }

    /// Open a request for an order on the customer's behalf.
    ///
    /// # Errors
    ///
    /// Returns the server's error.
    #[instrument(skip(self))]
    pub async fn initiate(&mut self, order_id: OrderId) -> Result<(), ClientError> {
        if let Err(e) = self.api.initiate(order_id).await {
            return Err(self.rejected(e).await);
        }
        self.succeeded(format!("Return request for order #{order_id} initiated"))
            .await;
        Ok(())
    }
}
