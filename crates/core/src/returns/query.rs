//! Listing queries, pagination, and status counts.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::error::ReturnError;
use crate::types::{CustomerId, ReturnStatus};

/// Which statuses a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ReturnStatus),
}

impl StatusFilter {
    #[must_use]
    pub fn matches(self, status: ReturnStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }

    /// Query-string value, or `None` for "all".
    #[must_use]
    pub const fn as_param(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Only(status) => Some(status.as_str()),
        }
    }

    #[must_use]
    pub const fn status(self) -> Option<ReturnStatus> {
        match self {
            Self::All => None,
            Self::Only(status) => Some(status),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param().unwrap_or("all"))
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = ReturnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(Self::All),
            other => other
                .parse::<ReturnStatus>()
                .map(Self::Only)
                .map_err(ReturnError::InvalidInput),
        }
    }
}

impl From<Option<ReturnStatus>> for StatusFilter {
    fn from(status: Option<ReturnStatus>) -> Self {
        status.map_or(Self::All, Self::Only)
    }
}

/// A validated page number and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page request, filling in defaults for missing values.
    ///
    /// # Errors
    ///
    /// Returns `ReturnError::InvalidInput` if `page` is zero or `limit` is
    /// outside `1..=MAX_LIMIT`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, ReturnError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT);

        if page == 0 {
            return Err(ReturnError::InvalidInput(
                "page must be at least 1".to_string(),
            ));
        }
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(ReturnError::InvalidInput(format!(
                "limit must be between 1 and {}",
                Self::MAX_LIMIT
            )));
        }

        Ok(Self { page, limit })
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

/// Everything a listing can be narrowed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReturnQuery {
    pub status: StatusFilter,
    /// Restrict to one customer's requests.
    pub customer: Option<CustomerId>,
    pub page: PageRequest,
}

impl ReturnQuery {
    /// Whether a request with the given owner and status is part of the result.
    #[must_use]
    pub fn includes(&self, customer: CustomerId, status: ReturnStatus) -> bool {
        self.status.matches(status) && self.customer.is_none_or(|c| c == customer)
    }
}

/// Pagination metadata returned with every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    #[must_use]
    pub const fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: total.div_ceil(request.limit as u64),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Slice an already filtered and ordered collection.
    #[must_use]
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = all
            .into_iter()
            .skip(skip)
            .take(request.limit as usize)
            .collect();

        Self {
            items,
            pagination: Pagination::new(request, total),
        }
    }

    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Number of requests per status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub completed: u64,
}

impl StatusCounts {
    pub fn add(&mut self, status: ReturnStatus, n: u64) {
        match status {
            ReturnStatus::Pending => self.pending += n,
            ReturnStatus::Approved => self.approved += n,
            ReturnStatus::Rejected => self.rejected += n,
            ReturnStatus::Completed => self.completed += n,
        }
    }

    #[must_use]
    pub const fn get(&self, status: ReturnStatus) -> u64 {
        match status {
            ReturnStatus::Pending => self.pending,
            ReturnStatus::Approved => self.approved,
            ReturnStatus::Rejected => self.rejected,
            ReturnStatus::Completed => self.completed,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected + self.completed
    }
}

impl FromIterator<ReturnStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = ReturnStatus>>(iter: I) -> Self {
        let mut counts = Self::default();
        for status in iter {
            counts.add(status, 1);
        }
        counts
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_parse() {
        assert_eq!("".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "approved".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(ReturnStatus::Approved)
        );
        assert!(matches!(
            "archived".parse::<StatusFilter>(),
            Err(ReturnError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_page_request_defaults_and_bounds() {
        let req = PageRequest::new(None, None).unwrap();
        assert_eq!((req.page(), req.limit()), (1, 20));

        assert!(PageRequest::new(Some(0), None).is_err());
        assert!(PageRequest::new(None, Some(0)).is_err());
        assert!(PageRequest::new(None, Some(101)).is_err());
        assert!(PageRequest::new(None, Some(100)).is_ok());
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(Some(3), Some(8)).unwrap().offset(), 16);
    }

    #[test]
    fn test_page_slicing() {
        let all: Vec<u32> = (1..=45).collect();

        let second = Page::from_sorted(all.clone(), PageRequest::new(Some(2), Some(20)).unwrap());
        assert_eq!(second.items.first(), Some(&21));
        assert_eq!(second.items.len(), 20);
        assert_eq!(second.pagination.total, 45);
        assert_eq!(second.pagination.pages, 3);

        let last = Page::from_sorted(all.clone(), PageRequest::new(Some(3), Some(20)).unwrap());
        assert_eq!(last.items.len(), 5);

        let beyond = Page::from_sorted(all, PageRequest::new(Some(9), Some(20)).unwrap());
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.pagination.total, 45);
    }

    #[test]
    fn test_empty_listing_has_zero_pages() {
        let page = Page::<u32>::from_sorted(Vec::new(), PageRequest::default());
        assert_eq!(page.pagination.pages, 0);
    }

    #[test]
    fn test_query_includes() {
        let query = ReturnQuery {
            status: StatusFilter::Only(ReturnStatus::Pending),
            customer: Some(CustomerId::new(3)),
            page: PageRequest::default(),
        };
        assert!(query.includes(CustomerId::new(3), ReturnStatus::Pending));
        assert!(!query.includes(CustomerId::new(4), ReturnStatus::Pending));
        assert!(!query.includes(CustomerId::new(3), ReturnStatus::Approved));
    }

    #[test]
    fn test_status_counts() {
        let counts: StatusCounts = [
            ReturnStatus::Pending,
            ReturnStatus::Pending,
            ReturnStatus::Completed,
        ]
        .into_iter()
        .collect();
        assert_eq!(counts.get(ReturnStatus::Pending), 2);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.total(), 3);
    }
}
