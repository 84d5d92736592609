//! Shared page/limit pagination helpers.
//!
//! The read API contract is offset pagination: requests carry `page` and
//! `limit`, responses carry `{items, pagination: {page, limit, total,
//! has_more}}`. Bounds are validated before any storage is touched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("page must be at least 1, got {0}")]
    PageOutOfRange(u32),
    #[error("limit must be between 1 and {MAX_PAGE_LIMIT}, got {0}")]
    LimitOutOfRange(u32),
}

/// Validated pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    page: u32,
    limit: u32,
}

impl PageParams {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, PaginationError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if page < 1 {
            return Err(PaginationError::PageOutOfRange(page));
        }
        if limit < 1 || limit > MAX_PAGE_LIMIT {
            return Err(PaginationError::LimitOutOfRange(limit));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Row offset of the first item on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Pagination envelope returned alongside every listed result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(params: PageParams, total: u64) -> Self {
        let consumed = u64::from(params.page) * u64::from(params.limit);
        Self {
            page: params.page,
            limit: params.limit,
            total,
            has_more: consumed < total,
        }
    }
}

/// A page of items with its pagination envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, params: PageParams, total: u64) -> Self {
        Self {
            items,
            pagination: Pagination::new(params, total),
        }
    }

    pub fn empty(params: PageParams) -> Self {
        Self::new(Vec::new(), params, 0)
    }
}
