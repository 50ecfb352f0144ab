//! This modules defines the common functionality for paging data.

use serde::Serialize;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a client may request.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 50,
            max_page_size: 500,
        }
    }
}

impl PaginationConfig {
    /// Resolve the requested page and page size, falling back to the defaults
    /// and clamping the page size to `max_page_size`.
    pub fn resolve(&self, page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
        let page = page.unwrap_or(self.default_page).max(1);
        let limit = limit
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);

        (page, limit)
    }
}

/// Describes the page of data included in a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// The 1-based page number.
    pub page: u64,
    /// The maximum number of items per page.
    pub limit: u64,
    /// The number of items across all pages.
    pub total: u64,
    /// The number of pages needed to show `total` items.
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1)),
        }
    }

    /// The number of rows to skip to get to the start of the page.
    ///
    /// Saturates at `i64::MAX` for pages far past the end of the data.
    pub fn offset(&self) -> i64 {
        let offset = (self.page.max(1) - 1).saturating_mul(self.limit);

        i64::try_from(offset).unwrap_or(i64::MAX)
    }
}
