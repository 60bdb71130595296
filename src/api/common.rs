//! Common API utilities and shared types

use serde::Deserialize;

use crate::models::PagedResult;

/// Largest page size a client may ask for
pub const MAX_PER_PAGE: i64 = 100;

pub fn default_page() -> i64 {
    1
}

pub fn default_per_page() -> i64 {
    20
}

/// Pagination query parameters (`?page=&per_page=`)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationQuery {
    /// Page and page size clamped to sane bounds
    pub fn normalized(self) -> (i64, i64) {
        (self.page.max(1), self.per_page.clamp(1, MAX_PER_PAGE))
    }

    /// Wrap a `(items, total)` pair from a repository
    pub fn into_page<T>(self, (items, total): (Vec<T>, i64)) -> PagedResult<T> {
        let (page, per_page) = self.normalized();
        PagedResult::new(items, total, page, per_page)
    }
}
