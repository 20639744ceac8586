//! Pagination query parameters shared by the log listing endpoints

use audit_engine::{PageRequest, DEFAULT_PAGE_SIZE};
use serde::Deserialize;

/// `?page=&size=` with a zero-based page index
#[derive(Debug, Default, Deserialize, Clone, Copy)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PaginationParams {
    /// Page request using `default_size` when no size was given.
    /// Sizes are clamped to the store's limits.
    pub fn page_request(self, default_size: u32) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(0), self.size.unwrap_or(default_size))
    }
}

impl From<PaginationParams> for PageRequest {
    fn from(params: PaginationParams) -> Self {
        params.page_request(DEFAULT_PAGE_SIZE)
    }
}
