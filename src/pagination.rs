//! This modules defines the common functionality for paging data.

use serde::{Deserialize, Serialize};

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a request may ask for.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// A validated request for one page of items.
///
/// Both the page number and the page size are at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl PageRequest {
    /// Build a page request from optional client values.
    ///
    /// Missing or zero values fall back to the defaults in `config`, and the
    /// page size is capped at `config.max_page_size`.
    pub fn new(page: Option<u64>, page_size: Option<u64>, config: &PaginationConfig) -> Self {
        let page = page
            .filter(|page| *page > 0)
            .unwrap_or(config.default_page)
            .max(1);
        let page_size = page_size
            .filter(|page_size| *page_size > 0)
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size.max(1));

        Self { page, page_size }
    }

    /// The page number, starting from one.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// The maximum number of items on the page.
    pub fn limit(&self) -> u64 {
        self.page_size
    }

    /// The number of items before this page, capped at the largest offset
    /// SQLite accepts. Any page that far out is past the last item.
    pub fn offset(&self) -> i64 {
        i64::try_from((self.page - 1).saturating_mul(self.page_size)).unwrap_or(i64::MAX)
    }
}

/// Describes where a page sits among all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// The current page number, starting from one.
    pub page: u64,
    /// The page size used.
    pub limit: u64,
    /// The number of items across all pages.
    pub total: u64,
    /// The number of pages, zero when there are no items.
    pub pages: u64,
}

impl PaginationMeta {
    /// Describe the page `request` within `total` items.
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page(),
            limit: request.limit(),
            total,
            pages: total.div_ceil(request.limit()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PageRequest, PaginationConfig, PaginationMeta};

    #[test]
    fn uses_defaults_when_missing() {
        let request = PageRequest::new(None, None, &PaginationConfig::default());

        assert_eq!(request.page(), 1);
        assert_eq!(request.limit(), 10);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn zero_falls_back_to_defaults() {
        let request = PageRequest::new(Some(0), Some(0), &PaginationConfig::default());

        assert_eq!(request.page(), 1);
        assert_eq!(request.limit(), 10);
    }

    #[test]
    fn page_size_is_capped() {
        let request = PageRequest::new(Some(2), Some(1000), &PaginationConfig::default());

        assert_eq!(request.limit(), 100);
        assert_eq!(request.offset(), 100);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let request = PageRequest::new(Some(3), Some(20), &PaginationConfig::default());

        assert_eq!(request.offset(), 40);
    }

    #[test]
    fn offset_of_huge_page_is_capped() {
        let request = PageRequest::new(Some(u64::MAX), Some(10), &PaginationConfig::default());

        assert_eq!(request.page(), u64::MAX);
        assert_eq!(request.offset(), i64::MAX);
    }

    #[test]
    fn pages_rounds_up() {
        let request = PageRequest::new(Some(1), Some(10), &PaginationConfig::default());

        assert_eq!(PaginationMeta::new(request, 0).pages, 0);
        assert_eq!(PaginationMeta::new(request, 10).pages, 1);
        assert_eq!(PaginationMeta::new(request, 11).pages, 2);
    }
}
