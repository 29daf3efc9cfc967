use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;

/// Query parameters accepted by every paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageParams {
    /// 1-based page number, floored at 1.
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to 1..=100.
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(limit);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_params_missing() {
        let params = PageParams { page: None, limit: None };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 10);
    }

    #[test]
    fn limit_is_clamped() {
        let params = PageParams { page: Some(0), limit: Some(5000) };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 100);

        let params = PageParams { page: Some(3), limit: Some(0) };
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn meta_reports_navigation_flags() {
        let meta = PageMeta::new(2, 10, 35);
        assert_eq!(meta.total_pages, 4);
        assert!(meta.has_next);
        assert!(meta.has_prev);

        let last = PageMeta::new(4, 10, 35);
        assert!(!last.has_next);

        let empty = PageMeta::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }
}
