//! Pagination types shared by the profile listings

use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Pull the page back into `[1, total_pages(total)]`.
    ///
    /// Listings are non-strict: asking for page 9 of 3 shows page 3.
    pub fn clamp_to(self, total: i64) -> Self {
        let last = total_pages(total, self.per_page);
        Self {
            page: self.page.clamp(1, last),
            per_page: self.per_page,
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Number of pages needed for `total` items, never less than one.
pub fn total_pages(total: i64, per_page: u32) -> u32 {
    let per_page = per_page.max(1) as i64;
    let total = total.max(0);
    let pages = (total + per_page - 1) / per_page;
    pages.clamp(1, u32::MAX as i64) as u32
}

/// Paginated result container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub current_page: u32,
    /// Total number of pages (at least 1)
    pub total_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            current_page: params.page,
            total_page: total_pages(total, params.per_page),
        }
    }

    /// The degraded page shown when a listing query fails
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            current_page: 1,
            total_page: 1,
        }
    }

    /// Convert every item, keeping the page bookkeeping
    pub fn map<U, F>(self, f: F) -> PagedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            current_page: self.current_page,
            total_page: self.total_page,
        }
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 4), 1);
        assert_eq!(total_pages(4, 4), 1);
        assert_eq!(total_pages(5, 4), 2);
        assert_eq!(total_pages(21, 10), 3);
    }

    #[test]
    fn test_clamp_out_of_range_page() {
        let params = ListParams::new(9, 10).clamp_to(25);
        assert_eq!(params.page, 3);
        assert_eq!(params.offset(), 20);

        let params = ListParams::new(5, 4).clamp_to(0);
        assert_eq!(params.page, 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_new_rejects_zero() {
        let params = ListParams::new(0, 0);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 1);
    }

    #[test]
    fn test_empty_is_one_of_one() {
        let page: PagedResult<i32> = PagedResult::empty();
        assert!(page.is_empty());
        assert_eq!(page.current_page, 1);
        assert_eq!(page.total_page, 1);
    }

    #[test]
    fn test_map_keeps_bookkeeping() {
        let params = ListParams::new(2, 2);
        let page = PagedResult::new(vec![3, 4], 5, &params).map(|n| n * 10);
        assert_eq!(page.items, vec![30, 40]);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_page, 3);
    }

    proptest! {
        #[test]
        fn prop_clamped_page_within_bounds(page in 0u32..10_000, per_page in 1u32..50, total in 0i64..100_000) {
            let params = ListParams::new(page, per_page).clamp_to(total);
            let last = total_pages(total, per_page);
            prop_assert!(params.page >= 1);
            prop_assert!(params.page <= last);
            prop_assert!(params.offset() <= total.max(0));
        }
    }
}
