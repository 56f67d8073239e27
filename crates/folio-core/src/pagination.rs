//! Page-number pagination over already-sorted result sets.

use crate::error::ValidationError;

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 10;
/// Largest page size a client may request.
pub const MAX_LIMIT: u32 = 100;

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Items per page, `1..=MAX_LIMIT`.
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Build a page request from optional query parameters.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, ValidationError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if page == 0 {
            return Err(ValidationError::InvalidPagination(
                "page starts at 1".to_string(),
            ));
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(ValidationError::InvalidPagination(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        Ok(Self { page, limit })
    }

    /// Take this page out of `items`, returning the page and the total count.
    pub fn slice<T>(&self, items: Vec<T>) -> (Vec<T>, usize) {
        let total = items.len();
        let offset = (self.page as usize - 1).saturating_mul(self.limit as usize);
        let page = items
            .into_iter()
            .skip(offset)
            .take(self.limit as usize)
            .collect();
        (page, total)
    }

    /// Number of pages needed for `total` items.
    pub fn total_pages(&self, total: usize) -> u32 {
        let pages = total.div_ceil(self.limit as usize);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let req = PageRequest::new(None, None).unwrap();
        assert_eq!(req, PageRequest::default());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(PageRequest::new(Some(0), None).is_err());
        assert!(PageRequest::new(None, Some(0)).is_err());
        assert!(PageRequest::new(None, Some(MAX_LIMIT + 1)).is_err());
        assert!(PageRequest::new(None, Some(MAX_LIMIT)).is_ok());
    }

    #[test]
    fn slices_middle_page() {
        let req = PageRequest::new(Some(2), Some(3)).unwrap();
        let (items, total) = req.slice((1..=8).collect::<Vec<_>>());
        assert_eq!(items, vec![4, 5, 6]);
        assert_eq!(total, 8);
        assert_eq!(req.total_pages(total), 3);
    }

    #[test]
    fn page_past_end_is_empty() {
        let req = PageRequest::new(Some(5), Some(10)).unwrap();
        let (items, total) = req.slice(vec![1, 2, 3]);
        assert!(items.is_empty());
        assert_eq!(total, 3);
    }

    #[test]
    fn zero_items_zero_pages() {
        assert_eq!(PageRequest::default().total_pages(0), 0);
    }
}
