//! Offset pagination shared by every list endpoint

/// A requested page, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number, starting at 1
    pub page: usize,

    /// Items per page
    pub page_size: usize,
}

impl PageRequest {
    /// Create a page request
    ///
    /// # Errors
    /// Returns error if `page` or `page_size` is zero
    pub fn new(page: usize, page_size: usize) -> Result<Self, String> {
        if page == 0 {
            return Err("Page numbers start at 1".to_string());
        }
        if page_size == 0 {
            return Err("Page size must be positive".to_string());
        }
        Ok(Self { page, page_size })
    }

    /// Number of items skipped before this page
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of results plus navigation flags
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,

    /// Total items across all pages
    pub total: usize,

    /// Page number, starting at 1
    pub page: usize,

    /// Items per page
    pub page_size: usize,

    /// Another page follows
    pub has_next: bool,

    /// A page precedes this one
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Cut a page out of the full, already ordered result set
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_domain::{Page, PageRequest};
    ///
    /// let page = Page::slice((1..=25).collect(), PageRequest::new(2, 10).unwrap());
    /// assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
    /// assert!(page.has_next && page.has_prev);
    /// ```
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.page_size)
            .collect();
        Self::from_parts(items, total, request)
    }

    /// Wrap a page that was already cut, given the overall total
    pub fn from_parts(items: Vec<T>, total: usize, request: PageRequest) -> Self {
        let end = request.offset().saturating_add(request.page_size);
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
            has_next: end < total,
            has_prev: request.page > 1,
        }
    }

    /// Number of pages needed for `total`
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size)
    }

    /// Transform the items, keeping the navigation data
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_validation() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert_eq!(PageRequest::new(3, 10).unwrap().offset(), 20);
    }

    #[test]
    fn test_first_and_last_pages() {
        let first = Page::slice((0..25).collect::<Vec<_>>(), PageRequest::new(1, 10).unwrap());
        assert!(first.has_next);
        assert!(!first.has_prev);
        assert_eq!(first.total_pages(), 3);

        let last = Page::slice((0..25).collect::<Vec<_>>(), PageRequest::new(3, 10).unwrap());
        assert_eq!(last.items, vec![20, 21, 22, 23, 24]);
        assert!(!last.has_next);
        assert!(last.has_prev);
    }

    #[test]
    fn test_exact_fit_has_no_next() {
        let page = Page::slice((0..20).collect::<Vec<_>>(), PageRequest::new(2, 10).unwrap());
        assert_eq!(page.items.len(), 10);
        assert!(!page.has_next);
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let page = Page::slice(vec![1, 2, 3], PageRequest::new(5, 10).unwrap());
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn test_map_keeps_flags() {
        let page = Page::slice(vec![1, 2, 3], PageRequest::new(1, 2).unwrap()).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert!(page.has_next);
    }
}
