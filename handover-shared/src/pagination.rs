//! Offset pagination shared by stores and query views
//!
//! Pages are zero-based. A page carries its items plus enough metadata for a
//! client to render pagers without a second request.
//!
//! # Example
//!
//! ```
//! use handover_shared::pagination::{Page, PageRequest};
//!
//! let request = PageRequest::new(1, 5);
//! let page = Page::new(vec!["f", "g", "h", "i", "j"], request, 12);
//!
//! assert_eq!(page.total_pages, 3);
//! assert!(!page.first);
//! assert!(!page.last);
//! ```

use serde::{Deserialize, Serialize};

/// Page number and size requested by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page index
    pub page: u32,

    /// Page size, always at least 1
    pub size: u32,
}

impl PageRequest {
    /// Creates a page request; a size of zero is raised to one
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.max(1),
        }
    }

    /// SQL `LIMIT`
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    /// SQL `OFFSET`
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    /// Slices an already ordered, fully materialized result set
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .iter()
            .skip(start)
            .take(self.size as usize)
            .cloned()
            .collect()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 10 }
    }
}

/// One page of results with pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    /// Builds a page from its items and the total element count
    pub fn new(items: Vec<T>, request: PageRequest, total_elements: i64) -> Self {
        let total_elements = total_elements.max(0);
        let size = request.limit();
        let total_pages = (total_elements + size - 1) / size;

        Self {
            items,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
            first: request.page == 0 || total_elements == 0,
            last: i64::from(request.page) + 1 >= total_pages,
        }
    }

    /// Page with no items and no totals
    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_is_clamped() {
        let request = PageRequest::new(0, 0);
        assert_eq!(request.size, 1);
        assert_eq!(request.limit(), 1);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(0, 10).offset(), 0);
        assert_eq!(PageRequest::new(3, 10).offset(), 30);
    }

    #[test]
    fn test_empty_page_metadata() {
        let page: Page<i32> = Page::empty(PageRequest::new(0, 10));

        assert!(page.is_empty());
        assert_eq!(page.total_elements, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.first);
        assert!(page.last);

        let beyond: Page<i32> = Page::empty(PageRequest::new(2, 10));
        assert_eq!(beyond.page, 2);
        assert!(beyond.first);
        assert!(beyond.last);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let request = PageRequest::new(0, 5);
        assert_eq!(Page::new(vec![1], request, 1).total_pages, 1);
        assert_eq!(Page::new(vec![1], request, 5).total_pages, 1);
        assert_eq!(Page::new(vec![1], request, 6).total_pages, 2);
        assert_eq!(Page::new(vec![1], request, 15).total_pages, 3);
    }

    #[test]
    fn test_first_and_last_flags() {
        let first = Page::new(vec![1; 5], PageRequest::new(0, 5), 15);
        assert!(first.first);
        assert!(!first.last);

        let middle = Page::new(vec![1; 5], PageRequest::new(1, 5), 15);
        assert!(!middle.first);
        assert!(!middle.last);

        let last = Page::new(vec![1; 5], PageRequest::new(2, 5), 15);
        assert!(!last.first);
        assert!(last.last);

        let single = Page::new(vec![1; 3], PageRequest::new(0, 5), 3);
        assert!(single.first);
        assert!(single.last);
    }

    #[test]
    fn test_out_of_range_page_keeps_totals() {
        let page: Page<i32> = Page::new(Vec::new(), PageRequest::new(9, 5), 12);

        assert!(page.is_empty());
        assert_eq!(page.total_elements, 12);
        assert_eq!(page.total_pages, 3);
        assert!(!page.first);
        assert!(page.last);
    }

    #[test]
    fn test_slice() {
        let all: Vec<i32> = (0..12).collect();
        assert_eq!(PageRequest::new(0, 5).slice(&all), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageRequest::new(2, 5).slice(&all), vec![10, 11]);
        assert!(PageRequest::new(3, 5).slice(&all).is_empty());
    }

}
