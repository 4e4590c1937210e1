//! Pagination walkers: present a multi-page collection as one lazy sequence.
//!
//! Both walkers start from a page that has already been fetched and call the
//! supplied fetcher only when that page's items are used up. They never build
//! HTTP requests and never retry; a fetch error is yielded once, at the point
//! the next item was asked for, and ends the sequence.
//!
//! ```rust
//! use telapi::{Page, PageRequest, PageTotal, Paginated};
//!
//! let first = Page::new(vec![1, 2], 1, 2, PageTotal::Pages(2));
//! let items: Result<Vec<i32>, String> = Paginated::new(first, |request| match request {
//!     PageRequest::Number(2) => Ok(Page::new(vec![3], 2, 2, PageTotal::Pages(2))),
//!     other => Err(format!("unexpected request {other:?}")),
//! })
//! .collect();
//! assert_eq!(items.unwrap(), vec![1, 2, 3]);
//! ```

mod blocking;
mod stream;

pub use blocking::Paginated;
pub use stream::PageStream;

use crate::domain::{Page, PageRequest};

/// Position of a walker between pages.
///
/// Page numbers advance from the walker's own counter rather than from the
/// number echoed by the server, so a misbehaving server cannot make a walker
/// request the same page twice.
#[derive(Debug, Clone)]
struct WalkState {
    page_number: u32,
    /// Set once the walk has seen a cursor; it never falls back to page numbers.
    by_cursor: bool,
    next: Option<PageRequest>,
}

impl WalkState {
    fn start<T>(page: &Page<T>) -> Self {
        let mut state = Self {
            page_number: page.page_number,
            by_cursor: false,
            next: None,
        };
        state.plan(page);
        state
    }

    /// Record a freshly fetched page and plan the request after it.
    fn advance<T>(&mut self, request: &PageRequest, page: &Page<T>) {
        match request {
            PageRequest::Number(number) => self.page_number = *number,
            PageRequest::After(_) => self.by_cursor = true,
        }
        self.plan(page);
    }

    fn plan<T>(&mut self, page: &Page<T>) {
        self.by_cursor |= page.is_cursor_paged() || page.next_cursor.is_some();
        self.next = if !page.has_next_from(self.page_number) {
            None
        } else if let Some(cursor) = &page.next_cursor {
            Some(PageRequest::After(cursor.clone()))
        } else if self.by_cursor {
            None
        } else {
            self.page_number.checked_add(1).map(PageRequest::Number)
        };
    }

    fn take_next(&mut self) -> Option<PageRequest> {
        self.next.take()
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::PageTotal;

    use super::*;

    #[test]
    fn state_plans_next_number_from_own_counter() {
        let first = Page::new(vec![1], 1, 1, PageTotal::Pages(3));
        let mut state = WalkState::start(&first);
        let request = state.take_next().unwrap();
        assert_eq!(request, PageRequest::Number(2));

        // Server echoes a stale page number; the walker still moves forward.
        let echoed = Page::new(vec![2], 1, 1, PageTotal::Pages(3));
        state.advance(&request, &echoed);
        assert_eq!(state.take_next(), Some(PageRequest::Number(3)));
        assert_eq!(state.take_next(), None);

        let last = Page::new(vec![3], 1, 1, PageTotal::Pages(3));
        state.advance(&PageRequest::Number(3), &last);
        assert_eq!(state.take_next(), None);
    }

    #[test]
    fn state_prefers_cursor() {
        let first = Page::new(vec![1], 1, 1, PageTotal::Unknown).with_cursor(Some("n".to_owned()));
        let mut state = WalkState::start(&first);
        assert_eq!(state.take_next(), Some(PageRequest::After("n".to_owned())));
    }

    #[test]
    fn cursor_walk_never_switches_to_page_numbers() {
        let first = Page::new(vec![1, 2], 1, 2, PageTotal::Unknown).with_cursor(Some("c2".to_owned()));
        let mut state = WalkState::start(&first);
        let request = state.take_next().unwrap();
        assert_eq!(request, PageRequest::After("c2".to_owned()));

        // A full page without a cursor, even one not marked as cursor-paged.
        let last = Page::new(vec![3, 4], 1, 2, PageTotal::Unknown);
        state.advance(&request, &last);
        assert_eq!(state.take_next(), None);
    }
}
