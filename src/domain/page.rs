#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Collection size information reported by the server, if any.
pub enum PageTotal {
    Pages(u32),
    Results(u64),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// What to ask the server for when fetching the next page.
pub enum PageRequest {
    /// One-based page number.
    Number(u32),
    /// Opaque cursor handed out by the previous page.
    After(String),
}

#[derive(Debug, Clone, PartialEq)]
/// One fetched page of a collection plus the metadata needed to find the next one.
///
/// `items.len() <= page_size` is a server contract and is not enforced here.
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total: PageTotal,
    pub next_cursor: Option<String>,
    cursor_paged: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page_number: u32, page_size: u32, total: PageTotal) -> Self {
        Self {
            items,
            page_number,
            page_size,
            total,
            next_cursor: None,
            cursor_paged: false,
        }
    }

    /// Cursor-paginated page; the next page is requested with `next_cursor`.
    ///
    /// A cursor-paginated page without a cursor is the last one.
    pub fn with_cursor(mut self, next_cursor: Option<String>) -> Self {
        self.next_cursor = next_cursor;
        self.cursor_paged = true;
        self
    }

    pub fn is_cursor_paged(&self) -> bool {
        self.cursor_paged
    }

    /// Whether another page exists after this one.
    ///
    /// Totals supplied by the server win. A cursor counts as proof of a next
    /// page. Only when neither is present does a full page of a numbered
    /// collection imply "maybe more".
    pub fn has_next(&self) -> bool {
        self.has_next_from(self.page_number)
    }

    /// [`Page::has_next`] evaluated as if this page were `page_number`.
    pub(crate) fn has_next_from(&self, page_number: u32) -> bool {
        match self.total {
            PageTotal::Pages(total_pages) => page_number < total_pages,
            PageTotal::Results(total_results) => {
                self.page_size > 0
                    && u64::from(page_number) * u64::from(self.page_size) < total_results
            }
            PageTotal::Unknown => {
                if self.next_cursor.is_some() {
                    return true;
                }
                !self.cursor_paged
                    && self.page_size > 0 && self.items.len() >= self.page_size as usize
            }
        }
    }

    pub fn next_request(&self) -> Option<PageRequest> {
        if !self.has_next() {
            return None;
        }
        match &self.next_cursor {
            Some(cursor) => Some(PageRequest::After(cursor.clone())),
            None => self.page_number.checked_add(1).map(PageRequest::Number),
        }
    }

    /// Convert every item, keeping the page metadata.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>, E>>()?;
        Ok(Page {
            items,
            page_number: self.page_number,
            page_size: self.page_size,
            total: self.total,
            next_cursor: self.next_cursor,
            cursor_paged: self.cursor_paged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_decide_next_page() {
        let page = Page::new(vec![1, 2], 1, 2, PageTotal::Pages(3));
        assert!(page.has_next());
        assert_eq!(page.next_request(), Some(PageRequest::Number(2)));

        let last = Page::new(vec![5], 3, 2, PageTotal::Pages(3));
        assert!(!last.has_next());
        assert_eq!(last.next_request(), None);
    }

    #[test]
    fn total_results_decide_next_page() {
        let page = Page::new(vec![1, 2], 2, 2, PageTotal::Results(5));
        assert!(page.has_next());

        let exact = Page::new(vec![3, 4], 2, 2, PageTotal::Results(4));
        assert!(!exact.has_next());

        let zero_size = Page::<i32>::new(vec![], 1, 0, PageTotal::Results(10));
        assert!(!zero_size.has_next());
        assert_eq!(zero_size.next_request(), None);
    }

    #[test]
    fn totals_win_over_full_page_heuristic() {
        let full_last = Page::new(vec![1, 2], 2, 2, PageTotal::Pages(2));
        assert!(!full_last.has_next());
    }

    #[test]
    fn heuristic_applies_without_totals() {
        let full = Page::new(vec![1, 2], 1, 2, PageTotal::Unknown);
        assert!(full.has_next());

        let short = Page::new(vec![1], 2, 2, PageTotal::Unknown);
        assert!(!short.has_next());

        let empty = Page::<i32>::new(vec![], 1, 0, PageTotal::Unknown);
        assert!(!empty.has_next());
    }

    #[test]
    fn cursor_drives_next_request() {
        let page = Page::new(vec![1], 1, 10, PageTotal::Unknown).with_cursor(Some("c2".to_owned()));
        assert_eq!(page.next_request(), Some(PageRequest::After("c2".to_owned())));
    }

    #[test]
    fn full_cursor_page_without_cursor_is_last() {
        let last = Page::new(vec![3, 4], 0, 2, PageTotal::Unknown).with_cursor(None);
        assert!(last.is_cursor_paged());
        assert!(!last.has_next());
        assert_eq!(last.next_request(), None);
    }

    #[test]
    fn try_map_keeps_metadata() {
        let page = Page::new(vec!["1", "2"], 4, 2, PageTotal::Results(10));
        let mapped = page.try_map(|item| item.parse::<i32>()).unwrap();
        assert_eq!(mapped.items, vec![1, 2]);
        assert_eq!(mapped.page_number, 4);
        assert_eq!(mapped.total, PageTotal::Results(10));
    }
}
