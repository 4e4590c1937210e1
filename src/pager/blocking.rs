use std::collections::VecDeque;
use std::fmt;

use super::WalkState;
use crate::domain::{Page, PageRequest};

/// Lazy, forward-only iterator over every item of a paginated collection.
///
/// Built from the first page and a fetcher for later pages. Fetching happens
/// synchronously inside [`Iterator::next`], only once the current page is
/// exhausted, and at most once per page. A fetch error is yielded as
/// `Some(Err(_))` once; after that (and after the last page) `next` returns
/// `None`.
///
/// A walker is not restartable: iterate again by building a new one from a
/// clone of the first page.
pub struct Paginated<T, E, F>
where
    F: FnMut(PageRequest) -> Result<Page<T>, E>,
{
    buffer: VecDeque<T>,
    state: WalkState,
    done: bool,
    fetcher: F,
}

impl<T, E, F> Paginated<T, E, F>
where
    F: FnMut(PageRequest) -> Result<Page<T>, E>,
{
    pub fn new(first: Page<T>, fetcher: F) -> Self {
        let state = WalkState::start(&first);
        Self {
            buffer: first.items.into(),
            state,
            done: false,
            fetcher,
        }
    }

    /// Number of the page the walker is currently reading from.
    pub fn page_number(&self) -> u32 {
        self.state.page_number
    }
}

impl<T, E, F> Iterator for Paginated<T, E, F>
where
    F: FnMut(PageRequest) -> Result<Page<T>, E>,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }

            if self.done {
                return None;
            }

            let Some(request) = self.state.take_next() else {
                self.done = true;
                return None;
            };

            tracing::debug!(?request, "fetching next page");
            match (self.fetcher)(request.clone()) {
                Ok(page) => {
                    self.state.advance(&request, &page);
                    self.buffer.extend(page.items);
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl<T, E, F> fmt::Debug for Paginated<T, E, F>
where
    F: FnMut(PageRequest) -> Result<Page<T>, E>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginated")
            .field("buffered", &self.buffer.len())
            .field("state", &self.state)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
