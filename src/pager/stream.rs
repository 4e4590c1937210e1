use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use pin_project_lite::pin_project;

use super::WalkState;
use crate::domain::{Page, PageRequest};

pin_project! {
    /// Async counterpart of [`Paginated`](super::Paginated): a `Stream` of items
    /// over all pages, driving an async fetcher on demand.
    ///
    /// The fetch future for the next page is created only after the buffered
    /// items of the current page have been yielded. Dropping the stream while
    /// a fetch is in flight drops (and thereby cancels) that future.
    pub struct PageStream<T, E, F, Fut>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
    {
        buffer: VecDeque<T>,
        state: WalkState,
        in_flight: Option<PageRequest>,
        done: bool,
        fetcher: F,
        #[pin]
        current_fetch: Option<Fut>,
    }
}

impl<T, E, F, Fut> PageStream<T, E, F, Fut>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    pub fn new(first: Page<T>, fetcher: F) -> Self {
        let state = WalkState::start(&first);
        Self {
            buffer: first.items.into(),
            state,
            in_flight: None,
            done: false,
            fetcher,
            current_fetch: None,
        }
    }
}

impl<T, E, F, Fut> fmt::Debug for PageStream<T, E, F, Fut>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStream")
            .field("buffered", &self.buffer.len())
            .field("state", &self.state)
            .field("in_flight", &self.in_flight)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<T, E, F, Fut> Stream for PageStream<T, E, F, Fut>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(item) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if *this.done {
                return Poll::Ready(None);
            }

            if let Some(fut) = this.current_fetch.as_mut().as_pin_mut() {
                match fut.poll(cx) {
                    Poll::Ready(Ok(page)) => {
                        this.current_fetch.set(None);
                        if let Some(request) = this.in_flight.take() {
                            this.state.advance(&request, &page);
                        }
                        this.buffer.extend(page.items);
                        continue;
                    }
                    Poll::Ready(Err(err)) => {
                        this.current_fetch.set(None);
                        *this.in_flight = None;
                        *this.done = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            let Some(request) = this.state.take_next() else {
                *this.done = true;
                return Poll::Ready(None);
            };

            tracing::debug!(?request, "fetching next page");
            let fut = (this.fetcher)(request.clone());
            *this.in_flight = Some(request);
            this.current_fetch.set(Some(fut));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done || (self.state.next.is_none() && self.current_fetch.is_none()) {
            (self.buffer.len(), Some(self.buffer.len()))
        } else {
            (self.buffer.len(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use futures_util::StreamExt;

    use crate::domain::PageTotal;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct FakeError(String);

    #[derive(Clone)]
    struct FakeFetcher {
        pages: Arc<[Page<u32>]>,
        requests: Arc<Mutex<Vec<PageRequest>>>,
        fail_on: Option<u32>,
    }

    impl FakeFetcher {
        fn new(pages: Vec<Page<u32>>) -> Self {
            Self {
                pages: Arc::from(pages),
                requests: Arc::new(Mutex::new(Vec::new())),
                fail_on: None,
            }
        }

        fn failing_on(mut self, page: u32) -> Self {
            self.fail_on = Some(page);
            self
        }

        fn fetch(&self, request: PageRequest) -> Result<Page<u32>, FakeError> {
            self.requests.lock().unwrap().push(request.clone());
            let PageRequest::Number(number) = request else {
                return Err(FakeError("cursor requests are not expected".to_owned()));
            };
            if self.fail_on == Some(number) {
                return Err(FakeError(format!("page {number} failed")));
            }
            self.pages
                .get(number as usize - 1)
                .cloned()
                .ok_or_else(|| FakeError(format!("page {number} does not exist")))
        }

        fn requests(&self) -> Vec<PageRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn three_pages() -> Vec<Page<u32>> {
        vec![
            Page::new(vec![1, 2], 1, 2, PageTotal::Results(5)),
            Page::new(vec![3, 4], 2, 2, PageTotal::Results(5)),
            Page::new(vec![5], 3, 2, PageTotal::Results(5)),
        ]
    }

    #[tokio::test]
    async fn streams_all_items_fetching_each_page_once() {
        let pages = three_pages();
        let fetcher = FakeFetcher::new(pages.clone());
        let for_stream = fetcher.clone();

        let stream = PageStream::new(pages[0].clone(), move |request| {
            let fetcher = for_stream.clone();
            async move { fetcher.fetch(request) }
        });

        let items: Vec<Result<u32, FakeError>> = stream.collect().await;
        let items: Vec<u32> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            fetcher.requests(),
            vec![PageRequest::Number(2), PageRequest::Number(3)]
        );
    }

    #[tokio::test]
    async fn fetch_error_is_observed_after_first_page() {
        let pages = three_pages();
        let fetcher = FakeFetcher::new(pages.clone()).failing_on(2);
        let for_stream = fetcher.clone();

        let mut stream = Box::pin(PageStream::new(pages[0].clone(), move |request| {
            let fetcher = for_stream.clone();
            async move { fetcher.fetch(request) }
        }));

        assert_eq!(stream.next().await, Some(Ok(1)));
        assert_eq!(stream.next().await, Some(Ok(2)));
        assert!(fetcher.requests().is_empty());
        assert_eq!(
            stream.next().await,
            Some(Err(FakeError("page 2 failed".to_owned())))
        );
        assert_eq!(stream.next().await, None);
        assert_eq!(fetcher.requests(), vec![PageRequest::Number(2)]);
    }

    #[tokio::test]
    async fn empty_first_page_ends_immediately() {
        let fetcher = FakeFetcher::new(Vec::new());
        let for_stream = fetcher.clone();
        let first = Page::new(Vec::new(), 1, 20, PageTotal::Results(0));

        let stream = PageStream::new(first, move |request| {
            let fetcher = for_stream.clone();
            async move { fetcher.fetch(request) }
        });

        let items: Vec<Result<u32, FakeError>> = stream.collect().await;
        assert!(items.is_empty());
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn pending_fetch_is_polled_once_and_not_recreated() {
        struct PendingFuture {
            polls: Arc<AtomicUsize>,
        }

        impl Future for PendingFuture {
            type Output = Result<Page<u32>, FakeError>;

            fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
                self.polls.fetch_add(1, Ordering::SeqCst);
                Poll::Pending
            }
        }

        let polls = Arc::new(AtomicUsize::new(0));
        let created = Arc::new(AtomicUsize::new(0));
        let polls_for_fetcher = polls.clone();
        let created_for_fetcher = created.clone();

        let first = Page::new(Vec::new(), 1, 1, PageTotal::Pages(2));
        let mut stream = PageStream::new(first, move |_request| {
            created_for_fetcher.fetch_add(1, Ordering::SeqCst);
            PendingFuture {
                polls: polls_for_fetcher.clone(),
            }
        });

        let waker = futures_util::task::noop_waker_ref();
        let mut cx = Context::from_waker(waker);

        assert!(Pin::new(&mut stream).poll_next(&mut cx).is_pending());
        assert!(Pin::new(&mut stream).poll_next(&mut cx).is_pending());
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cursor_stream_ends_on_full_page_without_cursor() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        let first = Page::new(vec![1_u32, 2], 1, 2, PageTotal::Unknown).with_cursor(Some("c2".to_owned()));

        let stream = PageStream::new(first, move |request: PageRequest| {
            seen.lock().unwrap().push(request.clone());
            let page = match request {
                PageRequest::After(_) => Page::new(vec![3, 4], 0, 2, PageTotal::Unknown),
                PageRequest::Number(_) => Page::new(vec![1, 2], 1, 2, PageTotal::Unknown),
            };
            async move { Ok::<_, FakeError>(page) }
        });

        let items: Vec<u32> = stream.map(Result::unwrap).collect().await;
        assert_eq!(items, vec![1, 2, 3, 4]);
        assert_eq!(
            *requests.lock().unwrap(),
            vec![PageRequest::After("c2".to_owned())]
        );
    }

    #[test]
    fn debug_reports_walk_position() {
        let first = Page::new(vec![1_u32, 2], 1, 2, PageTotal::Pages(1));
        let stream = PageStream::new(first, |_request| async {
            Err::<Page<u32>, _>(FakeError("unused".to_owned()))
        });
        let rendered = format!("{stream:?}");
        assert!(rendered.starts_with("PageStream"));
        assert!(rendered.contains("buffered: 2"));
        assert!(rendered.contains("done: false"));
    }
}
