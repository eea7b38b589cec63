//! Concrete adapters and the page-driven stream they share.

pub mod reddit;
pub mod twitter;
pub mod web_search;
pub mod youtube;

use std::future::Future;

use futures::stream::{self, BoxStream, StreamExt};
use shoerev_core::RawItem;
use tokio_util::sync::CancellationToken;

use crate::error::AdapterError;

/// Lazily fetched adapter output. Ends after `limit` items, when the upstream
/// runs out of pages, after the first fatal error, or on cancellation.
pub type RawItemStream<'a> = BoxStream<'a, Result<RawItem, AdapterError>>;

/// Hard stop on pages per query so a misbehaving cursor cannot loop forever.
const MAX_PAGES: usize = 10;

/// One upstream page: item-level results plus the cursor for the next page.
pub(crate) struct Page {
    pub(crate) items: Vec<Result<RawItem, AdapterError>>,
    pub(crate) next: Option<String>,
}

struct PageState<F> {
    fetch: F,
    cursor: Option<String>,
    remaining: usize,
    pages: usize,
    done: bool,
    cancel: CancellationToken,
}

/// Drive `fetch(cursor, remaining)` page by page into a [`RawItemStream`].
///
/// Item-level errors are passed through without ending the stream. A failed
/// page fetch is yielded once and ends the stream. Cancellation while a page
/// is due ends it with [`AdapterError::Cancelled`]; a stream that already
/// reached its last page finishes normally.
pub(crate) fn paginate<'a, F, Fut>(
    limit: usize,
    cancel: CancellationToken,
    fetch: F,
) -> RawItemStream<'a>
where
    F: FnMut(Option<String>, usize) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page, AdapterError>> + Send + 'a,
{
    let state = PageState {
        fetch,
        cursor: None,
        remaining: limit,
        pages: 0,
        done: false,
        cancel,
    };

    stream::unfold(state, |mut state| async move {
        if state.done || state.remaining == 0 || state.pages >= MAX_PAGES {
            return None;
        }
        state.pages += 1;

        let request = (state.fetch)(state.cursor.take(), state.remaining);
        let result = tokio::select! {
            biased;
            () = state.cancel.cancelled() => Err(AdapterError::Cancelled),
            result = request => result,
        };

        match result {
            Ok(page) => {
                let mut items = Vec::with_capacity(page.items.len());
                for item in page.items {
                    match item {
                        Ok(raw) if state.remaining > 0 => {
                            state.remaining -= 1;
                            items.push(Ok(raw));
                        }
                        Ok(_) => {}
                        Err(e) => items.push(Err(e)),
                    }
                }
                state.cursor = page.next;
                state.done = state.cursor.is_none();
                Some((items, state))
            }
            Err(e) => {
                state.done = true;
                Some((vec![Err(e)], state))
            }
        }
    })
    .flat_map(stream::iter)
    .boxed()
}

/// Drain `streams` one after another.
///
/// Malformed items pass through; any other error is yielded and ends the
/// combined stream without starting the remaining ones.
pub(crate) fn sequential(streams: Vec<RawItemStream<'_>>) -> RawItemStream<'_> {
    stream::unfold(
        (streams.into_iter(), None::<RawItemStream<'_>>),
        |(mut pending, mut current)| async move {
            loop {
                if current.is_none() {
                    current = Some(pending.next()?);
                }
                let active = current.as_mut()?;
                match active.next().await {
                    Some(Err(err)) if !matches!(err, AdapterError::Malformed(_)) => {
                        return Some((Err(err), (Vec::new().into_iter(), None)));
                    }
                    Some(item) => return Some((item, (pending, current))),
                    None => current = None,
                }
            }
        },
    )
    .boxed()
}

/// Decode the few HTML entities search APIs leave in titles.
pub(crate) fn unescape_html(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    input
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shoerev_core::MentionSource;

    fn raw(n: usize) -> RawItem {
        RawItem {
            source: MentionSource::Video,
            external_id: Some(format!("id{n}")),
            title: format!("title {n}"),
            author: "author".to_string(),
            url: format!("https://www.youtube.com/watch?v=id{n}"),
            published_at: None,
            fetched_at: Utc::now(),
        }
    }

    fn page(range: std::ops::Range<usize>, next: Option<&str>) -> Page {
        Page {
            items: range.map(|n| Ok(raw(n))).collect(),
            next: next.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn follows_cursors_until_limit() {
        let stream = paginate(5, CancellationToken::new(), |cursor, _remaining| async move {
            Ok(match cursor.as_deref() {
                None => page(0..3, Some("p2")),
                Some("p2") => page(3..6, Some("p3")),
                Some(_) => page(6..9, None),
            })
        });

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 5);
        assert!(items.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn item_errors_do_not_end_the_stream() {
        let stream = paginate(10, CancellationToken::new(), |cursor, _| async move {
            Ok(match cursor {
                None => Page {
                    items: vec![
                        Ok(raw(0)),
                        Err(AdapterError::Malformed("no id".into())),
                        Ok(raw(1)),
                    ],
                    next: Some("p2".into()),
                },
                Some(_) => page(2..3, None),
            })
        });

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 4);
        assert_eq!(items.iter().filter(|r| r.is_err()).count(), 1);
    }

    #[tokio::test]
    async fn page_error_is_yielded_once_then_ends() {
        let stream = paginate(10, CancellationToken::new(), |cursor, _| async move {
            match cursor {
                None => Ok(page(0..2, Some("p2"))),
                Some(_) => Err(AdapterError::Network("reset".into())),
            }
        });

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[2], Err(AdapterError::Network("reset".into())));
    }

    #[tokio::test]
    async fn sequential_drains_streams_in_order() {
        let first = paginate(2, CancellationToken::new(), |_, _| async { Ok(page(0..5, None)) });
        let second = paginate(2, CancellationToken::new(), |_, _| async { Ok(page(5..9, None)) });

        let items: Vec<_> = sequential(vec![first, second]).collect().await;
        let ids: Vec<_> = items
            .into_iter()
            .map(|r| r.unwrap().external_id.unwrap())
            .collect();
        assert_eq!(ids, vec!["id0", "id1", "id5", "id6"]);
    }

    #[tokio::test]
    async fn sequential_stops_before_next_stream_on_request_error() {
        let second_fetched = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = std::sync::Arc::clone(&second_fetched);

        let first = paginate(5, CancellationToken::new(), |_, _| async {
            Err(AdapterError::Rejected("bad request".into()))
        });
        let second = paginate(5, CancellationToken::new(), move |_, _| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            async { Ok(page(0..1, None)) }
        });

        let items: Vec<_> = sequential(vec![first, second]).collect().await;
        assert_eq!(items, vec![Err(AdapterError::Rejected("bad request".into()))]);
        assert!(!second_fetched.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn sequential_keeps_going_after_malformed_items() {
        let first = paginate(5, CancellationToken::new(), |_, _| async {
            Ok(Page {
                items: vec![Err(AdapterError::Malformed("no id".into()))],
                next: None,
            })
        });
        let second = paginate(5, CancellationToken::new(), |_, _| async { Ok(page(0..1, None)) });

        let items: Vec<_> = sequential(vec![first, second]).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[1].is_ok());
    }

    #[tokio::test]
    async fn cancelled_token_ends_stream_without_fetching() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stream = paginate(10, cancel, |_, _| async { Ok(page(0..3, None)) });
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items, vec![Err(AdapterError::Cancelled)]);
    }

    #[tokio::test]
    async fn cancellation_after_last_page_finishes_cleanly() {
        let cancel = CancellationToken::new();
        let mut stream = paginate(10, cancel.clone(), |_, _| async { Ok(page(0..2, None)) });
        assert!(stream.next().await.is_some_and(|item| item.is_ok()));
        cancel.cancel();
        let rest: Vec<_> = stream.collect().await;
        assert_eq!(rest.len(), 1);
        assert!(rest[0].is_ok());
    }

    #[tokio::test]
    async fn cancellation_between_pages_is_reported() {
        let cancel = CancellationToken::new();
        let mut stream = paginate(10, cancel.clone(), |cursor, _| async move {
            Ok(match cursor {
                None => page(0..1, Some("p2")),
                Some(_) => page(1..2, None),
            })
        });
        assert!(stream.next().await.is_some_and(|item| item.is_ok()));
        cancel.cancel();
        let rest: Vec<_> = stream.collect().await;
        assert_eq!(rest, vec![Err(AdapterError::Cancelled)]);
    }

    #[test]
    fn unescape_handles_common_entities() {
        assert_eq!(
            unescape_html("Nike &amp; ASICS &#39;review&#39; &quot;2024&quot;"),
            "Nike & ASICS 'review' \"2024\""
        );
        assert_eq!(unescape_html("plain"), "plain");
    }
}
