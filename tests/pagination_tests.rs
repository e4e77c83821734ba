//! Integration tests for next-page fetching against mock page sources.

use std::time::Duration;

use futures_util::future::join_all;
use futures_util::FutureExt;

use pagesync::application::fetch::FetchCoordinator;
use pagesync::domain::{FetchOutcome, FetchPhase, FetchedPage, SkipReason};
use pagesync::error::FetchError;
use pagesync::infrastructure::bootstrap::SyncLayer;
use pagesync::port::PageSource;
use pagesync::testkit::config;
use pagesync::testkit::domain::{cities_of, cursor, last_page, page};
use pagesync::testkit::source::{GatedSource, ScriptedSource};

fn coordinator<T: Clone + Send + Sync + 'static>() -> FetchCoordinator<T> {
    let (layer, _) = SyncLayer::build(&config::silent());
    layer.fetch().clone()
}

#[tokio::test]
async fn rapid_visibility_reports_issue_one_request() {
    let fetch = coordinator::<u32>();
    let key = cities_of("province-12");
    let source = GatedSource::new();

    let mut first = Box::pin(fetch.visibility_trigger(&key, true, |c| source.fetch_page(&key, c)));
    assert!((&mut first).now_or_never().is_none());

    for _ in 0..25 {
        let outcome = fetch
            .visibility_trigger(&key, true, |c| source.fetch_page(&key, c))
            .await;
        assert_eq!(outcome, FetchOutcome::Skipped(SkipReason::InFlight));
    }
    assert_eq!(source.call_count(), 1);
    assert_eq!(source.pending_requests(), vec![(key.clone(), None)]);

    assert!(source.release_next(Ok(page(vec![1, 2], "p2"))));
    assert!(first.await.is_appended());

    // The next report after completion continues from the stored cursor.
    let mut second = Box::pin(fetch.visibility_trigger(&key, true, |c| source.fetch_page(&key, c)));
    assert!((&mut second).now_or_never().is_none());
    assert_eq!(source.pending_requests(), vec![(key.clone(), cursor("p2"))]);
    source.release_next(Ok(last_page(vec![3])));
    assert!(second.await.is_appended());

    assert_eq!(fetch.view(&key).items, vec![1, 2, 3]);
}

#[tokio::test]
async fn pages_stay_in_cursor_order_under_jitter() {
    let fetch = coordinator::<u32>();
    let key = cities_of("province-7");
    let source = ScriptedSource::new()
        .with_page(None, page(vec![1, 2], "p2"))
        .with_page(Some("p2"), page(vec![3, 4], "p3"))
        .with_page(Some("p3"), page(vec![5], "p4"))
        .with_page(Some("p4"), last_page(vec![6, 7]))
        .with_delay(None, Duration::from_millis(15))
        .with_delay(Some("p2"), Duration::from_millis(1))
        .with_delay(Some("p3"), Duration::from_millis(10));

    while !fetch.view(&key).is_exhausted() {
        let outcomes = join_all((0..4).map(|_| fetch.request_from(&key, &source))).await;
        let issued = outcomes.iter().filter(|o| o.was_issued()).count();
        assert_eq!(issued, 1, "one request per round, got {outcomes:?}");
    }

    assert_eq!(fetch.view(&key).items, vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(
        source.requested_cursors(),
        vec![None, cursor("p2"), cursor("p3"), cursor("p4")]
    );
}

#[tokio::test]
async fn exhausted_collection_never_calls_backend_again() {
    let fetch = coordinator::<u32>();
    let key = cities_of("province-12");
    let source = ScriptedSource::new().with_page(None, last_page(vec![1]));

    fetch.request_from(&key, &source).await;
    for _ in 0..10 {
        let outcome = fetch
            .visibility_trigger(&key, true, |c| source.fetch_page(&key, c))
            .await;
        assert_eq!(outcome, FetchOutcome::Skipped(SkipReason::Exhausted));
    }

    assert_eq!(source.call_count(), 1);
    assert_eq!(fetch.view(&key).phase, FetchPhase::Exhausted);
}

#[tokio::test]
async fn cities_second_page_completes_the_list() {
    let fetch = coordinator::<u32>();
    let key = cities_of("province-12");
    fetch.cache().append_page(&key, None, page(vec![1, 2], "p2"));

    let source = ScriptedSource::new().with_page(Some("p2"), last_page(vec![3]));
    let outcome = fetch
        .visibility_trigger(&key, true, |c| source.fetch_page(&key, c))
        .await;

    assert_eq!(outcome, FetchOutcome::Appended { items: 1, exhausted: true });
    let view = fetch.view(&key);
    assert_eq!(view.items, vec![1, 2, 3]);
    assert!(view.is_exhausted());
    assert_eq!(source.requested_cursors(), vec![cursor("p2")]);
}

#[tokio::test]
async fn failed_page_is_retried_on_next_report() {
    let fetch = coordinator::<u32>();
    let key = cities_of("province-12");
    let source = ScriptedSource::new()
        .with_page(None, page(vec![1, 2], "p2"))
        .with_error(
            Some("p2"),
            FetchError::Backend {
                status: 503,
                message: "unavailable".into(),
            },
        )
        .with_page(Some("p2"), last_page(vec![3]));

    fetch.request_from(&key, &source).await;
    let failed = fetch.request_from(&key, &source).await;
    assert!(matches!(failed, FetchOutcome::Failed(FetchError::Backend { status: 503, .. })));

    let view = fetch.view(&key);
    assert_eq!(view.items, vec![1, 2]);
    assert!(view.error.is_some());
    assert_eq!(view.phase, FetchPhase::Idle);

    let retried = fetch
        .visibility_trigger(&key, true, |c| source.fetch_page(&key, c))
        .await;
    assert!(retried.is_appended());
    let view = fetch.view(&key);
    assert_eq!(view.items, vec![1, 2, 3]);
    assert!(view.error.is_none());
    assert_eq!(
        source.requested_cursors(),
        vec![None, cursor("p2"), cursor("p2")]
    );
}

#[tokio::test]
async fn response_from_before_refresh_is_discarded() {
    let fetch = coordinator::<u32>();
    let key = cities_of("province-12");
    let source = GatedSource::new();

    let mut old = Box::pin(fetch.request_from(&key, &source));
    assert!((&mut old).now_or_never().is_none());

    let mut fresh = Box::pin(fetch.refresh(&key, |c| source.fetch_page(&key, c)));
    assert!((&mut fresh).now_or_never().is_none());
    assert_eq!(source.pending(), 2);

    // The old response arrives while the fresh one is still pending.
    assert!(source.release_next(Ok(last_page(vec![1, 2]))));
    assert_eq!(old.await, FetchOutcome::Stale);
    assert!(fetch.view(&key).items.is_empty());
    assert!(fetch.view(&key).is_fetching_next);

    assert!(source.release_next(Ok(last_page(vec![10, 20]))));
    assert!(fresh.await.is_appended());
    assert_eq!(fetch.view(&key).items, vec![10, 20]);
}

#[tokio::test]
async fn keys_paginate_independently() {
    let fetch = coordinator::<u32>();
    let east = cities_of("east");
    let west = cities_of("west");
    let source = GatedSource::new();

    let mut east_req = Box::pin(fetch.request_from(&east, &source));
    let mut west_req = Box::pin(fetch.request_from(&west, &source));
    assert!((&mut east_req).now_or_never().is_none());
    assert!((&mut west_req).now_or_never().is_none());
    assert_eq!(source.call_count(), 2);

    source.release_for(&west, Ok(FetchedPage::last(vec![2])));
    source.release_for(&east, Ok(FetchedPage::last(vec![1])));
    assert!(west_req.await.is_appended());
    assert!(east_req.await.is_appended());

    assert_eq!(fetch.view(&east).items, vec![1]);
    assert_eq!(fetch.view(&west).items, vec![2]);
}
