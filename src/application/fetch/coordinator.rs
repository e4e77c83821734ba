//! Single-flight "fetch next page" driver.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::cache::PaginatedCollectionCache;
use crate::domain::{
    CollectionView, Cursor, DependentQueryKey, FetchOutcome, FetchTicket, FetchedPage, SkipReason,
};
use crate::error::FetchError;
use crate::port::PageSource;

/// Drives pagination for every key of one cache, one request per key at a time.
///
/// Extra requests while one is in flight are dropped, not queued: the
/// visibility signal that produces them recurs on every render, so the
/// next one after completion picks up where this one left off.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pagesync::application::cache::PaginatedCollectionCache;
/// use pagesync::application::fetch::FetchCoordinator;
/// use pagesync::domain::{DependentQueryKey, FetchedPage};
///
/// # tokio_test::block_on(async {
/// let cache = Arc::new(PaginatedCollectionCache::<u32>::new());
/// let coordinator = FetchCoordinator::new(cache);
/// let key = DependentQueryKey::new("provinces");
///
/// let outcome = coordinator
///     .request_next_page(&key, |_cursor| async { Ok(FetchedPage::last(vec![1, 2, 3])) })
///     .await;
///
/// assert!(outcome.is_appended());
/// assert!(coordinator.view(&key).is_exhausted());
/// # });
/// ```
pub struct FetchCoordinator<T> {
    cache: Arc<PaginatedCollectionCache<T>>,
}

impl<T> FetchCoordinator<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(cache: Arc<PaginatedCollectionCache<T>>) -> Self {
        Self { cache }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<PaginatedCollectionCache<T>> {
        &self.cache
    }

    /// Fetch and append the next page of `key`.
    ///
    /// Skips without calling `fetch` if a request for `key` is already in
    /// flight or the collection is exhausted. On failure the error is stored
    /// on the collection and no page is appended, so the same cursor is
    /// retried next time.
    pub async fn request_next_page<F, Fut>(&self, key: &DependentQueryKey, fetch: F) -> FetchOutcome
    where
        F: FnOnce(Option<Cursor>) -> Fut,
        Fut: Future<Output = Result<FetchedPage<T>, FetchError>>,
    {
        let ticket = match self.cache.begin_fetch(key) {
            Ok(ticket) => ticket,
            Err(reason) => {
                debug!(key = %key, reason = ?reason, "Skipping page request");
                return FetchOutcome::Skipped(reason);
            }
        };

        debug!(
            key = %key,
            cursor = ?ticket.cursor,
            generation = ticket.generation,
            "Requesting page"
        );

        let mut guard = InFlight::new(&self.cache, ticket);
        let result = fetch(guard.ticket().cursor.clone()).await;

        if let Err(ref err) = result {
            warn!(key = %key, error = %err, "Page request failed");
        }

        self.cache.complete_fetch(guard.disarm(), result)
    }

    /// [`Self::request_next_page`] against a [`PageSource`].
    pub async fn request_from<S>(&self, key: &DependentQueryKey, source: &S) -> FetchOutcome
    where
        S: PageSource<T> + ?Sized,
    {
        self.request_next_page(key, |cursor| source.fetch_page(key, cursor))
            .await
    }

    /// Load more when the end-of-list sentinel is visible.
    ///
    /// Level-triggered: callers report visibility on every observation, and
    /// every report with `is_near_end` re-checks the key, so a failed page is
    /// retried on the next report instead of stalling pagination.
    pub async fn visibility_trigger<F, Fut>(
        &self,
        key: &DependentQueryKey,
        is_near_end: bool,
        fetch: F,
    ) -> FetchOutcome
    where
        F: FnOnce(Option<Cursor>) -> Fut,
        Fut: Future<Output = Result<FetchedPage<T>, FetchError>>,
    {
        if !is_near_end {
            return FetchOutcome::Skipped(SkipReason::NotNearEnd);
        }
        self.request_next_page(key, fetch).await
    }

    /// Drop everything cached for `key` and fetch its first page again.
    pub async fn refresh<F, Fut>(&self, key: &DependentQueryKey, fetch: F) -> FetchOutcome
    where
        F: FnOnce(Option<Cursor>) -> Fut,
        Fut: Future<Output = Result<FetchedPage<T>, FetchError>>,
    {
        self.cache.reset(key);
        self.request_next_page(key, fetch).await
    }

    /// Render-ready projection of `key`.
    #[must_use]
    pub fn view(&self, key: &DependentQueryKey) -> CollectionView<T> {
        self.cache.view(key)
    }
}

impl<T> Clone for FetchCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

/// Clears the in-flight flag if the request future is dropped mid-flight.
struct InFlight<'a, T>
where
    T: Clone + Send + Sync,
{
    cache: &'a PaginatedCollectionCache<T>,
    ticket: FetchTicket,
    armed: bool,
}

impl<'a, T> InFlight<'a, T>
where
    T: Clone + Send + Sync,
{
    fn new(cache: &'a PaginatedCollectionCache<T>, ticket: FetchTicket) -> Self {
        Self {
            cache,
            ticket,
            armed: true,
        }
    }

    fn ticket(&self) -> &FetchTicket {
        &self.ticket
    }

    fn disarm(&mut self) -> FetchTicket {
        self.armed = false;
        self.ticket.clone()
    }
}

impl<T> Drop for InFlight<'_, T>
where
    T: Clone + Send + Sync,
{
    fn drop(&mut self) {
        if self.armed {
            self.cache.abandon_fetch(&self.ticket);
        }
    }
}
