//! Thread-safe paginated collection cache with optional update notifications.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::domain::{
    CollectionState, CollectionView, Cursor, DependentQueryKey, FetchOutcome, FetchTicket,
    FetchedPage, MutationSnapshot, PageCursor, PageSet, ParentId, ResourceKind, SkipReason,
};
use crate::error::FetchError;
use crate::port::CascadeTarget;

/// What changed in a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    FetchStarted,
    PageAppended,
    FetchFailed,
    Reset,
    Evicted,
    Mutated,
    Restored,
}

/// Notification sent when a collection changes.
#[derive(Debug, Clone)]
pub struct CollectionUpdate {
    /// The collection that changed.
    pub key: DependentQueryKey,
    pub kind: UpdateKind,
}

/// Authoritative in-memory store of fetched pages, one entry per key.
///
/// Every operation is total: unknown keys are created on demand or treated
/// as empty, and nothing here returns an error. Locks are never held across
/// an await point; callers do their I/O between calls.
pub struct PaginatedCollectionCache<T> {
    entries: RwLock<HashMap<DependentQueryKey, CollectionState<T>>>,
    /// Cache-wide so an evicted and recreated key never reuses a generation.
    generations: AtomicU64,
    /// Broadcast sender for update notifications.
    /// Wrapped in Option to allow construction without notifications.
    tx: Option<broadcast::Sender<CollectionUpdate>>,
}

impl<T> PaginatedCollectionCache<T>
where
    T: Clone + Send + Sync,
{
    /// Create a new cache without notifications.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            generations: AtomicU64::new(0),
            tx: None,
        }
    }

    /// Create a new cache with broadcast notifications.
    ///
    /// Returns the cache and a receiver for subscribing to updates.
    /// Additional receivers can be created via `subscribe()`.
    #[must_use]
    pub fn with_notifications(
        capacity: usize,
    ) -> (Self, broadcast::Receiver<CollectionUpdate>) {
        let (tx, rx) = broadcast::channel(capacity);
        let cache = Self {
            entries: RwLock::new(HashMap::new()),
            generations: AtomicU64::new(0),
            tx: Some(tx),
        };
        (cache, rx)
    }

    /// Subscribe to collection update notifications.
    ///
    /// Returns `None` if the cache was created without notifications.
    #[must_use]
    pub fn subscribe(&self) -> Option<broadcast::Receiver<CollectionUpdate>> {
        self.tx.as_ref().map(|tx| tx.subscribe())
    }

    /// Get a copy of the state for `key`, creating an empty entry if needed.
    pub fn get_or_create(&self, key: &DependentQueryKey) -> CollectionState<T> {
        let mut entries = self.entries.write();
        entries
            .entry(key.clone())
            .or_insert_with(|| CollectionState::new(self.next_generation()))
            .clone()
    }

    /// Render-ready projection of `key`. Does not create an entry.
    #[must_use]
    pub fn view(&self, key: &DependentQueryKey) -> CollectionView<T> {
        self.entries
            .read()
            .get(key)
            .map_or_else(CollectionView::empty, CollectionView::of)
    }

    /// Append a page fetched at `position`.
    ///
    /// Ignored when the page does not continue from the current last page,
    /// which is what a duplicate completion looks like. Returns true if the
    /// page was appended.
    pub fn append_page(
        &self,
        key: &DependentQueryKey,
        position: Option<Cursor>,
        page: FetchedPage<T>,
    ) -> bool {
        let appended = {
            let mut entries = self.entries.write();
            let state = entries
                .entry(key.clone())
                .or_insert_with(|| CollectionState::new(self.next_generation()));
            push_page(key, state, position, page).is_some()
        };

        if appended {
            self.notify(key, UpdateKind::PageAppended);
        }
        appended
    }

    /// Clear pages, in-flight flag, error and total, and start a new generation.
    ///
    /// Any response still in flight for the old generation will be dropped.
    pub fn reset(&self, key: &DependentQueryKey) {
        {
            let mut entries = self.entries.write();
            let generation = self.next_generation();
            let state = entries
                .entry(key.clone())
                .or_insert_with(|| CollectionState::new(generation));
            state.pages.clear();
            state.is_fetching_next = false;
            state.error = None;
            state.generation = generation;
        }

        debug!(key = %key, "Collection reset");
        self.notify(key, UpdateKind::Reset);
    }

    /// Remove the entry for `key` entirely. Returns true if it existed.
    pub fn evict(&self, key: &DependentQueryKey) -> bool {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            debug!(key = %key, "Collection evicted");
            self.notify(key, UpdateKind::Evicted);
        }
        removed
    }

    /// Deep copy of the pages of `key`, tagged with its current generation.
    pub fn snapshot(&self, key: &DependentQueryKey) -> MutationSnapshot<T> {
        let mut entries = self.entries.write();
        let state = entries
            .entry(key.clone())
            .or_insert_with(|| CollectionState::new(self.next_generation()));
        MutationSnapshot::new(key.clone(), state.pages.clone(), state.generation)
    }

    /// Replace the pages of `key` wholesale.
    pub fn restore(&self, key: &DependentQueryKey, prior_pages: PageSet<T>) {
        {
            let mut entries = self.entries.write();
            let state = entries
                .entry(key.clone())
                .or_insert_with(|| CollectionState::new(self.next_generation()));
            state.pages = prior_pages;
        }
        self.notify(key, UpdateKind::Restored);
    }

    /// Restore a snapshot unless its key was reset or evicted since it was taken.
    ///
    /// Returns true if the pages were replaced.
    pub fn restore_snapshot(&self, snapshot: MutationSnapshot<T>) -> bool {
        let key = snapshot.query_key;
        {
            let mut entries = self.entries.write();
            match entries.get_mut(&key) {
                Some(state) if state.generation == snapshot.generation => {
                    state.pages = snapshot.prior_pages;
                }
                _ => {
                    debug!(
                        key = %key,
                        generation = snapshot.generation,
                        "Snapshot superseded by reset, not restoring"
                    );
                    return false;
                }
            }
        }
        self.notify(&key, UpdateKind::Restored);
        true
    }

    /// Apply `f` to the pages of `key` if it is still at `generation`.
    ///
    /// Returns false without calling `f` when the key has moved on.
    pub fn update_pages<F>(&self, key: &DependentQueryKey, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut PageSet<T>),
    {
        {
            let mut entries = self.entries.write();
            match entries.get_mut(key) {
                Some(state) if state.generation == generation => f(&mut state.pages),
                _ => return false,
            }
        }
        self.notify(key, UpdateKind::Mutated);
        true
    }

    /// Atomically claim the right to fetch the next page of `key`.
    ///
    /// Fails if a request is already in flight or the collection is exhausted.
    pub fn begin_fetch(&self, key: &DependentQueryKey) -> Result<FetchTicket, SkipReason> {
        let ticket = {
            let mut entries = self.entries.write();
            let state = entries
                .entry(key.clone())
                .or_insert_with(|| CollectionState::new(self.next_generation()));

            if state.is_fetching_next {
                return Err(SkipReason::InFlight);
            }
            if state.is_exhausted() {
                return Err(SkipReason::Exhausted);
            }

            state.is_fetching_next = true;
            FetchTicket {
                key: key.clone(),
                generation: state.generation,
                cursor: state.pages.next_cursor().cloned(),
            }
        };

        self.notify(key, UpdateKind::FetchStarted);
        Ok(ticket)
    }

    /// Record the result of a fetch started with [`Self::begin_fetch`].
    ///
    /// Results for a superseded generation are dropped without touching the
    /// current state, since a newer request may already be in flight.
    pub fn complete_fetch(
        &self,
        ticket: FetchTicket,
        result: Result<FetchedPage<T>, FetchError>,
    ) -> FetchOutcome {
        let key = ticket.key;
        let (outcome, kind) = {
            let mut entries = self.entries.write();
            let Some(state) = entries.get_mut(&key) else {
                debug!(key = %key, generation = ticket.generation, "Dropping response for evicted key");
                return FetchOutcome::Stale;
            };
            if state.generation != ticket.generation {
                debug!(
                    key = %key,
                    generation = ticket.generation,
                    current = state.generation,
                    "Dropping stale response"
                );
                return FetchOutcome::Stale;
            }

            state.is_fetching_next = false;
            match result {
                Ok(page) => match push_page(&key, state, ticket.cursor, page) {
                    Some(items) => (
                        FetchOutcome::Appended {
                            items,
                            exhausted: state.is_exhausted(),
                        },
                        UpdateKind::PageAppended,
                    ),
                    None => return FetchOutcome::Stale,
                },
                Err(err) => {
                    state.error = Some(err.clone());
                    (FetchOutcome::Failed(err), UpdateKind::FetchFailed)
                }
            }
        };

        self.notify(&key, kind);
        outcome
    }

    /// Release the in-flight flag of a request that will never complete.
    ///
    /// Used when the fetch future is dropped before its response arrives.
    pub(crate) fn abandon_fetch(&self, ticket: &FetchTicket) {
        let abandoned = {
            let mut entries = self.entries.write();
            match entries.get_mut(&ticket.key) {
                Some(state) if state.generation == ticket.generation && state.is_fetching_next => {
                    state.is_fetching_next = false;
                    true
                }
                _ => false,
            }
        };
        if abandoned {
            debug!(key = %ticket.key, "Fetch abandoned before completion");
        }
    }

    /// All cached keys, in key order.
    #[must_use]
    pub fn keys(&self) -> Vec<DependentQueryKey> {
        let mut keys: Vec<_> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Cached `kind` keys scoped under `parent`, in key order.
    #[must_use]
    pub fn keys_for(&self, kind: &ResourceKind, parent: &ParentId) -> Vec<DependentQueryKey> {
        let mut keys: Vec<_> = self
            .entries
            .read()
            .keys()
            .filter(|key| key.is_child_of(kind, parent))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    #[must_use]
    pub fn contains(&self, key: &DependentQueryKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of cached collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn notify(&self, key: &DependentQueryKey, kind: UpdateKind) {
        // Ignore send errors - no receivers is fine
        if let Some(ref tx) = self.tx {
            let _ = tx.send(CollectionUpdate {
                key: key.clone(),
                kind,
            });
        }
    }
}

/// Push `page` if it continues from the current last page.
///
/// Returns the number of items appended, or `None` for an out-of-position page.
fn push_page<T>(
    key: &DependentQueryKey,
    state: &mut CollectionState<T>,
    position: Option<Cursor>,
    page: FetchedPage<T>,
) -> Option<usize> {
    if !state.pages.accepts(position.as_ref()) {
        debug!(
            key = %key,
            cursor = ?position,
            "Ignoring page that does not continue the collection"
        );
        return None;
    }

    let items = page.items.len();
    if page.total.is_some() {
        state.pages.set_total(page.total);
    }
    state.error = None;
    state
        .pages
        .push(PageCursor::new(position, page.items, page.next_cursor));
    Some(items)
}

impl<T> Default for PaginatedCollectionCache<T>
where
    T: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CascadeTarget for PaginatedCollectionCache<T>
where
    T: Clone + Send + Sync,
{
    fn invalidate_children(
        &self,
        child_kind: &ResourceKind,
        parent: &ParentId,
    ) -> Vec<DependentQueryKey> {
        let keys = self.keys_for(child_kind, parent);
        for key in &keys {
            self.evict(key);
        }
        if !keys.is_empty() {
            info!(
                kind = %child_kind,
                parent = %parent,
                count = keys.len(),
                "Invalidated dependent collections"
            );
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cities() -> DependentQueryKey {
        DependentQueryKey::new("cities").with_parent("province-12")
    }

    fn first_page() -> FetchedPage<u32> {
        FetchedPage::new(vec![1, 2], Some(Cursor::from("p2")))
    }

    #[test]
    fn get_or_create_returns_empty_state() {
        let cache: PaginatedCollectionCache<u32> = PaginatedCollectionCache::new();
        let state = cache.get_or_create(&cities());

        assert!(state.pages.is_empty());
        assert!(!state.is_fetching_next);
        assert!(state.error.is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn view_does_not_create_entries() {
        let cache: PaginatedCollectionCache<u32> = PaginatedCollectionCache::new();
        let view = cache.view(&cities());

        assert!(view.items.is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn append_page_is_idempotent_per_position() {
        let cache = PaginatedCollectionCache::new();
        let key = cities();

        assert!(cache.append_page(&key, None, first_page()));
        assert!(!cache.append_page(&key, None, first_page()));

        let page = FetchedPage::last(vec![3]);
        assert!(cache.append_page(&key, Some(Cursor::from("p2")), page.clone()));
        assert!(!cache.append_page(&key, Some(Cursor::from("p2")), page));

        assert_eq!(cache.view(&key).items, vec![1, 2, 3]);
    }

    #[test]
    fn append_page_records_total() {
        let cache = PaginatedCollectionCache::new();
        let key = cities();

        cache.append_page(&key, None, first_page().with_total(30));
        assert_eq!(cache.view(&key).total, Some(30));

        // A later page without a total keeps the known one.
        cache.append_page(&key, Some(Cursor::from("p2")), FetchedPage::new(vec![3], Some(Cursor::from("p3"))));
        assert_eq!(cache.view(&key).total, Some(30));
    }

    #[test]
    fn begin_fetch_excludes_concurrent_requests() {
        let cache: PaginatedCollectionCache<u32> = PaginatedCollectionCache::new();
        let key = cities();

        let ticket = cache.begin_fetch(&key).unwrap();
        assert!(ticket.cursor.is_none());
        assert_eq!(cache.begin_fetch(&key), Err(SkipReason::InFlight));

        let outcome = cache.complete_fetch(ticket, Ok(first_page()));
        assert_eq!(outcome, FetchOutcome::Appended { items: 2, exhausted: false });

        let ticket = cache.begin_fetch(&key).unwrap();
        assert_eq!(ticket.cursor, Some(Cursor::from("p2")));
    }

    #[test]
    fn failed_fetch_keeps_cursor_retryable() {
        let cache = PaginatedCollectionCache::new();
        let key = cities();
        cache.append_page(&key, None, first_page());

        let ticket = cache.begin_fetch(&key).unwrap();
        let err = FetchError::Transport("timeout".into());
        let outcome = cache.complete_fetch(ticket, Err(err.clone()));

        assert_eq!(outcome, FetchOutcome::Failed(err.clone()));
        let state = cache.get_or_create(&key);
        assert_eq!(state.error, Some(err));
        assert!(!state.is_fetching_next);

        let retry = cache.begin_fetch(&key).unwrap();
        assert_eq!(retry.cursor, Some(Cursor::from("p2")));
        cache.complete_fetch(retry, Ok(FetchedPage::last(vec![3])));
        assert!(cache.get_or_create(&key).error.is_none());
    }

    #[test]
    fn exhausted_collection_refuses_fetch() {
        let cache = PaginatedCollectionCache::new();
        let key = cities();
        cache.append_page(&key, None, FetchedPage::last(vec![1u32]));

        assert_eq!(cache.begin_fetch(&key), Err(SkipReason::Exhausted));

        cache.reset(&key);
        assert!(cache.begin_fetch(&key).is_ok());
    }

    #[test]
    fn reset_discards_in_flight_response() {
        let cache: PaginatedCollectionCache<u32> = PaginatedCollectionCache::new();
        let key = cities();

        let stale = cache.begin_fetch(&key).unwrap();
        cache.reset(&key);
        let fresh = cache.begin_fetch(&key).unwrap();

        assert_eq!(cache.complete_fetch(stale, Ok(first_page())), FetchOutcome::Stale);
        // The newer request is still marked in flight.
        assert!(cache.get_or_create(&key).is_fetching_next);

        assert!(cache.complete_fetch(fresh, Ok(first_page())).is_appended());
        assert_eq!(cache.view(&key).items, vec![1, 2]);
    }

    #[test]
    fn evicted_key_never_reuses_generation() {
        let cache: PaginatedCollectionCache<u32> = PaginatedCollectionCache::new();
        let key = cities();

        let stale = cache.begin_fetch(&key).unwrap();
        assert!(cache.evict(&key));
        let _fresh = cache.begin_fetch(&key).unwrap();

        assert_eq!(cache.complete_fetch(stale, Ok(first_page())), FetchOutcome::Stale);
        assert!(cache.view(&key).items.is_empty());
    }

    #[test]
    fn snapshot_and_restore_replace_wholesale() {
        let cache = PaginatedCollectionCache::new();
        let key = cities();
        cache.append_page(&key, None, first_page().with_total(2));

        let snapshot = cache.snapshot(&key);
        let generation = snapshot.generation;
        assert!(cache.update_pages(&key, generation, |pages| {
            pages.retain(|id| *id != 1);
            pages.adjust_total(-1);
        }));
        assert_eq!(cache.view(&key).items, vec![2]);

        assert!(cache.restore_snapshot(snapshot));
        let view = cache.view(&key);
        assert_eq!(view.items, vec![1, 2]);
        assert_eq!(view.total, Some(2));
    }

    #[test]
    fn restore_snapshot_skips_reset_keys() {
        let cache = PaginatedCollectionCache::new();
        let key = cities();
        cache.append_page(&key, None, first_page());

        let snapshot = cache.snapshot(&key);
        cache.reset(&key);

        assert!(!cache.restore_snapshot(snapshot.clone()));
        assert!(cache.view(&key).items.is_empty());
        assert!(!cache.update_pages(&key, snapshot.generation, |_| {}));

        cache.restore(&key, snapshot.prior_pages);
        assert_eq!(cache.view(&key).items, vec![1, 2]);
    }

    #[test]
    fn keys_for_matches_kind_and_parent() {
        let cache: PaginatedCollectionCache<u32> = PaginatedCollectionCache::new();
        cache.get_or_create(&DependentQueryKey::new("cities").with_parent("province-12"));
        cache.get_or_create(
            &DependentQueryKey::new("cities")
                .with_parent("province-12")
                .with_filter("capital"),
        );
        cache.get_or_create(&DependentQueryKey::new("cities").with_parent("province-13"));
        cache.get_or_create(&DependentQueryKey::new("districts").with_parent("province-12"));

        let keys = cache.keys_for(&"cities".into(), &"province-12".into());
        assert_eq!(keys.len(), 2);

        let removed = cache.invalidate_children(&"cities".into(), &"province-12".into());
        assert_eq!(removed, keys);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn notifications_follow_fetch_lifecycle() {
        let (cache, mut rx) = PaginatedCollectionCache::with_notifications(16);
        let key = cities();

        let ticket = cache.begin_fetch(&key).unwrap();
        cache.complete_fetch(ticket, Ok(first_page()));
        cache.reset(&key);

        let kinds: Vec<_> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .into_iter()
        .map(|update| {
            assert_eq!(update.key, key);
            update.kind
        })
        .collect();

        assert_eq!(
            kinds,
            vec![UpdateKind::FetchStarted, UpdateKind::PageAppended, UpdateKind::Reset]
        );
    }

    #[test]
    fn test_subscribe() {
        let (cache, _rx) = PaginatedCollectionCache::<u32>::with_notifications(16);
        assert!(cache.subscribe().is_some());

        let cache_no_notify = PaginatedCollectionCache::<u32>::new();
        assert!(cache_no_notify.subscribe().is_none());
    }
}
