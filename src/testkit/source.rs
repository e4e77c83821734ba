//! Mock [`PageSource`] implementations for testing.
//!
//! - [`ScriptedSource`] — Pre-loaded responses per cursor, optional delays.
//!   Best for: page ordering, retry after failure, exhaustion.
//!
//! - [`GatedSource`] — Every request blocks until the test releases it.
//!   Best for: in-flight exclusion, stale responses, cascade ordering.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::domain::{Cursor, DependentQueryKey, FetchedPage};
use crate::error::FetchError;
use crate::port::PageSource;

type PageResult<T> = Result<FetchedPage<T>, FetchError>;

// ---------------------------------------------------------------------------
// ScriptedSource
// ---------------------------------------------------------------------------

/// A mock source answering from scripted responses keyed by cursor.
///
/// Responses for a cursor are served in order; the last one repeats once
/// the queue is down to it. Unscripted cursors answer with a 404.
pub struct ScriptedSource<T> {
    responses: Mutex<HashMap<Option<Cursor>, VecDeque<PageResult<T>>>>,
    delays: HashMap<Option<Cursor>, Duration>,
    requested: Mutex<Vec<Option<Cursor>>>,
    call_count: Arc<AtomicU32>,
}

impl<T: Clone> ScriptedSource<T> {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            delays: HashMap::new(),
            requested: Mutex::new(Vec::new()),
            call_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Script a successful page for `cursor` (`None` = first page).
    pub fn with_page(self, cursor: Option<&str>, page: FetchedPage<T>) -> Self {
        self.with_result(cursor, Ok(page))
    }

    /// Script a failure for `cursor`.
    pub fn with_error(self, cursor: Option<&str>, error: FetchError) -> Self {
        self.with_result(cursor, Err(error))
    }

    pub fn with_result(self, cursor: Option<&str>, result: PageResult<T>) -> Self {
        self.responses
            .lock()
            .entry(cursor.map(Cursor::from))
            .or_default()
            .push_back(result);
        self
    }

    /// Delay every answer for `cursor` by `delay`.
    pub fn with_delay(mut self, cursor: Option<&str>, delay: Duration) -> Self {
        self.delays.insert(cursor.map(Cursor::from), delay);
        self
    }

    /// Shared counter for asserting network call counts.
    pub fn counter(&self) -> Arc<AtomicU32> {
        self.call_count.clone()
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Cursors requested so far, in call order.
    pub fn requested_cursors(&self) -> Vec<Option<Cursor>> {
        self.requested.lock().clone()
    }

    fn next_response(&self, cursor: &Option<Cursor>) -> PageResult<T> {
        let mut responses = self.responses.lock();
        match responses.get_mut(cursor) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| not_found(cursor)),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| not_found(cursor)),
            None => not_found(cursor),
        }
    }
}

impl<T: Clone> Default for ScriptedSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found<T>(cursor: &Option<Cursor>) -> PageResult<T> {
    Err(FetchError::Backend {
        status: 404,
        message: format!("no page scripted for cursor {cursor:?}"),
    })
}

#[async_trait]
impl<T> PageSource<T> for ScriptedSource<T>
where
    T: Clone + Send + Sync,
{
    async fn fetch_page(
        &self,
        _key: &DependentQueryKey,
        cursor: Option<Cursor>,
    ) -> PageResult<T> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(cursor.clone());

        if let Some(delay) = self.delays.get(&cursor) {
            tokio::time::sleep(*delay).await;
        }
        self.next_response(&cursor)
    }
}

// ---------------------------------------------------------------------------
// GatedSource
// ---------------------------------------------------------------------------

/// A request parked inside a [`GatedSource`].
struct Parked<T> {
    key: DependentQueryKey,
    cursor: Option<Cursor>,
    tx: oneshot::Sender<PageResult<T>>,
}

/// A mock source whose requests stay pending until released by the test.
///
/// Releasing out of arrival order (see [`Self::release_latest`]) simulates a
/// transport that reorders responses.
pub struct GatedSource<T> {
    parked: Mutex<VecDeque<Parked<T>>>,
    call_count: Arc<AtomicU32>,
}

impl<T> GatedSource<T> {
    pub fn new() -> Self {
        Self {
            parked: Mutex::new(VecDeque::new()),
            call_count: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Number of requests waiting for a response.
    pub fn pending(&self) -> usize {
        self.parked.lock().len()
    }

    /// Keys and cursors of the waiting requests, oldest first.
    pub fn pending_requests(&self) -> Vec<(DependentQueryKey, Option<Cursor>)> {
        self.parked
            .lock()
            .iter()
            .map(|p| (p.key.clone(), p.cursor.clone()))
            .collect()
    }

    /// Answer the oldest waiting request. Returns false if none was waiting.
    pub fn release_next(&self, result: PageResult<T>) -> bool {
        let parked = self.parked.lock().pop_front();
        Self::answer(parked, result)
    }

    /// Answer the newest waiting request. Returns false if none was waiting.
    pub fn release_latest(&self, result: PageResult<T>) -> bool {
        let parked = self.parked.lock().pop_back();
        Self::answer(parked, result)
    }

    /// Answer the oldest waiting request for `key`.
    pub fn release_for(&self, key: &DependentQueryKey, result: PageResult<T>) -> bool {
        let parked = {
            let mut queue = self.parked.lock();
            queue
                .iter()
                .position(|p| &p.key == key)
                .and_then(|idx| queue.remove(idx))
        };
        Self::answer(parked, result)
    }

    fn answer(parked: Option<Parked<T>>, result: PageResult<T>) -> bool {
        match parked {
            Some(parked) => parked.tx.send(result).is_ok(),
            None => false,
        }
    }
}

impl<T> Default for GatedSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> PageSource<T> for GatedSource<T>
where
    T: Send + Sync,
{
    async fn fetch_page(
        &self,
        key: &DependentQueryKey,
        cursor: Option<Cursor>,
    ) -> PageResult<T> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.parked.lock().push_back(Parked {
            key: key.clone(),
            cursor,
            tx,
        });

        rx.await
            .unwrap_or_else(|_| Err(FetchError::Transport("gate closed".into())))
    }
}
