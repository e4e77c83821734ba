//! Per-key collection state and its read projection.

use serde::Serialize;

use super::id::Cursor;
use super::key::DependentQueryKey;
use super::page::PageSet;
use crate::error::FetchError;

/// Pagination phase of one collection.
///
/// `Idle -> Fetching -> Idle` on every completed request, `Idle -> Exhausted`
/// once a terminal page lands. Only a reset leaves `Exhausted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPhase {
    Idle,
    Fetching,
    Exhausted,
}

/// Everything cached for one [`DependentQueryKey`].
#[derive(Debug, Clone)]
pub struct CollectionState<T> {
    pub pages: PageSet<T>,
    /// True exactly while a page request for this key is in flight.
    pub is_fetching_next: bool,
    /// Last fetch failure; cleared by the next successful page.
    pub error: Option<FetchError>,
    /// Bumped on every reset so late responses can be recognised.
    pub generation: u64,
}

impl<T> CollectionState<T> {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            pages: PageSet::new(),
            is_fetching_next: false,
            error: None,
            generation,
        }
    }

    #[must_use]
    pub fn phase(&self) -> FetchPhase {
        if self.is_fetching_next {
            FetchPhase::Fetching
        } else if self.pages.is_exhausted() {
            FetchPhase::Exhausted
        } else {
            FetchPhase::Idle
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pages.is_exhausted()
    }

    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.pages.total()
    }
}

/// Permission to fetch one page, handed out while no other request runs.
///
/// Carries the generation it was issued under so the response can be
/// discarded if the key was reset in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: DependentQueryKey,
    pub generation: u64,
    pub cursor: Option<Cursor>,
}

/// Flattened, render-ready view of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionView<T> {
    pub items: Vec<T>,
    pub is_fetching_next: bool,
    pub error: Option<String>,
    pub total: Option<u64>,
    pub phase: FetchPhase,
}

impl<T: Clone> CollectionView<T> {
    pub(crate) fn of(state: &CollectionState<T>) -> Self {
        Self {
            items: state.pages.flatten(),
            is_fetching_next: state.is_fetching_next,
            error: state.error.as_ref().map(ToString::to_string),
            total: state.pages.total(),
            phase: state.phase(),
        }
    }

    /// Empty view for a key that has never been fetched.
    pub(crate) fn empty() -> Self {
        Self {
            items: Vec::new(),
            is_fetching_next: false,
            error: None,
            total: None,
            phase: FetchPhase::Idle,
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.phase == FetchPhase::Exhausted
    }
}
