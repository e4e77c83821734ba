//! Results reported back to callers of the fetch coordinator.

use crate::error::FetchError;

/// Why a fetch request was not issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another request for the same key is still in flight.
    InFlight,
    /// The last page carried no cursor.
    Exhausted,
    /// The load-more sentinel is not visible.
    NotNearEnd,
}

/// What happened to one "fetch next page" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was appended.
    Appended { items: usize, exhausted: bool },
    /// The backend failed; the same cursor stays retryable.
    Failed(FetchError),
    /// No request was made.
    Skipped(SkipReason),
    /// The response arrived after its key was reset or evicted and was dropped.
    Stale,
}

impl FetchOutcome {
    /// Returns true if a page was appended.
    #[must_use]
    pub fn is_appended(&self) -> bool {
        matches!(self, Self::Appended { .. })
    }

    /// Returns true if a network call was actually made.
    #[must_use]
    pub fn was_issued(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}
