//! Pre-mutation copies of collection pages.

use super::key::DependentQueryKey;
use super::page::PageSet;

/// Deep copy of one collection taken right before an optimistic prediction.
///
/// Restoring it replaces the pages wholesale; nothing is merged.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationSnapshot<T> {
    pub query_key: DependentQueryKey,
    pub prior_pages: PageSet<T>,
    /// Generation of the key when the copy was taken.
    pub generation: u64,
}

impl<T> MutationSnapshot<T> {
    pub fn new(query_key: DependentQueryKey, prior_pages: PageSet<T>, generation: u64) -> Self {
        Self {
            query_key,
            prior_pages,
            generation,
        }
    }
}
