//! How overlapping mutations on the same collection are scheduled.

use serde::Deserialize;

/// Scheduling policy for optimistic mutations that share a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationPolicy {
    /// Runs on the same key wait for each other, first come first served.
    #[default]
    Serialized,
    /// Runs overlap; a late rollback can undo a newer run's change.
    Concurrent,
}
