//! Invalidation port used by cascade resolution.

use crate::domain::{DependentQueryKey, ParentId, ResourceKind};

/// A store holding collections that depend on parent selections.
///
/// The cascade resolver is not generic over record types, so every cache it
/// manages is reached through this object-safe trait.
pub trait CascadeTarget: Send + Sync {
    /// Drop every `child_kind` collection scoped under `parent`.
    ///
    /// Returns the keys that were invalidated. Must complete synchronously so
    /// no fetch for the new parent can start before the old pages are gone.
    fn invalidate_children(
        &self,
        child_kind: &ResourceKind,
        parent: &ParentId,
    ) -> Vec<DependentQueryKey>;
}
