//! Settings for the synchronization components.

use serde::Deserialize;

use crate::application::mutation::MutationPolicy;

/// Largest accepted broadcast capacity for collection notifications.
pub const MAX_NOTIFICATION_CAPACITY: usize = 65_536;

/// Synchronization layer configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Capacity of the collection update channel; 0 disables notifications.
    pub notification_capacity: usize,
    /// How overlapping mutations on one collection are scheduled.
    pub mutation_policy: MutationPolicy,
}

impl SyncConfig {
    /// Returns true if caches should broadcast update notifications.
    #[must_use]
    pub fn notifications_enabled(&self) -> bool {
        self.notification_capacity > 0
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            notification_capacity: 256,
            mutation_policy: MutationPolicy::Serialized,
        }
    }
}
