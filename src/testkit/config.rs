//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use crate::application::mutation::MutationPolicy;
use crate::infrastructure::config::sync::SyncConfig;

/// Notifications on, mutations queued per key.
pub fn serialized() -> SyncConfig {
    SyncConfig {
        notification_capacity: 64,
        mutation_policy: MutationPolicy::Serialized,
    }
}

/// Notifications on, mutations allowed to overlap.
pub fn concurrent() -> SyncConfig {
    SyncConfig {
        notification_capacity: 64,
        mutation_policy: MutationPolicy::Concurrent,
    }
}

/// Notifications off.
pub fn silent() -> SyncConfig {
    SyncConfig {
        notification_capacity: 0,
        ..serialized()
    }
}
