//! Per-key FIFO serialization for mutations.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::DependentQueryKey;

/// Queues mutations per [`DependentQueryKey`], first come first served.
///
/// A mutation touching several keys waits for all of them. Locks are taken in
/// key order, so two multi-key mutations cannot deadlock on each other.
#[derive(Default)]
pub struct KeyedQueue {
    slots: DashMap<DependentQueryKey, Arc<Mutex<()>>>,
}

impl KeyedQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until every key in `keys` is free, then hold them all.
    ///
    /// `keys` must be sorted and free of duplicates.
    pub async fn acquire<'a>(&'a self, keys: &[DependentQueryKey]) -> KeyedPermit<'a> {
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            let slot = self.slots.entry(key.clone()).or_default().clone();
            guards.push((key.clone(), slot.lock_owned().await));
        }
        KeyedPermit {
            queue: self,
            guards,
        }
    }

    /// Number of keys with a mutation running or waiting.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        self.slots.len()
    }
}

/// Exclusive hold on a set of keys; released on drop.
pub struct KeyedPermit<'a> {
    queue: &'a KeyedQueue,
    guards: Vec<(DependentQueryKey, OwnedMutexGuard<()>)>,
}

impl Drop for KeyedPermit<'_> {
    fn drop(&mut self) {
        for (key, guard) in self.guards.drain(..) {
            drop(guard);
            // Only the map holds the slot now: nobody is running or waiting.
            self.queue
                .slots
                .remove_if(&key, |_, slot| Arc::strong_count(slot) == 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    fn key(name: &str) -> DependentQueryKey {
        DependentQueryKey::new(name)
    }

    #[tokio::test]
    async fn second_acquire_waits_for_release() {
        let queue = KeyedQueue::new();
        let keys = vec![key("notifications")];

        let first = queue.acquire(&keys).await;
        let mut second = Box::pin(queue.acquire(&keys));
        assert!((&mut second).now_or_never().is_none());

        drop(first);
        let _second = second.await;
        assert_eq!(queue.active_keys(), 1);
    }

    #[tokio::test]
    async fn disjoint_keys_do_not_block() {
        let queue = KeyedQueue::new();
        let _a = queue.acquire(&[key("a")]).await;
        let b = queue.acquire(&[key("b")]).now_or_never();
        assert!(b.is_some());
    }

    #[tokio::test]
    async fn slots_are_removed_when_idle() {
        let queue = KeyedQueue::new();
        {
            let _permit = queue.acquire(&[key("a"), key("b")]).await;
            assert_eq!(queue.active_keys(), 2);
        }
        assert_eq!(queue.active_keys(), 0);
    }
}
