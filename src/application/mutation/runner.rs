//! Optimistic mutation execution with snapshot rollback.

use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::plan::MutationPlan;
use super::policy::MutationPolicy;
use super::queue::KeyedQueue;
use crate::application::cache::PaginatedCollectionCache;
use crate::domain::{DependentQueryKey, MutationId, MutationSnapshot, PageSet};
use crate::error::MutationError;

/// Applies predicted changes to cached collections before the backend confirms.
///
/// For each run: snapshot every affected key, apply the prediction, call the
/// backend, then either keep the prediction (optionally reconciled with the
/// server result) or restore every snapshot verbatim.
///
/// Under [`MutationPolicy::Serialized`] runs touching the same key are queued
/// FIFO, so a rollback can never overwrite another run's confirmed change.
/// Under [`MutationPolicy::Concurrent`] runs overlap freely and a rollback
/// restores its own snapshot even if a later run changed the key since.
///
/// A key reset or evicted while the backend call is pending is left alone:
/// neither rollback nor reconciliation writes to it.
pub struct OptimisticMutationRunner<T> {
    cache: Arc<PaginatedCollectionCache<T>>,
    policy: MutationPolicy,
    queue: KeyedQueue,
}

impl<T> OptimisticMutationRunner<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(cache: Arc<PaginatedCollectionCache<T>>, policy: MutationPolicy) -> Self {
        Self {
            cache,
            policy,
            queue: KeyedQueue::new(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> MutationPolicy {
        self.policy
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<PaginatedCollectionCache<T>> {
        &self.cache
    }

    /// Run `plan` optimistically around `commit`.
    ///
    /// Returns the server result on success. On failure every affected key
    /// is back to its pre-run pages and the error is returned for the caller
    /// to show; no other cache state is touched.
    pub async fn run<R, C, Fut>(&self, plan: MutationPlan<T, R>, commit: C) -> Result<R, MutationError>
    where
        C: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, MutationError>>,
    {
        let id = MutationId::new();
        let _permit = match self.policy {
            MutationPolicy::Serialized => Some(self.queue.acquire(plan.keys()).await),
            MutationPolicy::Concurrent => None,
        };

        let snapshots: Vec<_> = plan.keys().iter().map(|key| self.cache.snapshot(key)).collect();
        debug!(mutation = %id, keys = snapshots.len(), "Applying optimistic prediction");

        if let Err(reason) = self.apply(&snapshots, |key, pages| plan.predict(key, pages)) {
            warn!(mutation = %id, reason = %reason, "Prediction panicked, rolling back");
            self.rollback(&id, snapshots);
            return Err(MutationError::Prediction(reason));
        }

        let result = match commit().await {
            Ok(result) => result,
            Err(err) => {
                warn!(mutation = %id, error = %err, "Mutation rejected, rolling back");
                self.rollback(&id, snapshots);
                return Err(err);
            }
        };

        if let Some(reconcile) = plan.reconcile() {
            if let Err(reason) = self.apply(&snapshots, |key, pages| reconcile(key, pages, &result)) {
                warn!(mutation = %id, reason = %reason, "Reconciliation panicked, rolling back");
                self.rollback(&id, snapshots);
                return Err(MutationError::Reconcile(reason));
            }
        }

        debug!(mutation = %id, "Mutation committed");
        Ok(result)
    }

    /// Apply `f` to every snapshotted key still at its snapshot generation.
    ///
    /// Returns the panic message if `f` panicked.
    fn apply<F>(&self, snapshots: &[MutationSnapshot<T>], f: F) -> Result<(), String>
    where
        F: Fn(&DependentQueryKey, &mut PageSet<T>),
    {
        for snapshot in snapshots {
            let key = &snapshot.query_key;
            let applied = catch_unwind(AssertUnwindSafe(|| {
                self.cache
                    .update_pages(key, snapshot.generation, |pages| f(key, pages))
            }))
            .map_err(panic_message)?;

            if !applied {
                debug!(key = %key, "Key reset during mutation, leaving it alone");
            }
        }
        Ok(())
    }

    fn rollback(&self, id: &MutationId, snapshots: Vec<MutationSnapshot<T>>) {
        let mut restored = 0;
        for snapshot in snapshots {
            if self.cache.restore_snapshot(snapshot) {
                restored += 1;
            }
        }
        info!(mutation = %id, restored, "Rolled back optimistic mutation");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
