//! Composition root wiring the synchronization components together.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::application::cache::{CollectionUpdate, PaginatedCollectionCache};
use crate::application::cascade::CascadeResolver;
use crate::application::fetch::FetchCoordinator;
use crate::application::mutation::OptimisticMutationRunner;
use crate::domain::{CollectionView, DependentQueryKey};
use crate::infrastructure::config::sync::SyncConfig;

/// One cache plus the coordinator and mutation runner sharing it.
///
/// Build one per item type. Several layers can be attached to the same
/// [`CascadeResolver`] so a parent change reaches all of them.
pub struct SyncLayer<T> {
    cache: Arc<PaginatedCollectionCache<T>>,
    fetch: FetchCoordinator<T>,
    mutations: Arc<OptimisticMutationRunner<T>>,
}

impl<T> SyncLayer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Build a layer from configuration.
    ///
    /// The returned receiver is `Some` when notifications are enabled.
    pub fn build(config: &SyncConfig) -> (Self, Option<broadcast::Receiver<CollectionUpdate>>) {
        let (cache, rx) = if config.notifications_enabled() {
            let (cache, rx) = PaginatedCollectionCache::with_notifications(config.notification_capacity);
            (cache, Some(rx))
        } else {
            (PaginatedCollectionCache::new(), None)
        };
        let cache = Arc::new(cache);

        info!(
            notifications = config.notification_capacity,
            policy = ?config.mutation_policy,
            "Sync layer initialized"
        );

        let layer = Self {
            fetch: FetchCoordinator::new(Arc::clone(&cache)),
            mutations: Arc::new(OptimisticMutationRunner::new(
                Arc::clone(&cache),
                config.mutation_policy,
            )),
            cache,
        };
        (layer, rx)
    }

    /// Have `resolver` evict this layer's dependent collections.
    pub fn attach_to(&self, resolver: &CascadeResolver) {
        resolver.attach(self.cache.clone());
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<PaginatedCollectionCache<T>> {
        &self.cache
    }

    #[must_use]
    pub fn fetch(&self) -> &FetchCoordinator<T> {
        &self.fetch
    }

    #[must_use]
    pub fn mutations(&self) -> &Arc<OptimisticMutationRunner<T>> {
        &self.mutations
    }

    #[must_use]
    pub fn view(&self, key: &DependentQueryKey) -> CollectionView<T> {
        self.cache.view(key)
    }
}
