//! Description of one optimistic mutation: which collections it touches and
//! how their pages are expected to change.

use crate::domain::{DependentQueryKey, PageSet};

type Predict<T> = Box<dyn Fn(&DependentQueryKey, &mut PageSet<T>) + Send + Sync>;
type Reconcile<T, R> = Box<dyn Fn(&DependentQueryKey, &mut PageSet<T>, &R) + Send + Sync>;

/// Keys plus the local prediction (and optional reconciliation) for a mutation.
///
/// `predict` runs once per affected key before the backend is called;
/// `reconcile` runs once per key after the backend confirmed, with the server
/// result. Both must be pure; a panic inside either is treated like a
/// rejected commit and rolls every key back.
///
/// # Example
///
/// ```
/// use pagesync::application::mutation::MutationPlan;
/// use pagesync::domain::DependentQueryKey;
///
/// let key = DependentQueryKey::new("notifications");
/// let plan = MutationPlan::<u32, ()>::remove(vec![key], |id| *id == 7);
/// assert_eq!(plan.keys().len(), 1);
/// ```
pub struct MutationPlan<T, R> {
    keys: Vec<DependentQueryKey>,
    predict: Predict<T>,
    reconcile: Option<Reconcile<T, R>>,
}

impl<T, R> MutationPlan<T, R> {
    /// Create a plan applying `predict` to every key in `keys`.
    ///
    /// Duplicate keys are collapsed so a key is predicted and snapshotted once.
    pub fn new<K, P>(keys: K, predict: P) -> Self
    where
        K: IntoIterator<Item = DependentQueryKey>,
        P: Fn(&DependentQueryKey, &mut PageSet<T>) + Send + Sync + 'static,
    {
        let mut keys: Vec<_> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();
        Self {
            keys,
            predict: Box::new(predict),
            reconcile: None,
        }
    }

    /// Replace the optimistic state with server truth once the commit succeeds.
    #[must_use]
    pub fn with_reconcile<F>(mut self, reconcile: F) -> Self
    where
        F: Fn(&DependentQueryKey, &mut PageSet<T>, &R) + Send + Sync + 'static,
    {
        self.reconcile = Some(Box::new(reconcile));
        self
    }

    #[must_use]
    pub fn keys(&self) -> &[DependentQueryKey] {
        &self.keys
    }

    pub(crate) fn predict(&self, key: &DependentQueryKey, pages: &mut PageSet<T>) {
        (self.predict)(key, pages);
    }

    pub(crate) fn reconcile(&self) -> Option<&(dyn Fn(&DependentQueryKey, &mut PageSet<T>, &R) + Send + Sync)> {
        self.reconcile.as_deref()
    }
}

impl<T: 'static, R> MutationPlan<T, R> {
    /// Predict removal of every item matching `matches`, decrementing totals.
    pub fn remove<K, M>(keys: K, matches: M) -> Self
    where
        K: IntoIterator<Item = DependentQueryKey>,
        M: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::new(keys, move |_, pages| {
            let before = pages.item_count();
            pages.retain(|item| !matches(item));
            let removed = before - pages.item_count();
            pages.adjust_total(-(removed as i64));
        })
    }

    /// Predict an in-place change to every item matching `matches`.
    pub fn update<K, M, U>(keys: K, matches: M, update: U) -> Self
    where
        K: IntoIterator<Item = DependentQueryKey>,
        M: Fn(&T) -> bool + Send + Sync + 'static,
        U: Fn(&mut T) + Send + Sync + 'static,
    {
        Self::new(keys, move |_, pages| {
            pages.map_items(|item| {
                if matches(item) {
                    update(item);
                }
            });
        })
    }
}
