//! Callable handle that UI elements invoke to start a mutation.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::plan::MutationPlan;
use super::runner::OptimisticMutationRunner;
use crate::error::MutationError;

type PlanFn<T, P, R> = Box<dyn Fn(&P) -> MutationPlan<T, R> + Send + Sync>;
type CommitFn<P, R> = Box<dyn Fn(P) -> BoxFuture<'static, Result<R, MutationError>> + Send + Sync>;

/// A mutation bound to its plan and backend call, parameterized by `P`.
///
/// `P` carries whatever identifies the target, typically an item id. The same
/// trigger can be invoked any number of times; each invocation is an
/// independent optimistic run.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pagesync::application::cache::PaginatedCollectionCache;
/// use pagesync::application::mutation::{
///     MutationPlan, MutationPolicy, MutationTrigger, OptimisticMutationRunner,
/// };
/// use pagesync::domain::{DependentQueryKey, FetchedPage};
///
/// # tokio_test::block_on(async {
/// let key = DependentQueryKey::new("liked-books");
/// let cache = Arc::new(PaginatedCollectionCache::<u32>::new());
/// cache.append_page(&key, None, FetchedPage::last(vec![1, 2, 3]));
///
/// let runner = Arc::new(OptimisticMutationRunner::new(cache.clone(), MutationPolicy::Serialized));
/// let unlike = MutationTrigger::new(
///     runner,
///     {
///         let key = key.clone();
///         move |book: &u32| {
///             let book = *book;
///             MutationPlan::remove(vec![key.clone()], move |id: &u32| *id == book)
///         }
///     },
///     |_book: u32| async { Ok(()) },
/// );
///
/// unlike.invoke(2).await.unwrap();
/// assert_eq!(cache.view(&key).items, vec![1, 3]);
/// # });
/// ```
pub struct MutationTrigger<T, P, R> {
    runner: Arc<OptimisticMutationRunner<T>>,
    plan: PlanFn<T, P, R>,
    commit: CommitFn<P, R>,
}

impl<T, P, R> MutationTrigger<T, P, R>
where
    T: Clone + Send + Sync,
{
    pub fn new<Pl, C, Fut>(runner: Arc<OptimisticMutationRunner<T>>, plan: Pl, commit: C) -> Self
    where
        Pl: Fn(&P) -> MutationPlan<T, R> + Send + Sync + 'static,
        C: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, MutationError>> + Send + 'static,
    {
        Self {
            runner,
            plan: Box::new(plan),
            commit: Box::new(move |params| commit(params).boxed()),
        }
    }

    /// Run the mutation for `params`.
    pub async fn invoke(&self, params: P) -> Result<R, MutationError> {
        let plan = (self.plan)(&params);
        let commit = (self.commit)(params);
        self.runner.run(plan, move || commit).await
    }
}
