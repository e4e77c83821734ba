//! Optimistic mutations: predict locally, confirm remotely, roll back on failure.

pub mod plan;
pub mod policy;
pub mod queue;
pub mod runner;
pub mod trigger;

pub use plan::MutationPlan;
pub use policy::MutationPolicy;
pub use queue::{KeyedPermit, KeyedQueue};
pub use runner::OptimisticMutationRunner;
pub use trigger::MutationTrigger;
