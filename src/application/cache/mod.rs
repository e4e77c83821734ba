//! Runtime caches used by the synchronization components.
//!
//! - [`collection::PaginatedCollectionCache`]: fetched pages per
//!   [`DependentQueryKey`](crate::domain::DependentQueryKey) with optional
//!   update notifications

pub mod collection;

pub use collection::{CollectionUpdate, PaginatedCollectionCache, UpdateKind};
