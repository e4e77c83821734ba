//! Pagesync - client-side synchronization for paginated REST collections.
//!
//! Keeps locally cached, cursor-paginated lists consistent with a backend
//! while the user scrolls, mutates items and changes parent selections.
//!
//! # Architecture
//!
//! - **`domain`** - Keys, cursors, page sets and collection state
//! - **`port`** - Seams to the outside: [`port::PageSource`], [`port::CascadeTarget`]
//! - **`application`** - The stateful components
//!   - `PaginatedCollectionCache` - Pages per key, generations, notifications
//!   - `FetchCoordinator` - One next-page request in flight per key
//!   - `OptimisticMutationRunner` - Predict, commit, reconcile or roll back
//!   - `CascadeResolver` - Parent change evicts dependent collections
//! - **`infrastructure`** - Configuration, logging and wiring
//!
//! # Modules
//!
//! - [`domain`] - Value types shared by every component
//! - [`error`] - Error types for the crate
//! - [`port`] - Trait definitions
//! - [`application`] - Cache, fetch, mutation and cascade components
//! - [`infrastructure`] - Config loading and the [`infrastructure::bootstrap::SyncLayer`]
//!
//! # Features
//!
//! - `testkit` - Expose mock page sources and builders for integration tests
//!
//! # Example
//!
//! ```
//! use pagesync::domain::{DependentQueryKey, FetchedPage};
//! use pagesync::infrastructure::bootstrap::SyncLayer;
//! use pagesync::infrastructure::config::sync::SyncConfig;
//!
//! # tokio_test::block_on(async {
//! let (layer, _updates) = SyncLayer::<u32>::build(&SyncConfig::default());
//! let key = DependentQueryKey::new("city").with_parent("province-12");
//!
//! layer
//!     .fetch()
//!     .request_next_page(&key, |_cursor| async { Ok(FetchedPage::last(vec![1, 2])) })
//!     .await;
//! assert_eq!(layer.view(&key).items, vec![1, 2]);
//! # });
//! ```

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
