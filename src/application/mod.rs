//! Application layer.
//!
//! The four stateful components of the synchronization layer. Each works on
//! a shared [`cache::PaginatedCollectionCache`] and talks to the backend only
//! through caller-supplied futures or a [`PageSource`](crate::port::PageSource).
//!
//! - [`cache`] - Pages per query key, generations, notifications
//! - [`fetch`] - Single-flight next-page requests
//! - [`mutation`] - Optimistic updates with rollback
//! - [`cascade`] - Parent-change invalidation of dependent collections

pub mod cache;
pub mod cascade;
pub mod fetch;
pub mod mutation;
