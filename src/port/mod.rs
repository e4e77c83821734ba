//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams where the synchronization layer meets its external
//! collaborators: the REST backend that serves pages, and the caches that a
//! parent selection change has to invalidate.
//!
//! ```text
//!     ┌────────────┐   fetch_page    ┌──────────────────────┐
//!     │  Backend   │◄────────────────┤   FetchCoordinator   │
//!     │ PageSource │                 └──────────┬───────────┘
//!     └────────────┘                            │
//!                                    ┌──────────▼───────────┐
//!     ┌────────────┐   invalidate    │ PaginatedCollection  │
//!     │  Cascade   ├────────────────►│ Cache (CascadeTarget)│
//!     │  Resolver  │                 └──────────────────────┘
//!     └────────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`PageSource`] - Backend fetch function for one paginated resource
//! - [`CascadeTarget`] - Collections that can be invalidated by parent changes

mod cascade;
mod source;

pub use cascade::CascadeTarget;
pub use source::PageSource;
