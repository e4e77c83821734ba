//! Value types shared by every synchronization component.

pub mod id;
pub mod key;
pub mod outcome;
pub mod page;
pub mod snapshot;
pub mod state;

pub use id::{Cursor, FilterId, MutationId, ParentId, ResourceKind};
pub use key::DependentQueryKey;
pub use outcome::{FetchOutcome, SkipReason};
pub use page::{FetchedPage, PageCursor, PageSet};
pub use snapshot::MutationSnapshot;
pub use state::{CollectionState, CollectionView, FetchPhase, FetchTicket};
