//! Page fetching: one request in flight per key, pages appended in cursor order.

pub mod coordinator;

pub use coordinator::FetchCoordinator;
