//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for keys, pages and a small
//! [`Notification`] item type so tests focus on assertions rather than
//! construction boilerplate.

use serde::Serialize;

use crate::domain::{Cursor, DependentQueryKey, FetchedPage};

/// A notification as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub read: bool,
}

impl Notification {
    pub fn unread(id: u64) -> Self {
        Self { id, read: false }
    }
}

/// Unread notifications with the given ids.
pub fn notifications(ids: &[u64]) -> Vec<Notification> {
    ids.iter().copied().map(Notification::unread).collect()
}

/// Key of the notification list, optionally filtered.
pub fn notifications_key(filter: Option<&str>) -> DependentQueryKey {
    let key = DependentQueryKey::new("notifications");
    match filter {
        Some(filter) => key.with_filter(filter),
        None => key,
    }
}

/// Key of the city list of `province`.
pub fn cities_of(province: &str) -> DependentQueryKey {
    DependentQueryKey::new("city").with_parent(province)
}

/// Key of the district list of `city`.
pub fn districts_of(city: &str) -> DependentQueryKey {
    DependentQueryKey::new("district").with_parent(city)
}

/// Page followed by `next`.
pub fn page<T>(items: Vec<T>, next: &str) -> FetchedPage<T> {
    FetchedPage::new(items, Some(Cursor::from(next)))
}

/// Final page.
pub fn last_page<T>(items: Vec<T>) -> FetchedPage<T> {
    FetchedPage::last(items)
}

/// Shorthand for `Some(Cursor::from(s))`.
pub fn cursor(s: &str) -> Option<Cursor> {
    Some(Cursor::from(s))
}
