//! Composite cache key for dependent paginated collections.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{FilterId, ParentId, ResourceKind};

/// Identifies one cached paginated collection.
///
/// Equality is structural: two keys address the same entry exactly when kind,
/// parent and filter all match. Changing any component means a different
/// collection with its own pages and cursor.
///
/// # Example
///
/// ```
/// use pagesync::domain::DependentQueryKey;
///
/// let cities = DependentQueryKey::new("cities").with_parent("province-12");
/// assert_eq!(cities.to_string(), "cities/province-12");
/// assert!(cities.filter_id().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependentQueryKey {
    resource_kind: ResourceKind,
    parent_id: Option<ParentId>,
    filter_id: Option<FilterId>,
}

impl DependentQueryKey {
    /// Create a key for a top-level resource with no parent or filter.
    pub fn new(resource_kind: impl Into<ResourceKind>) -> Self {
        Self {
            resource_kind: resource_kind.into(),
            parent_id: None,
            filter_id: None,
        }
    }

    /// Scope the key under a parent selection.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<ParentId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Add a filter discriminator.
    #[must_use]
    pub fn with_filter(mut self, filter_id: impl Into<FilterId>) -> Self {
        self.filter_id = Some(filter_id.into());
        self
    }

    #[must_use]
    pub fn resource_kind(&self) -> &ResourceKind {
        &self.resource_kind
    }

    #[must_use]
    pub fn parent_id(&self) -> Option<&ParentId> {
        self.parent_id.as_ref()
    }

    #[must_use]
    pub fn filter_id(&self) -> Option<&FilterId> {
        self.filter_id.as_ref()
    }

    /// Returns true if this key is a `kind` collection scoped under `parent`.
    #[must_use]
    pub fn is_child_of(&self, kind: &ResourceKind, parent: &ParentId) -> bool {
        &self.resource_kind == kind && self.parent_id.as_ref() == Some(parent)
    }
}

impl fmt::Display for DependentQueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource_kind)?;
        if let Some(parent) = &self.parent_id {
            write!(f, "/{parent}")?;
        }
        if let Some(filter) = &self.filter_id {
            write!(f, "?{filter}")?;
        }
        Ok(())
    }
}
