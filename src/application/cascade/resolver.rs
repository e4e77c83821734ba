//! Parent-to-child invalidation for dependent collections.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::domain::{DependentQueryKey, ParentId, ResourceKind};
use crate::port::CascadeTarget;

/// A parent selection: which value is picked for which kind.
type Selection = (ResourceKind, ParentId);

#[derive(Default)]
struct CascadeState {
    /// Parent kind -> child kinds, in registration order.
    edges: HashMap<ResourceKind, Vec<ResourceKind>>,
    /// Current value per selection kind.
    selections: HashMap<ResourceKind, ParentId>,
    /// Child selection -> parent selections active when it was made.
    lineage: HashMap<Selection, Vec<Selection>>,
}

/// Keeps dependent collections consistent with parent selection changes.
///
/// Edges are declared once (`province -> city -> district`). Changing or
/// clearing a selection evicts every child collection cached under the old
/// value from every attached cache, clears the child selections made under
/// it, and repeats for their children. All of this happens synchronously
/// inside [`Self::on_parent_changed`], so a fetch issued after the call can
/// only ever land under the new parent.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pagesync::application::cache::PaginatedCollectionCache;
/// use pagesync::application::cascade::CascadeResolver;
/// use pagesync::domain::{DependentQueryKey, FetchedPage};
///
/// let cities = Arc::new(PaginatedCollectionCache::<String>::new());
/// let resolver = CascadeResolver::new();
/// resolver.attach(cities.clone());
/// resolver.register_edge("province", "city");
///
/// resolver.on_parent_changed("province", Some("province-12".into()));
/// let key = DependentQueryKey::new("city").with_parent("province-12");
/// cities.append_page(&key, None, FetchedPage::last(vec!["Bandung".to_string()]));
///
/// let invalidated = resolver.on_parent_changed("province", Some("province-13".into()));
/// assert_eq!(invalidated, vec![key.clone()]);
/// assert!(cities.view(&key).items.is_empty());
/// ```
pub struct CascadeResolver {
    state: Mutex<CascadeState>,
    targets: RwLock<Vec<Arc<dyn CascadeTarget>>>,
}

impl CascadeResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CascadeState::default()),
            targets: RwLock::new(Vec::new()),
        }
    }

    /// Add a cache whose collections follow parent selections.
    pub fn attach(&self, target: Arc<dyn CascadeTarget>) {
        self.targets.write().push(target);
    }

    /// Declare that `child_kind` collections are scoped by `parent_kind` values.
    ///
    /// Returns false if the edge already exists or would close a cycle.
    pub fn register_edge(
        &self,
        parent_kind: impl Into<ResourceKind>,
        child_kind: impl Into<ResourceKind>,
    ) -> bool {
        let parent_kind = parent_kind.into();
        let child_kind = child_kind.into();
        let mut state = self.state.lock();

        if reaches(&state.edges, &child_kind, &parent_kind) {
            warn!(parent = %parent_kind, child = %child_kind, "Ignoring cascade edge that closes a cycle");
            return false;
        }

        let children = state.edges.entry(parent_kind.clone()).or_default();
        if children.contains(&child_kind) {
            return false;
        }
        debug!(parent = %parent_kind, child = %child_kind, "Registered cascade edge");
        children.push(child_kind);
        true
    }

    /// Currently selected value for `kind`.
    #[must_use]
    pub fn selection(&self, kind: impl Into<ResourceKind>) -> Option<ParentId> {
        self.state.lock().selections.get(&kind.into()).cloned()
    }

    /// Record a new value (or no value) for `parent_kind` and invalidate
    /// everything that depended on the previous one.
    ///
    /// Clearing a selection invalidates exactly like changing it. Selecting
    /// the value that is already selected does nothing. Returns the keys that
    /// were evicted, across all attached caches.
    pub fn on_parent_changed(
        &self,
        parent_kind: impl Into<ResourceKind>,
        new_parent: Option<ParentId>,
    ) -> Vec<DependentQueryKey> {
        let kind = parent_kind.into();
        let mut state = self.state.lock();

        let previous = state.selections.get(&kind).cloned();
        if previous == new_parent {
            return Vec::new();
        }

        match &new_parent {
            Some(value) => {
                let parents = parent_selections(&state, &kind);
                state.lineage.insert((kind.clone(), value.clone()), parents);
                state.selections.insert(kind.clone(), value.clone());
            }
            None => {
                state.selections.remove(&kind);
            }
        }

        let mut invalidated = Vec::new();
        if let Some(previous) = previous {
            state.lineage.remove(&(kind.clone(), previous.clone()));
            let targets = self.targets.read();
            invalidate(&mut state, &targets, &kind, &previous, &mut invalidated);
        }

        info!(
            kind = %kind,
            parent = ?new_parent,
            invalidated = invalidated.len(),
            "Parent selection changed"
        );
        invalidated
    }
}

impl Default for CascadeResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Selections of every registered parent kind of `kind`.
fn parent_selections(state: &CascadeState, kind: &ResourceKind) -> Vec<Selection> {
    state
        .edges
        .iter()
        .filter(|(_, children)| children.contains(kind))
        .filter_map(|(parent, _)| {
            state
                .selections
                .get(parent)
                .map(|value| (parent.clone(), value.clone()))
        })
        .collect()
}

/// Evict children of `kind = value`, then recurse into child selections made under it.
fn invalidate(
    state: &mut CascadeState,
    targets: &[Arc<dyn CascadeTarget>],
    kind: &ResourceKind,
    value: &ParentId,
    invalidated: &mut Vec<DependentQueryKey>,
) {
    let children = state.edges.get(kind).cloned().unwrap_or_default();
    let origin = (kind.clone(), value.clone());

    for child in &children {
        for target in targets {
            invalidated.extend(target.invalidate_children(child, value));
        }

        let mut descendants: HashSet<ParentId> = state
            .lineage
            .iter()
            .filter(|((child_kind, _), parents)| child_kind == child && parents.contains(&origin))
            .map(|((_, child_value), _)| child_value.clone())
            .collect();
        // The current child selection goes with its parent even if it was made
        // before the parent was recorded.
        if let Some(current) = state.selections.remove(child) {
            descendants.insert(current);
        }

        let mut descendants: Vec<_> = descendants.into_iter().collect();
        descendants.sort();
        for descendant in descendants {
            state.lineage.remove(&(child.clone(), descendant.clone()));
            invalidate(state, targets, child, &descendant, invalidated);
        }
    }
}

/// Returns true if `to` is reachable from `from` along registered edges.
fn reaches(
    edges: &HashMap<ResourceKind, Vec<ResourceKind>>,
    from: &ResourceKind,
    to: &ResourceKind,
) -> bool {
    let mut stack = vec![from];
    let mut seen = HashSet::new();
    while let Some(kind) = stack.pop() {
        if kind == to {
            return true;
        }
        if !seen.insert(kind) {
            continue;
        }
        if let Some(children) = edges.get(kind) {
            stack.extend(children.iter());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cache::PaginatedCollectionCache;
    use crate::domain::FetchedPage;

    fn regions() -> (CascadeResolver, Arc<PaginatedCollectionCache<u32>>) {
        let cache = Arc::new(PaginatedCollectionCache::new());
        let resolver = CascadeResolver::new();
        resolver.attach(cache.clone());
        assert!(resolver.register_edge("province", "city"));
        assert!(resolver.register_edge("city", "district"));
        (resolver, cache)
    }

    fn load(cache: &PaginatedCollectionCache<u32>, key: &DependentQueryKey) {
        cache.append_page(key, None, FetchedPage::last(vec![1, 2]));
    }

    #[test]
    fn rejects_duplicate_and_cyclic_edges() {
        let (resolver, _) = regions();
        assert!(!resolver.register_edge("province", "city"));
        assert!(!resolver.register_edge("district", "province"));
        assert!(!resolver.register_edge("city", "city"));
        assert!(resolver.register_edge("jenjang", "fase"));
    }

    #[test]
    fn changing_parent_evicts_children_and_grandchildren() {
        let (resolver, cache) = regions();
        let cities = DependentQueryKey::new("city").with_parent("p-12");
        let districts = DependentQueryKey::new("district").with_parent("c-3");

        resolver.on_parent_changed("province", Some("p-12".into()));
        load(&cache, &cities);
        resolver.on_parent_changed("city", Some("c-3".into()));
        load(&cache, &districts);

        let invalidated = resolver.on_parent_changed("province", Some("p-13".into()));

        assert_eq!(invalidated, vec![cities.clone(), districts.clone()]);
        assert!(!cache.contains(&cities));
        assert!(!cache.contains(&districts));
        assert_eq!(resolver.selection("city"), None);
        assert_eq!(resolver.selection("province"), Some("p-13".into()));
    }

    #[test]
    fn grandchildren_of_earlier_child_selections_are_evicted() {
        let (resolver, cache) = regions();
        let districts_a = DependentQueryKey::new("district").with_parent("c-1");
        let districts_b = DependentQueryKey::new("district").with_parent("c-2");

        resolver.on_parent_changed("province", Some("p-12".into()));
        resolver.on_parent_changed("city", Some("c-1".into()));
        load(&cache, &districts_a);
        // Switching city evicts districts of c-1 right away.
        assert_eq!(
            resolver.on_parent_changed("city", Some("c-2".into())),
            vec![districts_a.clone()]
        );
        load(&cache, &districts_b);

        let invalidated = resolver.on_parent_changed("province", None);
        assert_eq!(invalidated, vec![districts_b]);
        assert!(cache.is_empty());
    }

    #[test]
    fn clearing_is_not_a_no_op() {
        let (resolver, cache) = regions();
        let cities = DependentQueryKey::new("city").with_parent("p-12");

        resolver.on_parent_changed("province", Some("p-12".into()));
        load(&cache, &cities);

        assert_eq!(resolver.on_parent_changed("province", None), vec![cities.clone()]);
        assert!(!cache.contains(&cities));
        assert_eq!(resolver.selection("province"), None);
    }

    #[test]
    fn reselecting_same_value_keeps_children() {
        let (resolver, cache) = regions();
        let cities = DependentQueryKey::new("city").with_parent("p-12");

        resolver.on_parent_changed("province", Some("p-12".into()));
        load(&cache, &cities);

        assert!(resolver.on_parent_changed("province", Some("p-12".into())).is_empty());
        assert_eq!(cache.view(&cities).items, vec![1, 2]);
    }

    #[test]
    fn unrelated_collections_survive() {
        let (resolver, cache) = regions();
        let other_province = DependentQueryKey::new("city").with_parent("p-99");
        let notifications = DependentQueryKey::new("notifications");
        load(&cache, &other_province);
        load(&cache, &notifications);

        resolver.on_parent_changed("province", Some("p-12".into()));
        resolver.on_parent_changed("province", Some("p-13".into()));

        assert!(cache.contains(&other_province));
        assert!(cache.contains(&notifications));
    }

    #[test]
    fn invalidates_every_attached_cache() {
        let (resolver, cities) = regions();
        let districts = Arc::new(PaginatedCollectionCache::<String>::new());
        resolver.attach(districts.clone());

        let district_key = DependentQueryKey::new("district").with_parent("c-3");
        resolver.on_parent_changed("city", Some("c-3".into()));
        districts.append_page(&district_key, None, FetchedPage::last(vec!["Coblong".to_string()]));
        load(&cities, &DependentQueryKey::new("city").with_parent("p-1"));

        resolver.on_parent_changed("city", None);

        assert!(!districts.contains(&district_key));
        assert_eq!(cities.len(), 1);
    }
}
