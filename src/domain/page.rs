//! Pages of a paginated resource.

use serde::{Deserialize, Serialize};

use super::id::Cursor;

/// A page exactly as the backend returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedPage<T> {
    pub items: Vec<T>,
    /// Token for the following page; `None` means this was the last one.
    pub next_cursor: Option<Cursor>,
    /// Server-reported total count, for display only.
    pub total: Option<u64>,
}

impl<T> FetchedPage<T> {
    /// Create a page with a continuation cursor.
    pub fn new(items: Vec<T>, next_cursor: Option<Cursor>) -> Self {
        Self {
            items,
            next_cursor,
            total: None,
        }
    }

    /// Create the final page of a resource.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    #[must_use]
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }
}

/// One appended page of a cached collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCursor<T> {
    /// Cursor this page was requested with; `None` for the first page.
    pub position: Option<Cursor>,
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T> PageCursor<T> {
    pub fn new(position: Option<Cursor>, items: Vec<T>, next_cursor: Option<Cursor>) -> Self {
        Self {
            position,
            items,
            next_cursor,
        }
    }

    /// Returns true if no page follows this one.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Ordered pages of a collection plus its display total.
///
/// This is the unit that optimistic mutations predict against and that
/// snapshots copy, so the helpers here cover the usual prediction shapes:
/// dropping an item, patching an item, and moving a counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSet<T> {
    pages: Vec<PageCursor<T>>,
    total: Option<u64>,
}

impl<T> PageSet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            total: None,
        }
    }

    /// Build a page set from already fetched pages.
    pub fn from_pages(pages: Vec<PageCursor<T>>, total: Option<u64>) -> Self {
        Self { pages, total }
    }

    #[must_use]
    pub fn pages(&self) -> &[PageCursor<T>] {
        &self.pages
    }

    /// Number of pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Number of items across all pages.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    /// Iterate items across pages in page order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }

    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn set_total(&mut self, total: Option<u64>) {
        self.total = total;
    }

    /// Shift the total by `delta`, saturating at zero. No-op without a total.
    pub fn adjust_total(&mut self, delta: i64) {
        if let Some(total) = self.total.as_mut() {
            *total = if delta.is_negative() {
                total.saturating_sub(delta.unsigned_abs())
            } else {
                total.saturating_add(delta.unsigned_abs())
            };
        }
    }

    /// The cursor the next fetch should resume from.
    ///
    /// `None` both before the first page and after the last one; use
    /// [`Self::is_exhausted`] to tell those apart.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.pages.last().and_then(|p| p.next_cursor.as_ref())
    }

    /// Returns true once the last appended page carried no cursor.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pages.last().is_some_and(PageCursor::is_last)
    }

    /// Returns true if a page requested at `position` would land at the end.
    #[must_use]
    pub fn accepts(&self, position: Option<&Cursor>) -> bool {
        match self.pages.last() {
            None => position.is_none(),
            Some(last) => last.next_cursor.is_some() && last.next_cursor.as_ref() == position,
        }
    }

    pub(crate) fn push(&mut self, page: PageCursor<T>) {
        self.pages.push(page);
    }

    pub(crate) fn clear(&mut self) {
        self.pages.clear();
        self.total = None;
    }

    /// Keep only items matching `keep`. Empty pages stay so cursors survive.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        for page in &mut self.pages {
            page.items.retain(&mut keep);
        }
    }

    /// Apply `f` to every item in place.
    pub fn map_items<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut T),
    {
        for item in self.pages.iter_mut().flat_map(|p| p.items.iter_mut()) {
            f(item);
        }
    }

    /// First item matching `pred`, if any.
    pub fn find<F>(&self, mut pred: F) -> Option<&T>
    where
        F: FnMut(&T) -> bool,
    {
        self.items().find(|item| pred(*item))
    }

    /// Insert an item at the front of the first page, e.g. a freshly created record.
    ///
    /// Returns false when nothing has been fetched yet; the record will arrive
    /// with the first page instead.
    pub fn prepend(&mut self, item: T) -> bool {
        match self.pages.first_mut() {
            Some(first) => {
                first.items.insert(0, item);
                true
            }
            None => false,
        }
    }
}

impl<T: Clone> PageSet<T> {
    /// Flatten all pages into one list, in page order.
    #[must_use]
    pub fn flatten(&self) -> Vec<T> {
        self.items().cloned().collect()
    }
}

impl<T> Default for PageSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pages() -> PageSet<u32> {
        PageSet::from_pages(
            vec![
                PageCursor::new(None, vec![5, 6], Some(Cursor::from("p2"))),
                PageCursor::new(Some(Cursor::from("p2")), vec![7, 8], Some(Cursor::from("p3"))),
            ],
            Some(40),
        )
    }

    #[test]
    fn empty_set_accepts_only_first_page() {
        let set: PageSet<u32> = PageSet::new();
        assert!(set.accepts(None));
        assert!(!set.accepts(Some(&Cursor::from("p2"))));
        assert!(!set.is_exhausted());
        assert!(set.next_cursor().is_none());
    }

    #[test]
    fn accepts_only_the_current_next_cursor() {
        let set = two_pages();
        assert!(set.accepts(Some(&Cursor::from("p3"))));
        assert!(!set.accepts(Some(&Cursor::from("p2"))));
        assert!(!set.accepts(None));
    }

    #[test]
    fn exhausted_after_terminal_page() {
        let mut set = two_pages();
        set.push(PageCursor::new(Some(Cursor::from("p3")), vec![9], None));

        assert!(set.is_exhausted());
        assert!(set.next_cursor().is_none());
        assert!(!set.accepts(None));
        assert_eq!(set.flatten(), vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn retain_keeps_empty_pages_and_cursors() {
        let mut set = two_pages();
        set.retain(|id| *id != 5 && *id != 6);

        assert_eq!(set.len(), 2);
        assert_eq!(set.flatten(), vec![7, 8]);
        assert_eq!(set.next_cursor(), Some(&Cursor::from("p3")));
    }

    #[test]
    fn adjust_total_saturates() {
        let mut set = two_pages();
        set.adjust_total(-1);
        assert_eq!(set.total(), Some(39));
        set.adjust_total(-100);
        assert_eq!(set.total(), Some(0));
        set.adjust_total(3);
        assert_eq!(set.total(), Some(3));

        let mut no_total: PageSet<u32> = PageSet::new();
        no_total.adjust_total(5);
        assert_eq!(no_total.total(), None);
    }

    #[test]
    fn map_find_and_prepend() {
        let mut set = two_pages();
        set.map_items(|id| *id *= 10);
        assert_eq!(set.find(|id| *id > 60), Some(&70));

        assert!(set.prepend(1));
        assert_eq!(set.flatten(), vec![1, 50, 60, 70, 80]);

        let mut empty: PageSet<u32> = PageSet::new();
        assert!(!empty.prepend(1));
        assert!(empty.is_empty());
    }
}
