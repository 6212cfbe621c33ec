//! Gallery Item Types
//!
//! Domain types for the live gallery: individual items, the add/remove
//! deltas pushed by the backend, and the ordered collection they mutate.
//!
//! # Ordering
//!
//! The collection is kept sorted by descending timestamp at all times and
//! holds at most one item per name. Deltas are applied incrementally: each
//! addition is inserted at its sorted position instead of re-sorting the
//! whole collection. Items sharing a timestamp keep their arrival order, so
//! a newly inserted item lands after existing items with the same
//! timestamp. Re-adding a name with its current timestamp leaves the entry
//! where it is, so replaying a delta never reshuffles ties.

use chrono::{DateTime, Utc};

// =============================================================================
// Types
// =============================================================================

/// Unique name of a gallery entry (a path relative to the served directory).
pub type ItemName = String;

/// Modification timestamp in Unix milliseconds, as sent on the wire.
pub type Timestamp = i64;

/// One gallery entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    name: ItemName,
    timestamp: Timestamp,
}

impl Item {
    /// Create a new item.
    #[must_use]
    pub fn new(name: impl Into<ItemName>, timestamp: Timestamp) -> Self {
        Self {
            name: name.into(),
            timestamp,
        }
    }

    /// Item name (unique key).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Modification timestamp in Unix milliseconds.
    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Modification time as a UTC date, if the timestamp is representable.
    #[must_use]
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

// =============================================================================
// Gallery Delta
// =============================================================================

/// Incremental change set applied to the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryDelta {
    /// Items to insert (or replace when the name already exists).
    pub added: Vec<(ItemName, Timestamp)>,
    /// Names to remove.
    pub removed: Vec<ItemName>,
}

impl GalleryDelta {
    /// Check if the delta carries no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Create a delta with only additions.
    #[must_use]
    pub fn added_only(items: impl IntoIterator<Item = (ItemName, Timestamp)>) -> Self {
        Self {
            added: items.into_iter().collect(),
            removed: Vec::new(),
        }
    }

    /// Create a delta with only removals.
    #[must_use]
    pub fn removed_only(names: impl IntoIterator<Item = ItemName>) -> Self {
        Self {
            added: Vec::new(),
            removed: names.into_iter().collect(),
        }
    }
}

/// Summary of what one delta application changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaOutcome {
    /// Items newly inserted.
    pub inserted: usize,
    /// Existing items replaced by an addition with the same name.
    pub replaced: usize,
    /// Items removed by name.
    pub removed: usize,
}

impl DeltaOutcome {
    /// Check if the delta left the collection untouched.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.inserted == 0 && self.replaced == 0 && self.removed == 0
    }
}

// =============================================================================
// Ordered Item Collection
// =============================================================================

/// Items sorted by descending timestamp, unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemCollection {
    items: Vec<Item>,
}

impl ItemCollection {
    /// Create an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Items in display order (newest first).
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Item names in display order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(Item::name)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Check if an item with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Apply a delta: removals first, then each addition in order.
    ///
    /// Removing an absent name is a no-op. Adding an existing name replaces
    /// the entry (remove-then-insert), so names stay unique.
    pub fn apply(&mut self, delta: &GalleryDelta) -> DeltaOutcome {
        let mut outcome = DeltaOutcome::default();

        for name in &delta.removed {
            if self.remove(name) {
                outcome.removed += 1;
            }
        }

        for (name, timestamp) in &delta.added {
            match self.position(name) {
                // Same key and timestamp: already in its sorted slot.
                Some(index) if self.items[index].timestamp == *timestamp => {
                    outcome.replaced += 1;
                    continue;
                }
                Some(index) => {
                    self.items.remove(index);
                    outcome.replaced += 1;
                }
                None => outcome.inserted += 1,
            }
            self.insert(Item::new(name.clone(), *timestamp));
        }

        outcome
    }

    /// Drop every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|item| item.name == name)
    }

    fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    fn insert(&mut self, item: Item) {
        // First slot holding a strictly older item; equal timestamps stay ahead.
        let index = self
            .items
            .partition_point(|existing| existing.timestamp >= item.timestamp);
        self.items.insert(index, item);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_added(items: &[(&str, i64)]) -> GalleryDelta {
        GalleryDelta::added_only(items.iter().map(|(n, t)| ((*n).to_string(), *t)))
    }

    fn names(collection: &ItemCollection) -> Vec<&str> {
        collection.names().collect()
    }

    #[test]
    fn added_items_sorted_newest_first() {
        let mut collection = ItemCollection::new();
        collection.apply(&delta_added(&[("b.jpg", 1), ("a.jpg", 3)]));

        assert_eq!(names(&collection), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn removal_drops_named_item() {
        let mut collection = ItemCollection::new();
        collection.apply(&delta_added(&[("a.jpg", 3), ("b.jpg", 1)]));

        let outcome = collection.apply(&GalleryDelta::removed_only(["a.jpg".to_string()]));

        assert_eq!(names(&collection), vec!["b.jpg"]);
        assert_eq!(outcome.removed, 1);
    }

    #[test]
    fn removing_absent_name_is_noop() {
        let mut collection = ItemCollection::new();
        collection.apply(&delta_added(&[("a.jpg", 3)]));
        let before = collection.clone();

        let outcome = collection.apply(&GalleryDelta::removed_only(["zzz.jpg".to_string()]));

        assert!(outcome.is_noop());
        assert_eq!(collection, before);
    }

    #[test]
    fn re_adding_name_replaces_entry() {
        let mut collection = ItemCollection::new();
        collection.apply(&delta_added(&[("a.jpg", 3), ("b.jpg", 2), ("c.jpg", 1)]));

        let outcome = collection.apply(&delta_added(&[("c.jpg", 10)]));

        assert_eq!(names(&collection), vec!["c.jpg", "a.jpg", "b.jpg"]);
        assert_eq!(outcome.replaced, 1);
        assert_eq!(outcome.inserted, 0);
        assert_eq!(collection.get("c.jpg").map(Item::timestamp), Some(10));
    }

    #[test]
    fn duplicate_names_within_one_delta_keep_last() {
        let mut collection = ItemCollection::new();
        collection.apply(&delta_added(&[("a.jpg", 1), ("a.jpg", 5)]));

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("a.jpg").map(Item::timestamp), Some(5));
    }

    #[test]
    fn removal_applies_before_addition_of_same_name() {
        let mut collection = ItemCollection::new();
        collection.apply(&delta_added(&[("a.jpg", 1)]));

        let delta = GalleryDelta {
            added: vec![("a.jpg".to_string(), 7)],
            removed: vec!["a.jpg".to_string()],
        };
        collection.apply(&delta);

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("a.jpg").map(Item::timestamp), Some(7));
    }

    #[test]
    fn equal_timestamps_keep_arrival_order() {
        let mut collection = ItemCollection::new();
        collection.apply(&delta_added(&[("first.jpg", 5), ("newer.jpg", 9)]));
        collection.apply(&delta_added(&[("second.jpg", 5)]));
        collection.apply(&delta_added(&[("third.jpg", 5)]));

        assert_eq!(
            names(&collection),
            vec!["newer.jpg", "first.jpg", "second.jpg", "third.jpg"]
        );
    }

    #[test]
    fn reapplying_same_delta_is_deterministic() {
        let delta = delta_added(&[("x.jpg", 4), ("y.jpg", 4), ("z.jpg", 4)]);

        let mut once = ItemCollection::new();
        once.apply(&delta);
        let mut twice = once.clone();
        twice.apply(&delta);

        assert_eq!(names(&once), vec!["x.jpg", "y.jpg", "z.jpg"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn modified_at_converts_millis() {
        let item = Item::new("a.jpg", 1_700_000_000_123);
        let modified = item.modified_at().unwrap();
        assert_eq!(modified.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn empty_delta_detection() {
        assert!(GalleryDelta::default().is_empty());
        assert!(!delta_added(&[("a.jpg", 1)]).is_empty());
    }

    #[test]
    fn clear_empties_collection() {
        let mut collection = ItemCollection::new();
        collection.apply(&delta_added(&[("a.jpg", 1)]));
        collection.clear();
        assert!(collection.is_empty());
        assert!(!collection.contains("a.jpg"));
    }
}
