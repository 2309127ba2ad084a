//! The visible, newest-first sequence of bookmark rows.

use crate::{bookmark::Entry, Bookmark, Timestamp};
use serde::{Deserialize, Serialize};

/// Rows ordered by `created_at`, newest first.
///
/// Equal timestamps keep their relative order; where a row lands inside an
/// equal-timestamp run is decided by the caller's position hint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    entries: Vec<Entry>,
}

impl Collection {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Wrap a server snapshot. The snapshot is trusted as already ordered and
    /// free of duplicates.
    pub fn from_seed(seed: Vec<Bookmark>) -> Self {
        Self {
            entries: seed.into_iter().map(Entry::confirmed).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Bookmarks in display order.
    pub fn bookmarks(&self) -> impl Iterator<Item = &Bookmark> {
        self.entries.iter().map(|e| &e.bookmark)
    }

    /// Position of the confirmed row with this store id.
    pub fn position_of_id(&self, id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.confirmed_id().map(String::as_str) == Some(id))
    }

    /// Position of the provisional row for this pending action.
    pub fn position_of_pending(&self, pending: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.pending().map(String::as_str) == Some(pending))
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.position_of_id(id).is_some()
    }

    /// Insert keeping newest-first order. Returns the index used.
    ///
    /// Without a hint the row goes to the front of its equal-timestamp run.
    pub fn insert_ordered(&mut self, entry: Entry, hint: Option<usize>) -> usize {
        let index = self.slot_for(entry.bookmark.created_at, hint);
        self.entries.insert(index, entry);
        index
    }

    pub fn remove(&mut self, index: usize) -> Entry {
        self.entries.remove(index)
    }

    /// Overwrite the row at `index` in place, moving it only if its timestamp
    /// no longer fits there. Returns the final index.
    pub fn replace(&mut self, index: usize, entry: Entry) -> usize {
        self.entries[index] = entry;
        if self.fits_at(index) {
            return index;
        }
        let entry = self.entries.remove(index);
        self.insert_ordered(entry, Some(index))
    }

    /// Whether newest-first order holds across the whole collection.
    pub fn is_ordered(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].bookmark.created_at >= w[1].bookmark.created_at)
    }

    fn slot_for(&self, created_at: Timestamp, hint: Option<usize>) -> usize {
        let lo = self
            .entries
            .partition_point(|e| e.bookmark.created_at > created_at);
        let hi = self
            .entries
            .partition_point(|e| e.bookmark.created_at >= created_at);
        hint.map_or(lo, |h| h.clamp(lo, hi))
    }

    fn fits_at(&self, index: usize) -> bool {
        let ts = self.entries[index].bookmark.created_at;
        let after_newer = index == 0 || self.entries[index - 1].bookmark.created_at >= ts;
        let before_older = self
            .entries
            .get(index + 1)
            .map_or(true, |next| next.bookmark.created_at <= ts);
        after_newer && before_older
    }
}
