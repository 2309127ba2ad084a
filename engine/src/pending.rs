//! Pending operations: user actions whose remote call has not settled yet.

use crate::{Bookmark, BookmarkId, PendingId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What an in-flight action did, with enough state to undo it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PendingKind {
    /// A provisional row keyed by the pending id was added.
    Insert,
    /// The row `id` was removed; `removed` is absent if it was not visible.
    Delete {
        id: BookmarkId,
        removed: Option<Removed>,
    },
}

/// A row taken out of the collection, and where it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Removed {
    pub bookmark: Bookmark,
    pub index: usize,
}

/// A user action awaiting its remote result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOp {
    pub id: PendingId,
    pub kind: PendingKind,
    /// When the action was accepted (milliseconds since epoch)
    pub began_at: Timestamp,
}

/// Tracks in-flight actions and the ids of those that already settled.
#[derive(Debug, Clone, Default)]
pub struct PendingTracker {
    counter: u64,
    ops: BTreeMap<PendingId, PendingOp>,
    settled: BTreeSet<PendingId>,
}

impl PendingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh temporary identifier.
    pub fn next_id(&mut self) -> PendingId {
        loop {
            self.counter += 1;
            let id = format!("pending-{}", self.counter);
            if !self.ops.contains_key(&id) && !self.settled.contains(&id) {
                return id;
            }
        }
    }

    /// Record an accepted action. Returns its handle.
    pub fn begin(&mut self, id: PendingId, kind: PendingKind, now: Timestamp) -> PendingId {
        self.ops.insert(
            id.clone(),
            PendingOp {
                id: id.clone(),
                kind,
                began_at: now,
            },
        );
        id
    }

    /// Remove a settled action.
    ///
    /// Returns `None` if the handle is unknown or was already resolved.
    pub fn resolve(&mut self, id: &str) -> Option<PendingOp> {
        let op = self.ops.remove(id)?;
        self.settled.insert(op.id.clone());
        Some(op)
    }

    /// Remember a settlement for an id that was never begun here.
    pub fn mark_settled(&mut self, id: PendingId) {
        self.settled.insert(id);
    }

    pub fn is_settled(&self, id: &str) -> bool {
        self.settled.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&PendingOp> {
        self.ops.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ops.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOp> {
        self.ops.values()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Actions older than `timeout_ms`, oldest first.
    pub fn expired(&self, now: Timestamp, timeout_ms: u64) -> Vec<PendingId> {
        let mut expired: Vec<&PendingOp> = self
            .ops
            .values()
            .filter(|op| op.began_at.saturating_add(timeout_ms) <= now)
            .collect();
        expired.sort_by(|a, b| a.began_at.cmp(&b.began_at).then_with(|| a.id.cmp(&b.id)));
        expired.into_iter().map(|op| op.id.clone()).collect()
    }
}
