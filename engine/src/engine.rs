//! Engine - the single owner of the visible collection.
//!
//! Every change, whatever its origin, goes through [`Engine::apply`]. The
//! transition rules are idempotent, so the final collection does not depend on
//! the order in which the optimistic, settled and pushed events for one action
//! arrive:
//!
//! | event                                   | effect                                   |
//! |-----------------------------------------|------------------------------------------|
//! | optimistic insert                       | provisional row at its ordered position  |
//! | settled insert, provisional visible     | replace it in place                      |
//! | settled insert, id already visible      | drop the provisional row                 |
//! | any insert, id already visible          | no-op                                    |
//! | delete, row visible                     | remove                                   |
//! | delete, row absent                      | no-op                                    |
//! | failed settlement                       | undo the optimistic change               |
//! | settlement for an unknown pending id    | apply as a plain authoritative event     |
//! | optimistic event for a settled id       | no-op                                    |

use crate::{
    bookmark::Entry,
    collection::Collection,
    error::{RemoteFailure, Result},
    event::{ChangeEvent, LocalChange, RowChange, Settlement},
    pending::{PendingKind, PendingOp, PendingTracker, Removed},
    Bookmark, BookmarkId, Draft, Error, PendingId, Timestamp,
};
use serde::{Deserialize, Serialize};

/// What applying one event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Applied {
    /// A new row appeared at `index`.
    Inserted { index: usize },
    /// A provisional row became the authoritative one.
    Replaced { index: usize },
    /// A provisional row was dropped because the authoritative row was
    /// already visible at `index`.
    Merged { index: usize },
    /// A visible row's attributes were overwritten.
    Updated { index: usize },
    /// The row at `index` was removed.
    Removed { index: usize },
    /// A settlement arrived for a row already in its final state.
    Confirmed,
    /// A remote call failed and its optimistic change was undone.
    RolledBack {
        pending: PendingId,
        failure: RemoteFailure,
        changed: bool,
    },
    /// The event was already reflected in the collection.
    Deduplicated,
    /// The event does not apply to anything.
    Ignored,
    /// The engine is closed; pending state was resolved but the collection
    /// was left alone.
    Detached,
}

impl Applied {
    /// Whether the visible collection changed.
    pub fn changed(&self) -> bool {
        match self {
            Applied::Inserted { .. }
            | Applied::Replaced { .. }
            | Applied::Merged { .. }
            | Applied::Updated { .. }
            | Applied::Removed { .. } => true,
            Applied::RolledBack { changed, .. } => *changed,
            Applied::Confirmed | Applied::Deduplicated | Applied::Ignored | Applied::Detached => {
                false
            }
        }
    }
}

/// The remote call a submission needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RemoteRequest {
    Insert { draft: Draft },
    Delete { id: BookmarkId },
}

/// An accepted user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Handle to correlate the remote result with
    pub pending: PendingId,
    /// What to send to the store
    pub request: RemoteRequest,
    /// What the optimistic step did
    pub applied: Applied,
}

/// The reconciliation engine.
#[derive(Debug, Clone)]
pub struct Engine {
    collection: Collection,
    pending: PendingTracker,
    revision: u64,
    closed: bool,
}

impl Engine {
    /// Create an engine seeded with the server's snapshot.
    ///
    /// The snapshot is taken as-is: newest first, no duplicate ids.
    pub fn new(seed: Vec<Bookmark>) -> Self {
        Self {
            collection: Collection::from_seed(seed),
            pending: PendingTracker::new(),
            revision: 0,
            closed: false,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// The visible bookmarks, newest first.
    pub fn current(&self) -> Vec<Bookmark> {
        self.collection.bookmarks().cloned().collect()
    }

    /// Bumped on every change to the visible collection.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn pending(&self) -> &PendingTracker {
        &self.pending
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Detach the collection. In-flight settlements still resolve their
    /// pending operations, but nothing touches the collection any more.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Accept a user's insert: validate, show it optimistically, and return
    /// the remote request to issue.
    pub fn submit_insert(&mut self, title: &str, url: &str, now: Timestamp) -> Result<Submission> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        let draft = Draft::new(title, url)?;
        let pending = self.pending.next_id();
        let applied = self.apply(ChangeEvent::optimistic_insert(
            pending.clone(),
            draft.clone(),
            now,
        ));
        Ok(Submission {
            pending,
            request: RemoteRequest::Insert { draft },
            applied,
        })
    }

    /// Accept a user's delete: remove the row optimistically and return the
    /// remote request to issue.
    pub fn submit_delete(&mut self, id: &str, now: Timestamp) -> Result<Submission> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        if !self.collection.contains_id(id) {
            if self.collection.position_of_pending(id).is_some() {
                return Err(Error::ProvisionalRow(id.to_string()));
            }
            return Err(Error::BookmarkNotFound(id.to_string()));
        }
        let pending = self.pending.next_id();
        let applied = self.apply(ChangeEvent::optimistic_delete(pending.clone(), id, now));
        Ok(Submission {
            pending,
            request: RemoteRequest::Delete { id: id.to_string() },
            applied,
        })
    }

    /// Apply one change event.
    pub fn apply(&mut self, event: ChangeEvent) -> Applied {
        let applied = match event {
            ChangeEvent::Optimistic { pending, change } => self.apply_optimistic(pending, change),
            ChangeEvent::Settled {
                pending,
                settlement,
            } => self.apply_settlement(pending, settlement),
            ChangeEvent::Pushed { change } => self.apply_push(change),
        };
        if applied.changed() {
            self.revision += 1;
        }
        applied
    }

    /// Fail every pending operation older than `timeout_ms`.
    pub fn expire(&mut self, now: Timestamp, timeout_ms: u64) -> Vec<Applied> {
        self.pending
            .expired(now, timeout_ms)
            .into_iter()
            .map(|pending| {
                self.apply(ChangeEvent::Settled {
                    pending,
                    settlement: Settlement::Failed {
                        failure: RemoteFailure::Timeout(timeout_ms / 1000),
                    },
                })
            })
            .collect()
    }

    fn apply_optimistic(&mut self, pending: PendingId, change: LocalChange) -> Applied {
        if self.pending.is_settled(&pending) || self.pending.contains(&pending) {
            return Applied::Ignored;
        }
        if self.closed {
            return Applied::Detached;
        }

        match change {
            LocalChange::Insert { draft, created_at } => {
                self.pending
                    .begin(pending.clone(), PendingKind::Insert, created_at);
                let index = self
                    .collection
                    .insert_ordered(Entry::provisional(pending, draft, created_at), None);
                Applied::Inserted { index }
            }
            LocalChange::Delete { id, requested_at } => {
                let removed = self.collection.position_of_id(&id).map(|index| Removed {
                    bookmark: self.collection.remove(index).bookmark,
                    index,
                });
                let applied = match &removed {
                    Some(r) => Applied::Removed { index: r.index },
                    None => Applied::Ignored,
                };
                self.pending
                    .begin(pending, PendingKind::Delete { id, removed }, requested_at);
                applied
            }
        }
    }

    fn apply_settlement(&mut self, pending: PendingId, settlement: Settlement) -> Applied {
        let Some(op) = self.pending.resolve(&pending) else {
            // Never begun here, or already settled: only the authoritative
            // content matters.
            self.pending.mark_settled(pending);
            if self.closed {
                return Applied::Detached;
            }
            return match settlement {
                Settlement::Inserted { bookmark } => self.insert_authoritative(bookmark),
                Settlement::Deleted { id } => self.remove_by_id(&id),
                Settlement::Failed { .. } => Applied::Ignored,
            };
        };

        if self.closed {
            return Applied::Detached;
        }

        match settlement {
            Settlement::Inserted { bookmark } => self.confirm_insert(&op.id, bookmark),
            Settlement::Deleted { id } => match self.remove_by_id(&id) {
                Applied::Ignored => Applied::Confirmed,
                other => other,
            },
            Settlement::Failed { failure } => self.rollback(op, failure),
        }
    }

    fn apply_push(&mut self, change: RowChange) -> Applied {
        if self.closed {
            return Applied::Detached;
        }
        match change {
            RowChange::Insert { bookmark } => self.insert_authoritative(bookmark),
            RowChange::Update { bookmark } => match self.collection.position_of_id(&bookmark.id) {
                Some(index) => {
                    if self.collection.get(index).map(|e| &e.bookmark) == Some(&bookmark) {
                        return Applied::Deduplicated;
                    }
                    let index = self.collection.replace(index, Entry::confirmed(bookmark));
                    Applied::Updated { index }
                }
                None => Applied::Ignored,
            },
            RowChange::Delete { id } => self.remove_by_id(&id),
        }
    }

    fn insert_authoritative(&mut self, bookmark: Bookmark) -> Applied {
        if self.collection.contains_id(&bookmark.id) {
            return Applied::Deduplicated;
        }
        let index = self
            .collection
            .insert_ordered(Entry::confirmed(bookmark), None);
        Applied::Inserted { index }
    }

    fn confirm_insert(&mut self, pending: &str, bookmark: Bookmark) -> Applied {
        let provisional = self.collection.position_of_pending(pending);
        let existing = self.collection.position_of_id(&bookmark.id);

        match (provisional, existing) {
            (Some(p), None) => {
                let index = self.collection.replace(p, Entry::confirmed(bookmark));
                Applied::Replaced { index }
            }
            (Some(p), Some(_)) => {
                self.collection.remove(p);
                let index = self
                    .collection
                    .position_of_id(&bookmark.id)
                    .map(|e| self.collection.replace(e, Entry::confirmed(bookmark)))
                    .unwrap_or_default();
                Applied::Merged { index }
            }
            (None, _) => self.insert_authoritative(bookmark),
        }
    }

    fn rollback(&mut self, op: PendingOp, failure: RemoteFailure) -> Applied {
        let changed = match op.kind {
            PendingKind::Insert => match self.collection.position_of_pending(&op.id) {
                Some(index) => {
                    self.collection.remove(index);
                    true
                }
                None => false,
            },
            PendingKind::Delete {
                removed: Some(Removed { bookmark, index }),
                ..
            } if !self.collection.contains_id(&bookmark.id) => {
                self.collection
                    .insert_ordered(Entry::confirmed(bookmark), Some(index));
                true
            }
            PendingKind::Delete { .. } => false,
        };
        Applied::RolledBack {
            pending: op.id,
            failure,
            changed,
        }
    }

    fn remove_by_id(&mut self, id: &str) -> Applied {
        match self.collection.position_of_id(id) {
            Some(index) => {
                self.collection.remove(index);
                Applied::Removed { index }
            }
            None => Applied::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmark::RowState;
    use crate::event::PushPayload;

    fn bookmark(id: &str, ts: Timestamp) -> Bookmark {
        Bookmark::new(id, format!("Title {id}"), format!("https://{id}.example"), ts)
    }

    fn ids(engine: &Engine) -> Vec<String> {
        engine.current().into_iter().map(|b| b.id).collect()
    }

    fn push_insert(b: Bookmark) -> ChangeEvent {
        ChangeEvent::pushed(PushPayload::Insert { record: b })
    }

    #[test]
    fn seed_is_taken_as_is() {
        let engine = Engine::new(vec![bookmark("b", 200), bookmark("a", 100)]);
        assert_eq!(ids(&engine), vec!["b", "a"]);
        assert_eq!(engine.revision(), 0);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn submit_insert_shows_provisional_row() {
        let mut engine = Engine::new(vec![bookmark("a", 100)]);
        let submission = engine.submit_insert("T", "http://x", 500).unwrap();

        assert_eq!(submission.applied, Applied::Inserted { index: 0 });
        assert_eq!(
            submission.request,
            RemoteRequest::Insert {
                draft: Draft::new("T", "http://x").unwrap()
            }
        );
        assert!(engine.collection().entries()[0].is_provisional());
        assert_eq!(engine.pending_count(), 1);
        assert_eq!(engine.revision(), 1);
    }

    #[test]
    fn submit_insert_validation_leaves_state_alone() {
        let mut engine = Engine::new(vec![]);
        assert_eq!(
            engine.submit_insert("  ", "http://x", 1),
            Err(Error::EmptyTitle)
        );
        assert_eq!(engine.submit_insert("T", "", 1), Err(Error::EmptyUrl));
        assert!(engine.current().is_empty());
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn own_insert_is_replaced_in_place() {
        let mut engine = Engine::new(vec![bookmark("a", 100)]);
        let submission = engine.submit_insert("T", "http://x", 500).unwrap();

        let applied = engine.apply(ChangeEvent::settled_insert(
            submission.pending,
            Ok(Bookmark::new("5", "T", "http://x", 400)),
        ));

        assert_eq!(applied, Applied::Replaced { index: 0 });
        assert_eq!(ids(&engine), vec!["5", "a"]);
        assert!(!engine.collection().entries()[0].is_provisional());
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn push_after_confirmation_is_deduplicated() {
        let mut engine = Engine::new(vec![]);
        let submission = engine.submit_insert("T", "http://x", 500).unwrap();
        let row = Bookmark::new("5", "T", "http://x", 500);
        engine.apply(ChangeEvent::settled_insert(submission.pending, Ok(row.clone())));

        assert_eq!(engine.apply(push_insert(row)), Applied::Deduplicated);
        assert_eq!(ids(&engine), vec!["5"]);
    }

    #[test]
    fn push_before_confirmation_merges() {
        let mut engine = Engine::new(vec![]);
        let submission = engine.submit_insert("T", "http://x", 500).unwrap();
        let row = Bookmark::new("5", "T", "http://x", 500);

        assert_eq!(
            engine.apply(push_insert(row.clone())),
            Applied::Inserted { index: 0 }
        );

        // Until the settlement lands both rows are visible under different ids.
        let entries = engine.collection().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], Entry::confirmed(row.clone()));
        assert_eq!(entries[1].bookmark.id, submission.pending);
        assert_eq!(
            entries[1].state,
            RowState::Provisional {
                pending: submission.pending.clone()
            }
        );
        assert_eq!(engine.pending_count(), 1);

        let applied = engine.apply(ChangeEvent::settled_insert(submission.pending, Ok(row)));

        assert_eq!(applied, Applied::Merged { index: 0 });
        assert_eq!(ids(&engine), vec!["5"]);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn failed_insert_rolls_back() {
        let mut engine = Engine::new(vec![]);
        let submission = engine.submit_insert("T", "http://x", 500).unwrap();

        let applied = engine.apply(ChangeEvent::settled_insert(
            submission.pending.clone(),
            Err(RemoteFailure::Rejected("denied".into())),
        ));

        assert_eq!(
            applied,
            Applied::RolledBack {
                pending: submission.pending,
                failure: RemoteFailure::Rejected("denied".into()),
                changed: true,
            }
        );
        assert!(engine.current().is_empty());
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn failed_delete_restores_position() {
        let mut engine = Engine::new(vec![bookmark("A", 200), bookmark("B", 100)]);
        let submission = engine.submit_delete("A", 1000).unwrap();
        assert_eq!(ids(&engine), vec!["B"]);

        engine.apply(ChangeEvent::settled_delete(
            submission.pending,
            "A",
            Err(RemoteFailure::Transport("reset".into())),
        ));

        assert_eq!(ids(&engine), vec!["A", "B"]);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut engine = Engine::new(vec![bookmark("A", 200), bookmark("B", 100)]);
        let submission = engine.submit_delete("A", 1000).unwrap();

        let push_delete = ChangeEvent::pushed(PushPayload::Delete {
            old: crate::event::DeletedRow { id: "A".into() },
        });
        assert_eq!(engine.apply(push_delete.clone()), Applied::Ignored);
        assert_eq!(
            engine.apply(ChangeEvent::settled_delete(submission.pending, "A", Ok(()))),
            Applied::Confirmed
        );
        assert_eq!(engine.apply(push_delete), Applied::Ignored);
        assert_eq!(ids(&engine), vec!["B"]);
    }

    #[test]
    fn submit_delete_rejects_unknown_and_provisional_rows() {
        let mut engine = Engine::new(vec![]);
        assert_eq!(
            engine.submit_delete("nope", 1),
            Err(Error::BookmarkNotFound("nope".into()))
        );

        let submission = engine.submit_insert("T", "http://x", 1).unwrap();
        assert_eq!(
            engine.submit_delete(&submission.pending, 2),
            Err(Error::ProvisionalRow(submission.pending.clone()))
        );
    }

    #[test]
    fn push_update_replaces_whole_row() {
        let mut engine = Engine::new(vec![bookmark("A", 200), bookmark("B", 100)]);
        let applied = engine.apply(ChangeEvent::pushed(PushPayload::Update {
            record: Bookmark::new("B", "Renamed", "https://b.example", 100),
        }));

        assert_eq!(applied, Applied::Updated { index: 1 });
        assert_eq!(engine.current()[1].title, "Renamed");

        let absent = engine.apply(ChangeEvent::pushed(PushPayload::Update {
            record: bookmark("Z", 50),
        }));
        assert_eq!(absent, Applied::Ignored);
    }

    #[test]
    fn late_success_after_timeout_still_converges() {
        let mut engine = Engine::new(vec![]);
        let submission = engine.submit_insert("T", "http://x", 1_000).unwrap();

        let expired = engine.expire(20_000, 10_000);
        assert!(matches!(
            expired.as_slice(),
            [Applied::RolledBack {
                failure: RemoteFailure::Timeout(10),
                changed: true,
                ..
            }]
        ));
        assert!(engine.current().is_empty());

        let applied = engine.apply(ChangeEvent::settled_insert(
            submission.pending,
            Ok(Bookmark::new("5", "T", "http://x", 1_000)),
        ));
        assert_eq!(applied, Applied::Inserted { index: 0 });
        assert_eq!(ids(&engine), vec!["5"]);
    }

    #[test]
    fn closed_engine_resolves_without_mutating() {
        let mut engine = Engine::new(vec![bookmark("A", 200)]);
        let insert = engine.submit_insert("T", "http://x", 500).unwrap();
        let delete = engine.submit_delete("A", 501).unwrap();
        let before = engine.collection().clone();
        let revision = engine.revision();

        engine.close();

        assert_eq!(
            engine.apply(ChangeEvent::settled_insert(
                insert.pending,
                Err(RemoteFailure::Timeout(10))
            )),
            Applied::Detached
        );
        assert_eq!(
            engine.apply(ChangeEvent::settled_delete(delete.pending, "A", Ok(()))),
            Applied::Detached
        );
        assert_eq!(
            engine.apply(push_insert(bookmark("Z", 900))),
            Applied::Detached
        );

        assert_eq!(engine.pending_count(), 0);
        assert_eq!(engine.collection(), &before);
        assert_eq!(engine.revision(), revision);
        assert_eq!(
            engine.submit_insert("T", "http://x", 600),
            Err(Error::SessionClosed)
        );
    }

    #[test]
    fn replayed_optimistic_event_is_ignored() {
        let mut engine = Engine::new(vec![]);
        let draft = Draft::new("T", "http://x").unwrap();
        let optimistic = ChangeEvent::optimistic_insert("pending-9", draft, 10);

        assert_eq!(
            engine.apply(optimistic.clone()),
            Applied::Inserted { index: 0 }
        );
        assert_eq!(engine.apply(optimistic), Applied::Ignored);
        assert_eq!(engine.current().len(), 1);
    }
}
