//! Change events: one shape for every way the collection can change.
//!
//! Three origins feed the engine:
//! - the user's own action, applied before any network call ([`ChangeEvent::Optimistic`])
//! - the settled result of that action's remote call ([`ChangeEvent::Settled`])
//! - push notifications from the store ([`ChangeEvent::Pushed`]), which may
//!   duplicate either of the above or describe another client's change
//!
//! The origin is kept as a tag so the engine only does in-place replacement
//! for settlements and plain dedup for pushes.

use crate::{
    error::RemoteFailure, identity::RowIdentity, Bookmark, BookmarkId, Draft, PendingId,
    Timestamp,
};
use serde::{Deserialize, Serialize};

/// A mutation the user asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LocalChange {
    Insert { draft: Draft, created_at: Timestamp },
    Delete { id: BookmarkId, requested_at: Timestamp },
}

/// How a remote call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Settlement {
    /// The store created the row and returned it.
    Inserted { bookmark: Bookmark },
    /// The store deleted the row.
    Deleted { id: BookmarkId },
    /// The call failed; the optimistic change must be undone.
    Failed { failure: RemoteFailure },
}

/// An authoritative row change from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RowChange {
    Insert { bookmark: Bookmark },
    Update { bookmark: Bookmark },
    Delete { id: BookmarkId },
}

/// The origin class of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventTag {
    /// Local and provisional.
    Optimistic,
    /// Authoritative answer to this client's own call.
    AuthoritativeMine,
    /// Authoritative, from anyone, possibly a duplicate.
    AuthoritativeExternal,
}

/// A normalized change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "camelCase")]
pub enum ChangeEvent {
    Optimistic {
        pending: PendingId,
        change: LocalChange,
    },
    Settled {
        pending: PendingId,
        settlement: Settlement,
    },
    Pushed {
        change: RowChange,
    },
}

impl ChangeEvent {
    pub fn optimistic_insert(pending: impl Into<PendingId>, draft: Draft, now: Timestamp) -> Self {
        ChangeEvent::Optimistic {
            pending: pending.into(),
            change: LocalChange::Insert {
                draft,
                created_at: now,
            },
        }
    }

    pub fn optimistic_delete(
        pending: impl Into<PendingId>,
        id: impl Into<BookmarkId>,
        now: Timestamp,
    ) -> Self {
        ChangeEvent::Optimistic {
            pending: pending.into(),
            change: LocalChange::Delete {
                id: id.into(),
                requested_at: now,
            },
        }
    }

    /// Normalize the result of a remote insert.
    pub fn settled_insert(
        pending: impl Into<PendingId>,
        result: Result<Bookmark, RemoteFailure>,
    ) -> Self {
        let settlement = match result {
            Ok(bookmark) => Settlement::Inserted { bookmark },
            Err(failure) => Settlement::Failed { failure },
        };
        ChangeEvent::Settled {
            pending: pending.into(),
            settlement,
        }
    }

    /// Normalize the result of a remote delete.
    pub fn settled_delete(
        pending: impl Into<PendingId>,
        id: impl Into<BookmarkId>,
        result: Result<(), RemoteFailure>,
    ) -> Self {
        let settlement = match result {
            Ok(()) => Settlement::Deleted { id: id.into() },
            Err(failure) => Settlement::Failed { failure },
        };
        ChangeEvent::Settled {
            pending: pending.into(),
            settlement,
        }
    }

    /// Normalize a push notification.
    pub fn pushed(payload: PushPayload) -> Self {
        ChangeEvent::Pushed {
            change: payload.into(),
        }
    }

    pub fn tag(&self) -> EventTag {
        match self {
            ChangeEvent::Optimistic { .. } => EventTag::Optimistic,
            ChangeEvent::Settled { .. } => EventTag::AuthoritativeMine,
            ChangeEvent::Pushed { .. } => EventTag::AuthoritativeExternal,
        }
    }

    /// Which row this event is about, as far as it knows.
    pub fn identity(&self) -> RowIdentity {
        match self {
            ChangeEvent::Optimistic { pending, change } => match change {
                LocalChange::Insert { .. } => RowIdentity::by_pending(pending.clone()),
                LocalChange::Delete { id, .. } => RowIdentity::both(id.clone(), pending.clone()),
            },
            ChangeEvent::Settled {
                pending,
                settlement,
            } => match settlement {
                Settlement::Inserted { bookmark } => {
                    RowIdentity::both(bookmark.id.clone(), pending.clone())
                }
                Settlement::Deleted { id } => RowIdentity::both(id.clone(), pending.clone()),
                Settlement::Failed { .. } => RowIdentity::by_pending(pending.clone()),
            },
            ChangeEvent::Pushed { change } => match change {
                RowChange::Insert { bookmark } | RowChange::Update { bookmark } => {
                    RowIdentity::by_id(bookmark.id.clone())
                }
                RowChange::Delete { id } => RowIdentity::by_id(id.clone()),
            },
        }
    }

    /// The pending operation this event belongs to, if any.
    pub fn pending(&self) -> Option<&PendingId> {
        match self {
            ChangeEvent::Optimistic { pending, .. } | ChangeEvent::Settled { pending, .. } => {
                Some(pending)
            }
            ChangeEvent::Pushed { .. } => None,
        }
    }
}

/// The identifier of a deleted row, as carried by a delete notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRow {
    pub id: BookmarkId,
}

/// Wire form of a push notification.
///
/// ```json
/// {"type": "insert", "record": {"id": "5", "title": "...", "url": "...", "createdAt": 1700000000000}}
/// {"type": "delete", "old": {"id": "5"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PushPayload {
    Insert { record: Bookmark },
    Update { record: Bookmark },
    Delete { old: DeletedRow },
}

impl From<PushPayload> for RowChange {
    fn from(payload: PushPayload) -> Self {
        match payload {
            PushPayload::Insert { record } => RowChange::Insert { bookmark: record },
            PushPayload::Update { record } => RowChange::Update { bookmark: record },
            PushPayload::Delete { old } => RowChange::Delete { id: old.id },
        }
    }
}
