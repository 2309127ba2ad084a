//! Row identity: deciding whether two change events touch the same row.

use crate::{BookmarkId, PendingId};
use serde::{Deserialize, Serialize};

/// Everything an event knows about which row it describes.
///
/// Optimistic inserts only know their pending id, pushes only know the store
/// id, and settlements of the user's own insert know both. The settlement is
/// what links the other two.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<BookmarkId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingId>,
}

impl RowIdentity {
    pub fn by_id(id: impl Into<BookmarkId>) -> Self {
        Self {
            id: Some(id.into()),
            pending: None,
        }
    }

    pub fn by_pending(pending: impl Into<PendingId>) -> Self {
        Self {
            id: None,
            pending: Some(pending.into()),
        }
    }

    pub fn both(id: impl Into<BookmarkId>, pending: impl Into<PendingId>) -> Self {
        Self {
            id: Some(id.into()),
            pending: Some(pending.into()),
        }
    }

    /// Whether two identities denote the same logical row.
    ///
    /// Equal store ids, or equal pending ids. Never fails.
    pub fn same_row(&self, other: &RowIdentity) -> bool {
        matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b)
            || matches!((&self.pending, &other.pending), (Some(a), Some(b)) if a == b)
    }
}

/// Free-standing form of [`RowIdentity::same_row`].
pub fn same_row(a: &RowIdentity, b: &RowIdentity) -> bool {
    a.same_row(b)
}
