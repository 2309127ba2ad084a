//! Row shapes of the store's `bookmarks` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelf_engine::{Bookmark, Draft};

/// Primary key as the store sends it: a uuid string or a bigint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StoreId {
    Text(String),
    Number(i64),
}

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreId::Text(s) => f.write_str(s),
            StoreId::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A full row, as returned by selects, inserts and push `new` records.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreRow {
    pub id: StoreId,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl From<StoreRow> for Bookmark {
    fn from(row: StoreRow) -> Self {
        // Pre-epoch timestamps sort last.
        let created_at = u64::try_from(row.created_at.timestamp_millis()).unwrap_or(0);
        Bookmark::new(row.id.to_string(), row.title, row.url, created_at)
    }
}

/// Only the key survives in a delete notification's `old` record.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreKey {
    pub id: StoreId,
}

/// Insert body. The store assigns `id` and `created_at`.
#[derive(Debug, Serialize)]
pub struct NewRow<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub user_id: &'a str,
}

impl<'a> NewRow<'a> {
    pub fn new(draft: &'a Draft, user_id: &'a str) -> Self {
        Self {
            title: &draft.title,
            url: &draft.url,
            user_id,
        }
    }
}
