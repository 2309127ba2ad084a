//! Push channel wire protocol.
//!
//! All frames are JSON text messages tagged by `type`:
//!
//! ```json
//! {"type":"subscribe","topic":"bookmarks","filter":"user_id=eq.u-1","accessToken":"..."}
//! {"type":"subscribed","topic":"bookmarks"}
//! {"type":"change","topic":"bookmarks","eventType":"INSERT","new":{...},"old":{}}
//! ```

use serde::{Deserialize, Serialize};
use shelf_engine::{Bookmark, DeletedRow, PushPayload};

use super::PushError;
use crate::remote::{StoreKey, StoreRow};

/// Frames sent to the push service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    Subscribe {
        topic: String,
        filter: String,
        access_token: String,
    },
    Unsubscribe {
        topic: String,
    },
    Heartbeat,
}

/// Row change kinds, as the store spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Frames received from the push service.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Subscribed {
        topic: String,
    },
    #[serde(rename_all = "camelCase")]
    Change {
        event_type: ChangeKind,
        #[serde(default)]
        new: serde_json::Value,
        #[serde(default)]
        old: serde_json::Value,
    },
    Error {
        message: String,
    },
    HeartbeatAck,
}

impl ClientFrame {
    pub fn subscribe(topic: &str, user_id: &str, access_token: &str) -> Self {
        ClientFrame::Subscribe {
            topic: topic.to_string(),
            filter: format!("user_id=eq.{user_id}"),
            access_token: access_token.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        // Plain strings and unit variants always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl ServerFrame {
    pub fn parse(text: &str) -> Result<Self, PushError> {
        serde_json::from_str(text).map_err(|e| PushError::Protocol(e.to_string()))
    }

    /// The engine-facing payload carried by a `change` frame.
    ///
    /// Control frames yield `Ok(None)`; an `error` frame becomes
    /// [`PushError::Rejected`].
    pub fn into_payload(self) -> Result<Option<PushPayload>, PushError> {
        match self {
            ServerFrame::Change {
                event_type, new, old, ..
            } => {
                let payload = match event_type {
                    ChangeKind::Insert => PushPayload::Insert {
                        record: record(new)?,
                    },
                    ChangeKind::Update => PushPayload::Update {
                        record: record(new)?,
                    },
                    ChangeKind::Delete => {
                        let key: StoreKey = serde_json::from_value(old)
                            .map_err(|e| PushError::Protocol(format!("delete without key: {e}")))?;
                        PushPayload::Delete {
                            old: DeletedRow {
                                id: key.id.to_string(),
                            },
                        }
                    }
                };
                Ok(Some(payload))
            }
            ServerFrame::Error { message } => Err(PushError::Rejected(message)),
            ServerFrame::Subscribed { .. } | ServerFrame::HeartbeatAck => Ok(None),
        }
    }
}

fn record(value: serde_json::Value) -> Result<Bookmark, PushError> {
    let row: StoreRow = serde_json::from_value(value)
        .map_err(|e| PushError::Protocol(format!("bad record: {e}")))?;
    Ok(row.into())
}
