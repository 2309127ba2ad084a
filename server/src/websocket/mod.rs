//! WebSocket support for the UI.
//!
//! Connected UIs get the whole collection on connect and again after every
//! visible change, plus any notices. They may also submit actions over the
//! same socket instead of the HTTP routes.

mod manager;
mod protocol;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub use manager::ConnectionManager;
pub use protocol::*;

use crate::session::SessionHandle;

/// Fan session updates out to every connected UI until the session ends.
pub fn spawn_forwarder(session: &SessionHandle, manager: Arc<ConnectionManager>) -> JoinHandle<()> {
    let mut view = session.subscribe();
    let mut notices = session.notices();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = view.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = view.borrow_and_update().clone();
                    let sent = manager.broadcast_all(&ServerMessage::Collection(snapshot));
                    tracing::trace!(sent_to = sent, "Broadcast collection");
                }
                notice = notices.recv() => match notice {
                    Ok(notice) => {
                        manager.broadcast_all(&ServerMessage::Notice(notice));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "UI notice forwarder lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        tracing::debug!("UI forwarder stopped");
    })
}
