//! Push channel: row changes delivered by the store as they happen.

mod client;
mod protocol;

use std::future::Future;
use std::time::Duration;

use shelf_engine::{PushPayload, UserId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub use client::WsPushSource;
pub use protocol::{ClientFrame, ServerFrame};

/// Something that can stream the user's row changes.
pub trait PushSource: Send + Sync + 'static {
    /// Open a subscription filtered to `user`'s rows.
    fn subscribe(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Subscription, PushError>> + Send;
}

/// Push channel errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PushError {
    #[error("could not connect: {0}")]
    Connect(String),

    #[error("subscription refused: {0}")]
    Rejected(String),

    #[error("malformed frame: {0}")]
    Protocol(String),

    #[error("channel closed")]
    Closed,
}

/// A live subscription.
///
/// Dropping it aborts the reader task; [`Subscription::unsubscribe`] also
/// tells the store first.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<Result<PushPayload, PushError>>,
    close: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// A subscription backed by a reader task that stops when `close` fires.
    pub fn new(
        events: mpsc::Receiver<Result<PushPayload, PushError>>,
        close: oneshot::Sender<()>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            events,
            close: Some(close),
            task: Some(task),
        }
    }

    /// A subscription fed directly by a channel, with nothing to tear down.
    #[cfg(test)]
    pub fn from_channel(events: mpsc::Receiver<Result<PushPayload, PushError>>) -> Self {
        Self {
            events,
            close: None,
            task: None,
        }
    }

    /// Next change, or `None` once the channel is gone.
    pub async fn next(&mut self) -> Option<Result<PushPayload, PushError>> {
        self.events.recv().await
    }

    /// Release the subscription and wait briefly for the reader to finish.
    pub async fn unsubscribe(mut self) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
        self.events.close();

        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(Duration::from_secs(2), &mut task)
                .await
                .is_err()
            {
                tracing::warn!("Push reader did not stop in time, aborting");
                task.abort();
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
