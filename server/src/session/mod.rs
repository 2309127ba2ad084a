//! The session: a single task that owns the engine.
//!
//! Every state change goes through one `mpsc` inbox, so the engine is only
//! ever touched from this task. Remote calls and the push subscription run
//! in their own tasks and report back through the same inbox. The UI reads
//! the collection from a `watch` channel and failures from a `broadcast`
//! channel; it never sees the engine directly.

mod subscription;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use shelf_engine::{
    Applied, Bookmark, BookmarkId, ChangeEvent, Engine, Entry, PendingId, PendingKind,
    RemoteFailure, RemoteRequest, Settlement, Submission, Timestamp, UserId,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::push::PushSource;
use crate::remote::{RemoteError, RemoteStore};

const INBOX_CAPACITY: usize = 256;
const NOTICE_CAPACITY: usize = 64;
const PUSH_STOP_GRACE: Duration = Duration::from_secs(5);

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Deadline for one remote insert or delete
    pub remote_timeout: Duration,
    /// First resubscribe delay after the push channel drops
    pub resubscribe_min: Duration,
    /// Cap on the resubscribe delay
    pub resubscribe_max: Duration,
    /// How often stale pending operations are swept
    pub sweep_interval: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            remote_timeout: config.remote_timeout,
            resubscribe_min: Duration::from_millis(500),
            resubscribe_max: config.resubscribe_max,
            sweep_interval: config.remote_timeout,
        }
    }

    /// Pending operations older than this are failed by the sweep.
    fn expiry_ms(&self) -> u64 {
        u64::try_from(self.remote_timeout.as_millis().saturating_mul(2)).unwrap_or(u64::MAX)
    }
}

/// What the UI renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    /// Bumped on every visible change
    pub revision: u64,
    /// Newest first; provisional rows included
    pub bookmarks: Vec<Entry>,
    /// Actions still waiting for the store
    pub pending: usize,
}

impl View {
    fn of(engine: &Engine) -> Self {
        Self {
            revision: engine.revision(),
            bookmarks: engine.collection().entries().to_vec(),
            pending: engine.pending_count(),
        }
    }
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            pending: None,
            detail: None,
        }
    }

    fn with_pending(mut self, pending: PendingId) -> Self {
        self.pending = Some(pending);
        self
    }

    fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}

/// Errors seen by callers of a [`SessionHandle`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] shelf_engine::Error),

    #[error("session task has stopped")]
    Stopped,
}

type Reply = oneshot::Sender<Result<PendingId, shelf_engine::Error>>;

enum Command {
    SubmitInsert {
        title: String,
        url: String,
        reply: Reply,
    },
    SubmitDelete {
        id: BookmarkId,
        reply: Reply,
    },
    Apply(ChangeEvent),
    Shutdown,
}

/// Cheap, cloneable access to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inbox: mpsc::Sender<Command>,
    view: watch::Receiver<View>,
    notices: broadcast::Sender<Notice>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::SubmitInsert { title, .. } => write!(f, "SubmitInsert({title:?})"),
            Command::SubmitDelete { id, .. } => write!(f, "SubmitDelete({id})"),
            Command::Apply(event) => write!(f, "Apply({:?})", event.tag()),
            Command::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl SessionHandle {
    /// The collection as of the last change.
    pub fn current(&self) -> View {
        self.view.borrow().clone()
    }

    /// A receiver that wakes on every visible change.
    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.clone()
    }

    /// A receiver for user-facing notices.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Add a bookmark. Returns once it is visible optimistically.
    pub async fn submit_insert(
        &self,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<PendingId, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SubmitInsert {
            title: title.into(),
            url: url.into(),
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| SessionError::Stopped)??)
    }

    /// Delete a bookmark. Returns once it is hidden optimistically.
    pub async fn submit_delete(&self, id: impl Into<BookmarkId>) -> Result<PendingId, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SubmitDelete {
            id: id.into(),
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| SessionError::Stopped)??)
    }

    /// Close the session. Outstanding remote calls still settle before the
    /// task exits.
    pub async fn shutdown(&self) {
        let _ = self.inbox.send(Command::Shutdown).await;
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.inbox
            .send(command)
            .await
            .map_err(|_| SessionError::Stopped)
    }
}

/// The task state behind a [`SessionHandle`].
pub struct Session<S> {
    engine: Engine,
    user: UserId,
    store: Arc<S>,
    settings: SessionSettings,
    inbox: mpsc::WeakSender<Command>,
    view: watch::Sender<View>,
    notices: broadcast::Sender<Notice>,
    push_stop: watch::Sender<bool>,
    push_task: Option<JoinHandle<()>>,
}

impl<S: RemoteStore> Session<S> {
    /// Start a session over `seed` for `user`.
    ///
    /// Returns the handle for the UI layer and the session task, which ends
    /// after [`SessionHandle::shutdown`] once nothing is pending.
    pub fn spawn<P: PushSource>(
        seed: Vec<Bookmark>,
        user: UserId,
        store: S,
        push: P,
        settings: SessionSettings,
    ) -> (SessionHandle, JoinHandle<()>) {
        let engine = Engine::new(seed);
        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
        let (view_tx, view_rx) = watch::channel(View::of(&engine));
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);
        let (push_stop, stop_rx) = watch::channel(false);

        let push_task = tokio::spawn(subscription::push_loop(
            push,
            user.clone(),
            inbox_tx.downgrade(),
            notice_tx.clone(),
            settings.clone(),
            stop_rx,
        ));

        tracing::info!(
            user = %user,
            rows = engine.collection().len(),
            "Session started"
        );

        let session = Session {
            engine,
            user,
            store: Arc::new(store),
            settings,
            inbox: inbox_tx.downgrade(),
            view: view_tx,
            notices: notice_tx.clone(),
            push_stop,
            push_task: Some(push_task),
        };

        let handle = SessionHandle {
            inbox: inbox_tx,
            view: view_rx,
            notices: notice_tx,
        };

        (handle, tokio::spawn(session.run(inbox_rx)))
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<Command>) {
        let mut sweep = tokio::time::interval(self.settings.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sweep.tick().await; // skip immediate first tick

        loop {
            if self.engine.is_closed() && self.engine.pending_count() == 0 {
                break;
            }

            tokio::select! {
                command = inbox.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        // Every handle is gone and nothing is in flight.
                        self.close();
                        break;
                    }
                },
                _ = sweep.tick() => self.sweep(),
            }
        }

        // Any send still blocked in the push loop fails once the inbox is gone.
        drop(inbox);
        if let Some(mut task) = self.push_task.take() {
            if tokio::time::timeout(PUSH_STOP_GRACE, &mut task).await.is_err() {
                task.abort();
            }
        }

        tracing::info!(user = %self.user, "Session ended");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::SubmitInsert { title, url, reply } => {
                let result = self.engine.submit_insert(&title, &url, now_millis());
                let _ = reply.send(self.accept(result));
            }
            Command::SubmitDelete { id, reply } => {
                let result = self.engine.submit_delete(&id, now_millis());
                let _ = reply.send(self.accept(result));
            }
            Command::Apply(event) => self.apply(event),
            Command::Shutdown => self.close(),
        }
    }

    /// Publish an accepted submission and start its remote call.
    fn accept(
        &mut self,
        result: shelf_engine::Result<Submission>,
    ) -> shelf_engine::Result<PendingId> {
        match result {
            Ok(submission) => {
                tracing::debug!(
                    pending = %submission.pending,
                    applied = ?submission.applied,
                    "Accepted user action"
                );
                self.refresh(submission.applied.changed());
                self.dispatch(submission.pending.clone(), submission.request);
                Ok(submission.pending)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Refused user action");
                if e.is_validation() {
                    self.notify(Notice::new(NoticeLevel::Warning, e.to_string()));
                }
                Err(e)
            }
        }
    }

    /// Run the remote call for `pending` and report its settlement.
    fn dispatch(&self, pending: PendingId, request: RemoteRequest) {
        let Some(inbox) = self.inbox.upgrade() else {
            return;
        };
        let store = Arc::clone(&self.store);
        let user = self.user.clone();
        let timeout = self.settings.remote_timeout;

        tokio::spawn(async move {
            let event = match request {
                RemoteRequest::Insert { draft } => {
                    let result = bounded(timeout, store.insert(&draft, &user)).await;
                    ChangeEvent::settled_insert(pending, result)
                }
                RemoteRequest::Delete { id } => {
                    let result = bounded(timeout, store.delete(&id)).await;
                    ChangeEvent::settled_delete(pending, id, result)
                }
            };
            if inbox.send(Command::Apply(event)).await.is_err() {
                tracing::warn!("Session gone before settlement could be applied");
            }
        });
    }

    fn apply(&mut self, event: ChangeEvent) {
        let tag = event.tag();
        let action = match &event {
            ChangeEvent::Settled {
                pending,
                settlement: Settlement::Failed { .. },
            } => self.describe(pending),
            _ => None,
        };

        let applied = self.engine.apply(event);
        tracing::debug!(?tag, ?applied, "Applied change event");
        self.report(&applied, action);
        self.refresh(applied.changed());
    }

    /// Fail operations whose remote call never came back.
    fn sweep(&mut self) {
        let now = now_millis();
        let expiry = self.settings.expiry_ms();
        let stale: Vec<_> = self
            .engine
            .pending()
            .expired(now, expiry)
            .iter()
            .map(|id| self.describe(id))
            .collect();
        if stale.is_empty() {
            return;
        }

        tracing::warn!(count = stale.len(), "Expiring stale pending operations");
        let mut changed = false;
        for (applied, action) in self.engine.expire(now, expiry).into_iter().zip(stale) {
            changed |= applied.changed();
            self.report(&applied, action);
        }
        self.refresh(changed);
    }

    fn report(&self, applied: &Applied, action: Option<&'static str>) {
        if let Applied::RolledBack {
            pending, failure, ..
        } = applied
        {
            tracing::warn!(pending = %pending, %failure, "Remote call failed, rolled back");
            let message = action.unwrap_or("Failed to save changes");
            self.notify(
                Notice::new(NoticeLevel::Error, message)
                    .with_pending(pending.clone())
                    .with_detail(failure),
            );
        }
    }

    fn describe(&self, pending: &str) -> Option<&'static str> {
        self.engine.pending().get(pending).map(|op| match op.kind {
            PendingKind::Insert => "Failed to add bookmark",
            PendingKind::Delete { .. } => "Failed to delete bookmark",
        })
    }

    fn close(&mut self) {
        if self.engine.is_closed() {
            return;
        }
        self.engine.close();
        let _ = self.push_stop.send(true);
        tracing::info!(
            pending = self.engine.pending_count(),
            "Session closing, draining pending operations"
        );
    }

    /// Republish the view when the rows changed or the pending count moved.
    fn refresh(&self, changed: bool) {
        let stale = self.view.borrow().pending != self.engine.pending_count();
        if changed || stale {
            self.view.send_replace(View::of(&self.engine));
        }
    }

    fn notify(&self, notice: Notice) {
        // No receivers is fine; nobody is watching.
        let _ = self.notices.send(notice);
    }
}

/// Bound a remote call by `timeout` and classify its failure.
async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, RemoteError>>,
) -> Result<T, RemoteFailure> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.into_failure()),
        Err(_) => Err(RemoteFailure::Timeout(timeout.as_secs())),
    }
}

/// Wall-clock milliseconds since the epoch.
pub fn now_millis() -> Timestamp {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
