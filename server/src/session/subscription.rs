//! The push loop: keeps one subscription open and feeds it to the inbox.

use shelf_engine::{ChangeEvent, UserId};
use tokio::sync::{broadcast, mpsc, watch};

use super::{Command, Notice, NoticeLevel, SessionSettings};
use crate::push::{PushError, PushSource};

enum Step {
    Stop,
    Event(Option<Result<shelf_engine::PushPayload, PushError>>),
}

/// Subscribe, forward, and resubscribe with capped exponential backoff
/// until `stop` flips or the session goes away.
pub(super) async fn push_loop<P: PushSource>(
    source: P,
    user: UserId,
    inbox: mpsc::WeakSender<Command>,
    notices: broadcast::Sender<Notice>,
    settings: SessionSettings,
    mut stop: watch::Receiver<bool>,
) {
    let mut backoff = settings.resubscribe_min;
    let mut interrupted = false;

    loop {
        if *stop.borrow() {
            return;
        }

        let attempt = tokio::select! {
            _ = stop.changed() => return,
            attempt = source.subscribe(&user) => attempt,
        };

        match attempt {
            Ok(mut subscription) => {
                backoff = settings.resubscribe_min;
                if interrupted {
                    tracing::info!("Push subscription restored");
                    let _ = notices.send(Notice::new(NoticeLevel::Info, "Live updates restored"));
                }

                let failure = loop {
                    let step = tokio::select! {
                        _ = stop.changed() => Step::Stop,
                        next = subscription.next() => Step::Event(next),
                    };

                    match step {
                        Step::Stop => {
                            subscription.unsubscribe().await;
                            return;
                        }
                        Step::Event(Some(Ok(payload))) => {
                            let Some(tx) = inbox.upgrade() else {
                                subscription.unsubscribe().await;
                                return;
                            };
                            if tx.send(Command::Apply(ChangeEvent::pushed(payload))).await.is_err() {
                                subscription.unsubscribe().await;
                                return;
                            }
                        }
                        Step::Event(Some(Err(e))) => break e,
                        Step::Event(None) => break PushError::Closed,
                    }
                };

                subscription.unsubscribe().await;
                tracing::warn!(error = %failure, retry_in = ?backoff, "Push subscription lost");
                let _ = notices.send(
                    Notice::new(NoticeLevel::Warning, "Live updates interrupted, reconnecting")
                        .with_detail(failure),
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, retry_in = ?backoff, "Push subscribe failed");
                let _ = notices.send(
                    Notice::new(NoticeLevel::Warning, "Live updates unavailable, retrying")
                        .with_detail(e),
                );
            }
        }

        interrupted = true;
        tokio::select! {
            _ = stop.changed() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(settings.resubscribe_max);
    }
}
