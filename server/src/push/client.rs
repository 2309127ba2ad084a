//! tokio-tungstenite adapter for the push channel.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use shelf_engine::UserId;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{ClientFrame, PushError, PushSource, ServerFrame, Subscription};
use crate::config::Config;

const TOPIC: &str = "bookmarks";
const HEARTBEAT: Duration = Duration::from_secs(30);
const ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// [`PushSource`] over a WebSocket.
#[derive(Debug, Clone)]
pub struct WsPushSource {
    url: String,
    access_token: String,
}

impl WsPushSource {
    pub fn new(config: &Config) -> Self {
        Self {
            url: config.push_url.clone(),
            access_token: config.access_token.clone(),
        }
    }
}

impl PushSource for WsPushSource {
    async fn subscribe(&self, user: &UserId) -> Result<Subscription, PushError> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| PushError::Connect(e.to_string()))?;
        let (mut sink, mut stream) = ws_stream.split();

        let subscribe = ClientFrame::subscribe(TOPIC, user, &self.access_token);
        sink.send(Message::Text(subscribe.to_json().into()))
            .await
            .map_err(|e| PushError::Connect(e.to_string()))?;

        tokio::time::timeout(ACK_TIMEOUT, await_ack(&mut stream))
            .await
            .map_err(|_| PushError::Connect("no subscription ack".to_string()))??;

        tracing::info!(url = %self.url, user = %user, "Push subscription established");

        let (tx, rx) = mpsc::channel(64);
        let (close_tx, mut close_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(HEARTBEAT);
            heartbeat.tick().await; // skip immediate first tick

            loop {
                tokio::select! {
                    _ = &mut close_rx => {
                        let unsubscribe = ClientFrame::Unsubscribe { topic: TOPIC.to_string() };
                        let _ = sink.send(Message::Text(unsubscribe.to_json().into())).await;
                        let _ = sink.close().await;
                        tracing::debug!("Push subscription released");
                        break;
                    }
                    _ = heartbeat.tick() => {
                        let frame = ClientFrame::Heartbeat.to_json();
                        if sink.send(Message::Text(frame.into())).await.is_err() {
                            let _ = tx.send(Err(PushError::Closed)).await;
                            break;
                        }
                    }
                    msg = stream.next() => {
                        let text = match msg {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Close(_))) | None => {
                                let _ = tx.send(Err(PushError::Closed)).await;
                                break;
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                let _ = tx.send(Err(PushError::Connect(e.to_string()))).await;
                                break;
                            }
                        };

                        match ServerFrame::parse(&text).and_then(ServerFrame::into_payload) {
                            Ok(Some(payload)) => {
                                if tx.send(Ok(payload)).await.is_err() {
                                    break;
                                }
                            }
                            Ok(None) => {}
                            Err(PushError::Protocol(reason)) => {
                                tracing::warn!(%reason, "Ignoring malformed push frame");
                            }
                            Err(e) => {
                                let _ = tx.send(Err(e)).await;
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(Subscription::new(rx, close_tx, task))
    }
}

async fn await_ack<S>(stream: &mut S) -> Result<(), PushError>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        match msg.map_err(|e| PushError::Connect(e.to_string()))? {
            Message::Text(text) => match ServerFrame::parse(&text)? {
                ServerFrame::Subscribed { topic } => {
                    tracing::debug!(topic = %topic, "Subscription acknowledged");
                    return Ok(());
                }
                ServerFrame::Error { message } => return Err(PushError::Rejected(message)),
                _ => continue,
            },
            Message::Close(_) => return Err(PushError::Closed),
            _ => continue,
        }
    }
    Err(PushError::Closed)
}
