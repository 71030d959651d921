//! Realtime change feed worker
//!
//! 1. Connect the websocket of the realtime endpoint
//! 2. Join one channel listening to `postgres_changes` on every table
//! 3. Heartbeat every 30s, publish a [`ChangeEvent`] per change frame
//! 4. Reconnect with exponential backoff until cancelled; after a
//!    reconnect a `Resync` event tells listeners they may have missed rows

use super::{ChangeEvent, ChangeKind, SessionToken};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use shared::Table;
use tokio::sync::broadcast;
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Channel topic shared by all console tabs
const TOPIC: &str = "realtime:db-all-changes";
/// Initial reconnect delay
const INITIAL_RECONNECT_DELAY_SECS: u64 = 1;
/// Max reconnect delay
const MAX_RECONNECT_DELAY_SECS: u64 = 60;
/// Channel heartbeat interval
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

pub struct RealtimeWorker {
    url: String,
    tables: Vec<Table>,
    access_token: SessionToken,
    tx: broadcast::Sender<ChangeEvent>,
    shutdown: CancellationToken,
    next_ref: u64,
}

impl RealtimeWorker {
    pub fn new(
        url: String,
        tables: Vec<Table>,
        tx: broadcast::Sender<ChangeEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            url,
            tables,
            access_token: SessionToken::default(),
            tx,
            shutdown,
            next_ref: 0,
        }
    }

    /// Read on every (re)join, so a refreshed session is picked up
    pub fn with_access_token(mut self, token: SessionToken) -> Self {
        self.access_token = token;
        self
    }

    /// Main run loop: connect, listen, reconnect on failure
    pub async fn run(mut self) {
        tracing::info!(tables = self.tables.len(), "RealtimeWorker started");
        let mut reconnect_delay = Duration::from_secs(INITIAL_RECONNECT_DELAY_SECS);
        let mut connected_before = false;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let connecting = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = tokio_tungstenite::connect_async(self.url.as_str()) => result,
            };

            match connecting {
                Ok((ws, _response)) => {
                    reconnect_delay = Duration::from_secs(INITIAL_RECONNECT_DELAY_SECS);
                    if connected_before {
                        // 断线期间的变更无从得知，让订阅方全量刷新
                        let _ = self
                            .tx
                            .send(ChangeEvent::new(Table::Orders, ChangeKind::Resync));
                    }
                    connected_before = true;
                    self.run_session(ws).await;
                }
                Err(e) => {
                    tracing::warn!(
                        delay_secs = reconnect_delay.as_secs(),
                        "Realtime connection failed: {e}"
                    );
                }
            }

            if self.tx.receiver_count() == 0 {
                tracing::info!("No change feed listeners left");
                break;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(reconnect_delay) => {},
            }
            reconnect_delay =
                (reconnect_delay * 2).min(Duration::from_secs(MAX_RECONNECT_DELAY_SECS));
        }

        tracing::info!("RealtimeWorker stopped");
    }

    /// Run a single websocket session until disconnect or shutdown
    async fn run_session<S>(&mut self, ws: S)
    where
        S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
            + Unpin,
    {
        let (mut ws_sink, mut ws_stream) = ws.split();

        let join = self.join_message();
        if let Err(e) = ws_sink.send(Message::Text(join.to_string().into())).await {
            tracing::warn!("Failed to join realtime channel: {e}");
            return;
        }

        let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        heartbeat.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = ws_sink.close().await;
                    return;
                }

                _ = heartbeat.tick() => {
                    let frame = heartbeat_frame(self.next_ref());
                    if ws_sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                        tracing::warn!("Realtime heartbeat failed, disconnecting");
                        return;
                    }
                }

                msg = ws_stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_frame(&text),
                        Some(Ok(Message::Ping(data))) => {
                            let _ = ws_sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Realtime socket closed by server");
                            return;
                        }
                        Some(Err(e)) => {
                            tracing::warn!("Realtime socket error: {e}");
                            return;
                        }
                        None => {
                            tracing::info!("Realtime stream ended");
                            return;
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn handle_frame(&self, text: &str) {
        let frame: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Invalid realtime frame: {e}");
                return;
            }
        };

        if frame["event"] == "phx_reply" && frame["payload"]["status"] == "error" {
            tracing::error!(response = %frame["payload"]["response"], "Realtime join rejected");
            return;
        }

        if let Some(event) = parse_change(&frame)
            && self.tx.send(event).is_err()
        {
            tracing::debug!("No listeners for change event");
        }
    }

    fn next_ref(&mut self) -> String {
        self.next_ref += 1;
        self.next_ref.to_string()
    }

    pub(crate) fn join_message(&mut self) -> Value {
        let msg_ref = self.next_ref();
        let token = self.access_token.read().clone();
        join_frame(&self.tables, token.as_deref(), msg_ref)
    }
}

/// Channel join listening to every change of `tables`
pub(crate) fn join_frame(tables: &[Table], access_token: Option<&str>, msg_ref: String) -> Value {
    let changes: Vec<Value> = tables
        .iter()
        .map(|t| json!({"event": "*", "schema": "public", "table": t.as_str()}))
        .collect();

    let mut payload = json!({
        "config": {
            "broadcast": {"self": false},
            "presence": {"key": ""},
            "postgres_changes": changes,
        }
    });
    if let Some(token) = access_token {
        payload["access_token"] = Value::String(token.to_string());
    }

    json!({
        "topic": TOPIC,
        "event": "phx_join",
        "payload": payload,
        "ref": msg_ref,
    })
}

pub(crate) fn heartbeat_frame(msg_ref: String) -> Value {
    json!({"topic": "phoenix", "event": "heartbeat", "payload": {}, "ref": msg_ref})
}

/// Extract the changed table from a `postgres_changes` frame
pub(crate) fn parse_change(frame: &Value) -> Option<ChangeEvent> {
    if frame["event"] != "postgres_changes" {
        return None;
    }
    let data = &frame["payload"]["data"];
    let table: Table = data["table"].as_str()?.parse().ok()?;
    let kind = match data["type"].as_str()? {
        "INSERT" => ChangeKind::Insert,
        "UPDATE" => ChangeKind::Update,
        "DELETE" => ChangeKind::Delete,
        _ => return None,
    };
    Some(ChangeEvent::new(table, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_lists_every_table() {
        let frame = join_frame(&Table::ALL, Some("jwt"), "1".into());
        assert_eq!(frame["event"], "phx_join");
        assert_eq!(frame["topic"], TOPIC);
        let changes = frame["payload"]["config"]["postgres_changes"]
            .as_array()
            .unwrap();
        assert_eq!(changes.len(), 7);
        assert_eq!(changes[6]["table"], "time_logs");
        assert_eq!(frame["payload"]["access_token"], "jwt");
    }

    #[test]
    fn test_parse_change_frames() {
        let frame = json!({
            "topic": TOPIC,
            "event": "postgres_changes",
            "payload": {"data": {"table": "time_logs", "type": "UPDATE", "record": {}}},
            "ref": null
        });
        assert_eq!(
            parse_change(&frame),
            Some(ChangeEvent::new(Table::TimeLogs, ChangeKind::Update))
        );

        let unknown_table = json!({
            "event": "postgres_changes",
            "payload": {"data": {"table": "invoices", "type": "INSERT"}}
        });
        assert_eq!(parse_change(&unknown_table), None);
        assert_eq!(parse_change(&heartbeat_frame("2".into())), None);
    }
}
