//! Websocket client for the local print agent
//!
//! Frames are JSON text messages. Our requests are `{uid, call, params}` and
//! the agent answers `{uid, result}` or `{uid, error}`. The agent can also
//! call us: a `security.sign` frame carries a challenge that is answered
//! through the attached [`SecurityProvider`].

use crate::agent::{PrintAgent, PrintData, SecurityProvider};
use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shared::signing::SignRequest;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<Result<Value, String>>>>>;

/// Default local agent endpoint
pub const DEFAULT_AGENT_URL: &str = "ws://localhost:8182";

/// Call names understood by the agent
pub mod calls {
    pub const CERTIFICATE: &str = "security.certificate";
    pub const SIGN: &str = "security.sign";
    pub const FIND_PRINTERS: &str = "printers.find";
    pub const PRINT: &str = "print";
}

#[derive(Serialize)]
struct RequestFrame<'a> {
    uid: &'a str,
    call: &'a str,
    params: Value,
}

#[derive(Serialize)]
struct ReplyFrame {
    uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct IncomingFrame {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    call: Option<String>,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// One live websocket session
struct Session {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Pending,
    alive: Arc<AtomicBool>,
}

impl Session {
    fn spawn(ws: WsStream, security: Option<Arc<dyn SecurityProvider>>) -> Arc<Self> {
        let (mut sink, mut stream) = ws.split();
        let (outgoing, mut rx) = mpsc::unbounded_channel::<Message>();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        let writer_alive = alive.clone();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = sink.send(msg).await {
                    warn!("Print agent write failed: {e}");
                    break;
                }
                if closing {
                    break;
                }
            }
            writer_alive.store(false, Ordering::SeqCst);
        });

        let reader_tx = outgoing.clone();
        let reader_pending = pending.clone();
        let reader_alive = alive.clone();
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        handle_frame(&text, &reader_pending, &reader_tx, security.as_ref());
                    }
                    Ok(Message::Ping(data)) => {
                        let _ = reader_tx.send(Message::Pong(data));
                    }
                    Ok(Message::Close(_)) => {
                        info!("Print agent closed the connection");
                        break;
                    }
                    Err(e) => {
                        warn!("Print agent connection error: {e}");
                        break;
                    }
                    _ => {}
                }
            }
            reader_alive.store(false, Ordering::SeqCst);
            // 断线后所有等待中的调用立即失败
            reader_pending.lock().clear();
        });

        Arc::new(Self {
            outgoing,
            pending,
            alive,
        })
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

fn handle_frame(
    text: &str,
    pending: &Pending,
    outgoing: &mpsc::UnboundedSender<Message>,
    security: Option<&Arc<dyn SecurityProvider>>,
) {
    let frame: IncomingFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            warn!("Invalid frame from print agent: {e}");
            return;
        }
    };

    if let Some(call) = frame.call {
        let Some(uid) = frame.uid else {
            warn!(%call, "Print agent call without uid");
            return;
        };
        if call != calls::SIGN {
            send_reply(outgoing, uid, Err(format!("Unsupported call: {call}")));
            return;
        }

        let challenge: SignRequest = match serde_json::from_value(frame.params) {
            Ok(c) => c,
            Err(e) => {
                send_reply(outgoing, uid, Err(format!("Invalid challenge: {e}")));
                return;
            }
        };
        let security = security.cloned();
        let outgoing = outgoing.clone();
        tokio::spawn(async move {
            let reply = match security {
                Some(provider) => provider.sign(&challenge).await.map(Value::String),
                None => Err(PrintError::SigningDisabled("No security provider".into())),
            };
            if let Err(e) = &reply {
                debug!(error = %e, "Challenge not signed; agent will prompt");
            }
            send_reply(&outgoing, uid, reply.map_err(|e| e.to_string()));
        });
        return;
    }

    let Some(uid) = frame.uid else {
        debug!("Ignoring print agent frame without uid");
        return;
    };
    let Some(tx) = pending.lock().remove(&uid) else {
        debug!(%uid, "Reply for unknown request");
        return;
    };
    let outcome = match frame.error {
        Some(Value::String(e)) => Err(e),
        Some(Value::Null) | None => Ok(frame.result.unwrap_or(Value::Null)),
        Some(other) => Err(other.to_string()),
    };
    let _ = tx.send(outcome);
}

fn send_reply(outgoing: &mpsc::UnboundedSender<Message>, uid: String, reply: Result<Value, String>) {
    let frame = match reply {
        Ok(result) => ReplyFrame {
            uid,
            result: Some(result),
            error: None,
        },
        Err(error) => ReplyFrame {
            uid,
            result: None,
            error: Some(error),
        },
    };
    match serde_json::to_string(&frame) {
        Ok(json) => {
            let _ = outgoing.send(Message::Text(json.into()));
        }
        Err(e) => warn!("Failed to encode reply frame: {e}"),
    }
}

/// Print agent reached over a local websocket
pub struct WsPrintAgent {
    url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    security: Option<Arc<dyn SecurityProvider>>,
    session: Mutex<Option<Arc<Session>>>,
    connect_lock: tokio::sync::Mutex<()>,
}

impl WsPrintAgent {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            security: None,
            session: Mutex::new(None),
            connect_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_security(mut self, provider: Arc<dyn SecurityProvider>) -> Self {
        self.security = Some(provider);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Close the session; the next call must reconnect
    pub fn disconnect(&self) {
        if let Some(session) = self.session.lock().take() {
            let _ = session.outgoing.send(Message::Close(None));
        }
    }

    fn active_session(&self) -> PrintResult<Arc<Session>> {
        self.session
            .lock()
            .clone()
            .filter(|s| s.is_alive())
            .ok_or_else(|| PrintError::Connection("Not connected to print agent".into()))
    }

    async fn call(&self, session: &Session, call: &str, params: Value) -> PrintResult<Value> {
        let uid = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        session.pending.lock().insert(uid.clone(), tx);

        let frame = serde_json::to_string(&RequestFrame {
            uid: &uid,
            call,
            params,
        })?;
        if session.outgoing.send(Message::Text(frame.into())).is_err() {
            session.pending.lock().remove(&uid);
            return Err(PrintError::Connection("Print agent connection closed".into()));
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(error))) => Err(PrintError::Agent(error)),
            Ok(Err(_)) => Err(PrintError::Connection(
                "Print agent connection closed".into(),
            )),
            Err(_) => {
                session.pending.lock().remove(&uid);
                Err(PrintError::Timeout(format!("{call} got no reply")))
            }
        }
    }
}

#[async_trait]
impl PrintAgent for WsPrintAgent {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&self) -> PrintResult<()> {
        let _guard = self.connect_lock.lock().await;
        if self.is_active() {
            return Ok(());
        }

        let connecting = tokio_tungstenite::connect_async(self.url.as_str());
        let (ws, _response) = tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| PrintError::Timeout("Print agent did not answer".into()))?
            .map_err(|e| PrintError::Connection(format!("Is the print agent running? {e}")))?;

        let session = Session::spawn(ws, self.security.clone());
        *self.session.lock() = Some(session.clone());
        info!("Connected to print agent");

        match self.security.as_ref().and_then(|s| s.certificate()) {
            Some(certificate) => {
                if let Err(e) = self
                    .call(&session, calls::CERTIFICATE, json!({ "certificate": certificate }))
                    .await
                {
                    warn!(error = %e, "Print agent did not accept the certificate");
                }
            }
            None => debug!("No certificate to present; jobs will need confirmation"),
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| s.is_alive())
    }

    async fn find_printers(&self) -> PrintResult<Vec<String>> {
        let session = self.active_session()?;
        let value = self.call(&session, calls::FIND_PRINTERS, json!({})).await?;
        match value {
            Value::String(name) => Ok(vec![name]),
            other => serde_json::from_value(other)
                .map_err(|e| PrintError::Agent(format!("Unexpected printer list: {e}"))),
        }
    }

    #[instrument(skip(self, jobs), fields(jobs = jobs.len()))]
    async fn print(&self, printer: &str, jobs: &[PrintData]) -> PrintResult<()> {
        let session = self.active_session()?;
        self.call(
            &session,
            calls::PRINT,
            json!({ "printer": { "name": printer }, "data": jobs }),
        )
        .await?;
        Ok(())
    }
}
