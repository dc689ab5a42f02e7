//! One DevTools protocol session over a WebSocket.
//!
//! Calls are strictly sequential: a request is written, then frames are read
//! until the response with the matching id arrives. Events seen on the way
//! are buffered for [`CdpConnection::take_events`].

use std::time::Duration;

use futures::{FutureExt, SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::errors::SurfaceError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on a single protocol call.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// An unsolicited protocol notification.
#[derive(Clone, Debug, PartialEq)]
pub struct CdpEvent {
    /// Event name, e.g. `Page.loadEventFired`.
    pub method: String,
    /// Event payload.
    pub params: Value,
}

#[derive(Debug, PartialEq)]
enum Incoming {
    Response { id: u64, result: Result<Value, String> },
    Event(CdpEvent),
}

fn parse_incoming(text: &str) -> Option<Incoming> {
    let value: Value = serde_json::from_str(text).ok()?;
    if let Some(id) = value.get("id").and_then(Value::as_u64) {
        let result = match value.get("error") {
            Some(err) => Err(err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown protocol error")
                .to_owned()),
            None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
        return Some(Incoming::Response { id, result });
    }
    let method = value.get("method")?.as_str()?.to_owned();
    let params = value.get("params").cloned().unwrap_or(Value::Null);
    Some(Incoming::Event(CdpEvent { method, params }))
}

/// A connected protocol session for one page target.
pub struct CdpConnection {
    ws: WsStream,
    next_id: u64,
    events: Vec<CdpEvent>,
    timeout: Duration,
}

impl CdpConnection {
    /// Open the session at `ws_url`.
    pub async fn connect(ws_url: &str) -> Result<Self, SurfaceError> {
        let (ws, _) = connect_async(ws_url).await?;
        debug!(ws_url, "devtools session opened");
        Ok(Self {
            ws,
            next_id: 0,
            events: Vec::new(),
            timeout: CALL_TIMEOUT,
        })
    }

    /// Override the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `method` and wait for its result.
    pub async fn call(&mut self, method: &str, params: Value) -> Result<Value, SurfaceError> {
        self.next_id += 1;
        let id = self.next_id;
        let request = json!({ "id": id, "method": method, "params": params });
        self.ws.send(Message::Text(request.to_string().into())).await?;
        trace!(id, method, "devtools call sent");

        let deadline = Instant::now() + self.timeout;
        loop {
            let next = tokio::time::timeout_at(deadline, self.ws.next())
                .await
                .map_err(|_| SurfaceError::Transport(format!("{method} timed out")))?;
            let message = next
                .ok_or_else(|| SurfaceError::Transport("devtools session closed".into()))??;
            match self.accept(message)? {
                Some((rid, result)) if rid == id => {
                    return result.map_err(|e| SurfaceError::Protocol(format!("{method}: {e}")));
                }
                Some((rid, _)) => trace!(rid, "discarding stale response"),
                None => {}
            }
        }
    }

    /// Read whatever frames are already available without waiting.
    pub fn pump(&mut self) -> Result<(), SurfaceError> {
        loop {
            match self.ws.next().now_or_never() {
                None => return Ok(()),
                Some(None) => {
                    return Err(SurfaceError::Transport("devtools session closed".into()));
                }
                Some(Some(message)) => {
                    let _ = self.accept(message?)?;
                }
            }
        }
    }

    /// Events buffered since the last call.
    pub fn take_events(&mut self) -> Vec<CdpEvent> {
        std::mem::take(&mut self.events)
    }

    /// Close the socket.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }

    /// Buffer events; hand back responses.
    fn accept(
        &mut self,
        message: Message,
    ) -> Result<Option<(u64, Result<Value, String>)>, SurfaceError> {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => {
                return Err(SurfaceError::Transport("devtools session closed".into()));
            }
            _ => return Ok(None),
        };
        match parse_incoming(text.as_str()) {
            Some(Incoming::Response { id, result }) => Ok(Some((id, result))),
            Some(Incoming::Event(event)) => {
                self.events.push(event);
                Ok(None)
            }
            None => {
                debug!("ignoring unparseable devtools frame");
                Ok(None)
            }
        }
    }
}
