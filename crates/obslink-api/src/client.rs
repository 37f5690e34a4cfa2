//! Persistent websocket connection to one OBS instance.
//!
//! One [`ObsClient`] owns one connection: the version-specific handshake
//! runs before the reader task starts, then the reader correlates
//! responses to pending requests by request id and broadcasts subscribed
//! notifications. The transport's close is the sole disconnect signal,
//! surfaced through [`ObsClient::closed`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::Error;
use crate::protocol::{Incoming, ProtocolEvent, ProtocolVersion, v4, v5};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const EVENT_CHANNEL_CAPACITY: usize = 256;

type Pending = HashMap<String, oneshot::Sender<Result<Value, Error>>>;

/// A live, authenticated connection speaking one protocol version.
///
/// Cheaply cloneable. All requests are funneled through [`call`](Self::call);
/// notifications fan out through [`events`](Self::events).
#[derive(Debug, Clone)]
pub struct ObsClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    version: ProtocolVersion,
    writer: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    pending: Mutex<Pending>,
    event_tx: broadcast::Sender<ProtocolEvent>,
    closed: CancellationToken,
}

impl ObsClient {
    /// Connect and authenticate against `endpoint` (a `ws://` URL).
    ///
    /// Performs the full handshake for the requested protocol version;
    /// on success the connection is ready for requests and already
    /// subscribed to notifications.
    pub async fn connect(
        endpoint: &str,
        password: Option<&str>,
        version: ProtocolVersion,
    ) -> Result<Self, Error> {
        let (mut ws, _response) = connect_async(endpoint)
            .await
            .map_err(|e| Error::Connect(e.to_string()))?;

        match version {
            ProtocolVersion::V5 => v5::handshake(&mut ws, password).await?,
            ProtocolVersion::V4 => v4::handshake(&mut ws, password).await?,
        }
        debug!(%version, endpoint, "handshake complete");

        let (writer, reader) = ws.split();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let inner = Arc::new(ClientInner {
            version,
            writer: tokio::sync::Mutex::new(writer),
            pending: Mutex::new(HashMap::new()),
            event_tx,
            closed: CancellationToken::new(),
        });

        tokio::spawn(reader_task(reader, Arc::clone(&inner)));

        Ok(Self { inner })
    }

    /// The protocol version negotiated at connect time.
    pub fn version(&self) -> ProtocolVersion {
        self.inner.version
    }

    /// A token cancelled when the transport observes connection-closed.
    pub fn closed(&self) -> CancellationToken {
        self.inner.closed.clone()
    }

    /// Subscribe to the remote notifications this client listens for.
    pub fn events(&self) -> broadcast::Receiver<ProtocolEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Execute one request and await its response payload.
    ///
    /// The payload is the version's raw success body; typed parsing
    /// happens in [`RemoteSession`](crate::RemoteSession). A dropped
    /// connection resolves every in-flight call to [`Error::Closed`].
    pub async fn call(&self, request_type: &str, data: Option<Value>) -> Result<Value, Error> {
        if self.inner.closed.is_cancelled() {
            return Err(Error::Closed);
        }

        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending_lock().insert(id.clone(), tx);

        let frame = match self.inner.version {
            ProtocolVersion::V5 => v5::frame_request(&id, request_type, data),
            ProtocolVersion::V4 => v4::frame_request(&id, request_type, data),
        };
        trace!(request_type, request_id = %id, "sending request");

        let send_result = {
            let mut writer = self.inner.writer.lock().await;
            writer.send(Message::Text(frame.into())).await
        };
        if let Err(e) = send_result {
            self.pending_lock().remove(&id);
            return Err(Error::Connect(e.to_string()));
        }

        rx.await.map_err(|_| Error::Closed)?
    }

    fn pending_lock(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.inner.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Read frames until the connection drops, routing responses to their
/// pending callers and notifications to the event channel.
async fn reader_task(mut reader: SplitStream<WsStream>, inner: Arc<ClientInner>) {
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let incoming = match inner.version {
                    ProtocolVersion::V5 => v5::classify(text.as_str()),
                    ProtocolVersion::V4 => v4::classify(text.as_str()),
                };
                match incoming {
                    Incoming::Response { id, result } => {
                        let waiter = inner
                            .pending
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .remove(&id);
                        match waiter {
                            Some(tx) => {
                                let _ = tx.send(result);
                            }
                            None => trace!(request_id = %id, "response with no pending caller"),
                        }
                    }
                    Incoming::Event(event) => {
                        // Send errors just mean nobody is subscribed right now.
                        let _ = inner.event_tx.send(event);
                    }
                    Incoming::Ignored => {}
                }
            }
            Ok(Message::Close(_)) => {
                debug!("close frame received");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "websocket read error");
                break;
            }
        }
    }

    // Connection is gone: wake the supervisor and fail in-flight calls.
    inner.closed.cancel();
    let waiters: Vec<_> = {
        let mut pending = inner.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.drain().map(|(_, tx)| tx).collect()
    };
    for tx in waiters {
        let _ = tx.send(Err(Error::Closed));
    }
}
