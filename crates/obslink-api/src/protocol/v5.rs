//! obs-websocket 5.x wire format.
//!
//! Every frame is an `{ "op": <u32>, "d": <object> }` envelope. Requests
//! and responses are correlated by `requestId`; notifications arrive as
//! op 5 events. The handshake is Hello → Identify → Identified, with an
//! optional challenge/response inside Identify.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

use crate::auth;
use crate::client::WsStream;
use crate::error::{self, Error};
use crate::protocol::{Incoming, ProtocolEvent};

pub(crate) const RPC_VERSION: u32 = 1;

/// obs-websocket op codes.
pub(crate) mod op {
    pub const HELLO: u32 = 0;
    pub const IDENTIFY: u32 = 1;
    pub const IDENTIFIED: u32 = 2;
    pub const EVENT: u32 = 5;
    pub const REQUEST: u32 = 6;
    pub const REQUEST_RESPONSE: u32 = 7;
}

// ── Envelope ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub op: u32,
    pub d: Value,
}

#[derive(Debug, Deserialize)]
struct Hello {
    authentication: Option<AuthChallenge>,
}

#[derive(Debug, Deserialize)]
struct AuthChallenge {
    challenge: String,
    salt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestResponse {
    request_id: String,
    request_status: RequestStatus,
    #[serde(default)]
    response_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RequestStatus {
    result: bool,
    code: u32,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventEnvelope {
    event_type: String,
    #[serde(default)]
    event_data: Option<Value>,
}

// ── Response schemas ────────────────────────────────────────────────
//
// Explicit per-request schemas, validated where the payload enters the
// process. The dynamic `Value` never leaves this crate.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneList {
    pub scenes: Vec<SceneEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneEntry {
    pub scene_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CurrentProgramScene {
    pub current_program_scene_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneCollectionList {
    pub current_scene_collection_name: String,
    pub scene_collections: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneItemList {
    pub scene_items: Vec<SceneItemEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneItemEntry {
    pub scene_item_id: i64,
    pub source_name: String,
    #[serde(default)]
    pub input_kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneItemId {
    pub scene_item_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneItemEnabled {
    pub scene_item_enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SourceFilterList {
    pub filters: Vec<FilterEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FilterEntry {
    pub filter_name: String,
    pub filter_enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SourceFilter {
    pub filter_enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StreamStatus {
    pub output_active: bool,
}

// ── Handshake ───────────────────────────────────────────────────────

/// Hello → Identify → Identified, before the reader task starts.
pub(crate) async fn handshake(ws: &mut WsStream, password: Option<&str>) -> Result<(), Error> {
    let hello = read_envelope(ws).await?;
    if hello.op != op::HELLO {
        return Err(Error::Handshake {
            message: format!("expected Hello, got op {}", hello.op),
        });
    }
    let hello: Hello = serde_json::from_value(hello.d).map_err(error::deserialization)?;

    let mut identify = json!({ "rpcVersion": RPC_VERSION });
    if let Some(challenge) = hello.authentication {
        let Some(password) = password.filter(|p| !p.is_empty()) else {
            return Err(Error::AuthenticationRequired);
        };
        identify["authentication"] =
            auth::challenge_response(password, &challenge.challenge, &challenge.salt).into();
    }

    let frame = json!({ "op": op::IDENTIFY, "d": identify }).to_string();
    ws.send(Message::Text(frame.into()))
        .await
        .map_err(|e| Error::Connect(e.to_string()))?;

    let identified = read_envelope(ws).await?;
    if identified.op != op::IDENTIFIED {
        return Err(Error::AuthenticationFailed {
            message: format!("expected Identified, got op {}", identified.op)
        });
    }
    Ok(())
}

/// Read the next envelope, skipping pings. A closed stream mid-handshake
/// is how the remote refuses a connection (e.g. auth rejection).
async fn read_envelope(ws: &mut WsStream) -> Result<Envelope, Error> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(text.as_str()).map_err(error::deserialization);
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(Error::Handshake {
                    message: "remote closed the connection during handshake".into(),
                });
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(Error::Connect(e.to_string())),
        }
    }
}

// ── Request framing ─────────────────────────────────────────────────

pub(crate) fn frame_request(id: &str, request_type: &str, data: Option<Value>) -> String {
    let mut d = json!({
        "requestType": request_type,
        "requestId": id,
    });
    if let Some(data) = data {
        d["requestData"] = data;
    }
    json!({ "op": op::REQUEST, "d": d }).to_string()
}

// ── Incoming classification ─────────────────────────────────────────

pub(crate) fn classify(text: &str) -> Incoming {
    let Ok(envelope) = serde_json::from_str::<Envelope>(text) else {
        return Incoming::Ignored;
    };

    match envelope.op {
        op::REQUEST_RESPONSE => {
            let Ok(response) = serde_json::from_value::<RequestResponse>(envelope.d) else {
                return Incoming::Ignored;
            };
            let result = if response.request_status.result {
                Ok(response.response_data.unwrap_or(Value::Null))
            } else {
                Err(Error::RequestFailed {
                    code: response.request_status.code,
                    comment: response
                        .request_status
                        .comment
                        .unwrap_or_else(|| "request rejected".into()),
                })
            };
            Incoming::Response {
                id: response.request_id,
                result,
            }
        }
        op::EVENT => {
            let Ok(event) = serde_json::from_value::<EventEnvelope>(envelope.d) else {
                return Incoming::Ignored;
            };
            parse_event(&event.event_type, event.event_data.as_ref())
        }
        _ => Incoming::Ignored,
    }
}

fn parse_event(event_type: &str, data: Option<&Value>) -> Incoming {
    match event_type {
        "CurrentProgramSceneChanged" => {
            match data.and_then(|d| d.get("sceneName")).and_then(Value::as_str) {
                Some(scene_name) => Incoming::Event(ProtocolEvent::SceneChanged {
                    scene_name: scene_name.to_string(),
                }),
                None => Incoming::Ignored,
            }
        }
        "StreamStateChanged" => {
            match data
                .and_then(|d| d.get("outputActive"))
                .and_then(Value::as_bool)
            {
                Some(active) => Incoming::Event(ProtocolEvent::StreamStateChanged { active }),
                None => Incoming::Ignored,
            }
        }
        _ => Incoming::Ignored,
    }
}
