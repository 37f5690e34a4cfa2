//! obs-websocket 4.x wire format (legacy).
//!
//! Flat JSON frames: requests carry `request-type` + `message-id`,
//! responses echo the `message-id` with `status: "ok" | "error"`, and
//! notifications carry `update-type`. Authentication is a
//! `GetAuthRequired` / `Authenticate` exchange instead of v5's
//! Hello/Identify.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio_tungstenite::tungstenite::Message;

use crate::auth;
use crate::client::WsStream;
use crate::error::{self, Error};
use crate::protocol::{Incoming, ProtocolEvent};

// ── Response schemas ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct SceneList {
    #[serde(rename = "current-scene")]
    #[allow(dead_code)]
    pub current_scene: String,
    pub scenes: Vec<SceneEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SceneEntry {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SceneItemEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SceneItemEntry {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentScene {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SceneItemEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SceneCollectionList {
    #[serde(rename = "scene-collections")]
    pub scene_collections: Vec<SceneCollectionEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SceneCollectionEntry {
    #[serde(rename = "sc-name")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentSceneCollection {
    #[serde(rename = "sc-name")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SceneItemProperties {
    pub visible: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SourceFilterList {
    pub filters: Vec<FilterEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilterEntry {
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SourceFilterInfo {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamingStatus {
    pub streaming: bool,
}

#[derive(Debug, Deserialize)]
struct AuthRequired {
    #[serde(rename = "authRequired")]
    auth_required: bool,
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    salt: Option<String>,
}

// ── Handshake ───────────────────────────────────────────────────────

/// `GetAuthRequired` → (`Authenticate`), before the reader task starts.
pub(crate) async fn handshake(ws: &mut WsStream, password: Option<&str>) -> Result<(), Error> {
    let response = roundtrip(ws, "GetAuthRequired", "handshake-auth", None).await?;
    let auth: AuthRequired = serde_json::from_value(response).map_err(error::deserialization)?;

    if !auth.auth_required {
        return Ok(());
    }

    let Some(password) = password.filter(|p| !p.is_empty()) else {
        return Err(Error::AuthenticationRequired);
    };
    let (Some(challenge), Some(salt)) = (auth.challenge, auth.salt) else {
        return Err(Error::Handshake {
            message: "auth required but challenge/salt missing".into(),
        });
    };

    let auth_response = auth::challenge_response(password, &challenge, &salt);
    roundtrip(
        ws,
        "Authenticate",
        "handshake-authenticate",
        Some(json!({ "auth": auth_response })),
    )
    .await
    .map_err(|e| match e {
        Error::RequestFailed { comment, .. } => Error::AuthenticationFailed { message: comment },
        other => other,
    })?;

    Ok(())
}

/// One request/response exchange on the raw stream, skipping any
/// notification frames that arrive in between.
async fn roundtrip(
    ws: &mut WsStream,
    request_type: &str,
    message_id: &str,
    data: Option<Value>,
) -> Result<Value, Error> {
    let frame = frame_request(message_id, request_type, data);
    ws.send(Message::Text(frame.into()))
        .await
        .map_err(|e| Error::Connect(e.to_string()))?;

    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => match classify(text.as_str()) {
                Incoming::Response { id, result } if id == message_id => return result,
                _ => {}
            },
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
    let mut fields = match data {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    fields.insert("request-type".into(), request_type.into());
    fields.insert("message-id".into(), id.into());
    Value::Object(fields).to_string()
}

// ── Incoming classification ─────────────────────────────────────────

pub(crate) fn classify(text: &str) -> Incoming {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return Incoming::Ignored;
    };

    if let Some(id) = value.get("message-id").and_then(Value::as_str) {
        let id = id.to_string();
        let result = match value.get("status").and_then(Value::as_str) {
            Some("ok") => Ok(value),
            Some(_) => Err(Error::RequestFailed {
                code: 0,
                comment: value
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("request rejected")
                    .to_string(),
            }),
            None => Err(Error::Deserialization {
                message: "response missing status field".into(),
            }),
        };
        return Incoming::Response { id, result };
    }

    match value.get("update-type").and_then(Value::as_str) {
        Some("SwitchScenes") => match value.get("scene-name").and_then(Value::as_str) {
            Some(scene_name) => Incoming::Event(ProtocolEvent::SceneChanged {
                scene_name: scene_name.to_string(),
            }),
            None => Incoming::Ignored,
        },
        Some("StreamStarted") => Incoming::Event(ProtocolEvent::StreamStateChanged { active: true }),
        Some("StreamStopped") => {
            Incoming::Event(ProtocolEvent::StreamStateChanged { active: false })
        }
        _ => Incoming::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_ok_response_returns_whole_body() {
        let frame = json!({
            "message-id": "7",
            "status": "ok",
            "streaming": true
        })
        .to_string();

        match classify(&frame) {
            Incoming::Response { id, result } => {
                assert_eq!(id, "7");
                let status: StreamingStatus = serde_json::from_value(result.unwrap()).unwrap();
                assert!(status.streaming);
            }
            _ => panic!("expected a response"),
        }
    }

    #[test]
    fn classify_error_response() {
        let frame = json!({
            "message-id": "8",
            "status": "error",
            "error": "specified scene doesn't exist"
        })
        .to_string();

        match classify(&frame) {
            Incoming::Response { result, .. } => match result {
                Err(Error::RequestFailed { code, comment }) => {
                    assert_eq!(code, 0);
                    assert_eq!(comment, "specified scene doesn't exist");
                }
                other => panic!("expected RequestFailed, got {other:?}"),
            },
            _ => panic!("expected a response"),
        }
    }

    #[test]
    fn classify_switch_scenes_event() {
        let frame = json!({
            "update-type": "SwitchScenes",
            "scene-name": "Gameplay",
            "sources": []
        })
        .to_string();

        match classify(&frame) {
            Incoming::Event(ProtocolEvent::SceneChanged { scene_name }) => {
                assert_eq!(scene_name, "Gameplay");
            }
            _ => panic!("expected a scene-changed event"),
        }
    }

    #[test]
    fn classify_stream_lifecycle_events() {
        let started = json!({ "update-type": "StreamStarted" }).to_string();
        let stopped = json!({ "update-type": "StreamStopped" }).to_string();

        assert!(matches!(
            classify(&started),
            Incoming::Event(ProtocolEvent::StreamStateChanged { active: true })
        ));
        assert!(matches!(
            classify(&stopped),
            Incoming::Event(ProtocolEvent::StreamStateChanged { active: false })
        ));
    }

    #[test]
    fn request_frame_merges_params() {
        let frame = frame_request(
            "42",
            "SetCurrentScene",
            Some(json!({ "scene-name": "Intro" })),
        );
        let parsed: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["request-type"], "SetCurrentScene");
        assert_eq!(parsed["message-id"], "42");
        assert_eq!(parsed["scene-name"], "Intro");
    }

    #[test]
    fn scene_list_schema_with_inline_sources() {
        let data = json!({
            "current-scene": "Main",
            "scenes": [
                {
                    "name": "Main",
                    "sources": [
                        { "id": 1, "name": "Webcam", "type": "dshow_input", "render": true },
                        { "id": 2, "name": "Overlay", "type": "image_source", "render": false }
                    ]
                },
                { "name": "BRB", "sources": [] }
            ]
        });
        let list: SceneList = serde_json::from_value(data).unwrap();
        assert_eq!(list.scenes.len(), 2);
        assert_eq!(list.scenes[0].sources[0].id, 1);
        assert_eq!(list.scenes[0].sources[1].name, "Overlay");
        assert_eq!(list.scenes[0].sources[0].kind.as_deref(), Some("dshow_input"));
    }

    #[test]
    fn scene_collection_schema() {
        let data = json!({
            "scene-collections": [ { "sc-name": "Default" }, { "sc-name": "Podcast" } ]
        });
        let list: SceneCollectionList = serde_json::from_value(data).unwrap();
        let names: Vec<_> = list.scene_collections.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Default", "Podcast"]);
    }
}
