//! Integration tests against the in-process mock remote.

use futures_util::{SinkExt, StreamExt};
use obslink_api::testing::MockObs;
use obslink_api::{Error, ProtocolEvent, ProtocolVersion, RemoteSession, SourceRef};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

async fn connect(server: &obslink_api::testing::MockObsServer) -> RemoteSession {
    RemoteSession::connect(&server.uri(), None, ProtocolVersion::V5)
        .await
        .expect("connect to mock server")
}

#[tokio::test]
async fn scene_queries_preserve_declared_order() {
    let server = MockObs::new()
        .scene("Intro", &[(1, "Title", "text_gdiplus")])
        .scene("Gameplay", &[(1, "Capture", "game_capture"), (2, "Webcam", "dshow_input")])
        .scene("BRB", &[])
        .start()
        .await;
    let session = connect(&server).await;

    let scenes: Vec<_> = session
        .scene_list()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(scenes, ["Intro", "Gameplay", "BRB"]);
    assert_eq!(session.current_scene().await.unwrap(), "Intro");

    session.set_current_scene("BRB").await.unwrap();
    assert_eq!(session.current_scene().await.unwrap(), "BRB");
}

#[tokio::test]
async fn source_data_maps_every_scene() {
    let server = MockObs::new()
        .scene("Main", &[(4, "Webcam", "dshow_input"), (7, "Overlay", "image_source")])
        .scene("BRB", &[(2, "Music", "ffmpeg_source")])
        .start()
        .await;
    let session = connect(&server).await;

    let data = session.source_data().await.unwrap();
    let scenes: Vec<_> = data.keys().cloned().collect();
    assert_eq!(scenes, ["Main", "BRB"]);
    assert_eq!(data["Main"].len(), 2);
    assert_eq!(data["Main"][0].item_id, 4);
    assert_eq!(data["Main"][0].name, "Webcam");
    assert_eq!(data["BRB"][0].name, "Music");
    // One item-list call per scene on the current protocol.
    assert_eq!(server.request_count("GetSceneItemList"), 2);
}

#[tokio::test]
async fn name_addressing_resolves_against_current_scene() {
    let server = MockObs::new()
        .scene("Main", &[(4, "Webcam", "dshow_input")])
        .start()
        .await;
    let session = connect(&server).await;

    let source = SourceRef::Name("Webcam".into());
    assert!(session.source_visibility(&source).await.unwrap());
    session.set_source_visibility(&source, false).await.unwrap();
    assert!(!session.source_visibility(&source).await.unwrap());

    // Each name lookup resolves scene + item id first.
    assert_eq!(server.request_count("GetSceneItemId"), 3);
}

#[tokio::test]
async fn item_addressing_is_rejected_on_v5() {
    let server = MockObs::new()
        .scene("Main", &[(4, "Webcam", "dshow_input")])
        .start()
        .await;
    let session = connect(&server).await;

    let source = SourceRef::Item {
        scene: "Main".into(),
        item_id: 4,
    };
    let err = session.source_visibility(&source).await.unwrap_err();
    assert!(matches!(err, Error::AddressingScheme { version: "v5", .. }));
    // Rejected locally, before anything reaches the remote.
    assert_eq!(server.request_count("GetSceneItemEnabled"), 0);
}

#[tokio::test]
async fn filters_report_and_update() {
    let server = MockObs::new()
        .scene("Main", &[(1, "Webcam", "dshow_input")])
        .filters("Webcam", &[("Blur", true), ("Color", false)])
        .start()
        .await;
    let session = connect(&server).await;

    let filters = session.source_filters("Webcam").await.unwrap();
    let names: Vec<_> = filters.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["Blur", "Color"]);

    assert!(!session.filter_enabled("Webcam", "Color").await.unwrap());
    session.set_filter_enabled("Webcam", "Color", true).await.unwrap();
    assert!(session.filter_enabled("Webcam", "Color").await.unwrap());
}

#[tokio::test]
async fn rejected_request_surfaces_code_and_comment() {
    let server = MockObs::new()
        .scene("Main", &[])
        .start()
        .await;
    let session = connect(&server).await;

    let err = session.set_current_scene("Nope").await.unwrap_err();
    match err {
        Error::RequestFailed { code, comment } => {
            assert_eq!(code, 600);
            assert!(comment.contains("Nope"));
        }
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_and_virtual_cam_controls() {
    let server = MockObs::new().scene("Main", &[]).streaming(false).start().await;
    let session = connect(&server).await;

    assert!(!session.stream_status().await.unwrap());
    session.start_stream().await.unwrap();
    assert!(session.stream_status().await.unwrap());
    session.stop_stream().await.unwrap();
    assert!(!session.stream_status().await.unwrap());

    session.start_virtual_cam().await.unwrap();
    session.stop_virtual_cam().await.unwrap();
}

#[tokio::test]
async fn audio_probe_distinguishes_inputs() {
    let server = MockObs::new()
        .scene("Main", &[(1, "Mic", "wasapi_input_capture"), (2, "Overlay", "image_source")])
        .audio_source("Mic")
        .start()
        .await;
    let session = connect(&server).await;

    assert!(session.probe_audio_monitor("Mic").await.is_ok());
    assert!(session.probe_audio_monitor("Overlay").await.is_err());

    session.toggle_source_muted("Mic").await.unwrap();
    session.set_source_muted("Mic", false).await.unwrap();
}

#[tokio::test]
async fn authentication_challenge_roundtrip() {
    let server = MockObs::new()
        .password("hunter2")
        .scene("Main", &[])
        .start()
        .await;

    // No password against an auth-required remote fails locally.
    let err = RemoteSession::connect(&server.uri(), None, ProtocolVersion::V5)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AuthenticationRequired));

    // A wrong password is refused by the remote closing the socket.
    let err = RemoteSession::connect(&server.uri(), Some("wrong"), ProtocolVersion::V5)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Handshake { .. }));

    let session = RemoteSession::connect(&server.uri(), Some("hunter2"), ProtocolVersion::V5)
        .await
        .expect("authenticated connect");
    assert_eq!(session.current_scene().await.unwrap(), "Main");
}

#[tokio::test]
async fn subscribed_events_are_broadcast() {
    let server = MockObs::new().scene("Main", &[]).start().await;
    let session = connect(&server).await;
    let mut events = session.events();

    server.emit_event("CurrentProgramSceneChanged", json!({ "sceneName": "BRB" }));
    let event = events.recv().await.unwrap();
    assert_eq!(
        event,
        ProtocolEvent::SceneChanged {
            scene_name: "BRB".into()
        }
    );

    server.emit_event("StreamStateChanged", json!({ "outputActive": true }));
    let event = events.recv().await.unwrap();
    assert_eq!(event, ProtocolEvent::StreamStateChanged { active: true });

    // Unsubscribed notifications never reach the channel.
    server.emit_event("InputVolumeChanged", json!({ "inputName": "Mic" }));
    server.emit_event("CurrentProgramSceneChanged", json!({ "sceneName": "Main" }));
    let event = events.recv().await.unwrap();
    assert_eq!(
        event,
        ProtocolEvent::SceneChanged {
            scene_name: "Main".into()
        }
    );
}

#[tokio::test]
async fn dropped_connection_fails_further_calls() {
    let server = MockObs::new().scene("Main", &[]).start().await;
    let session = connect(&server).await;

    assert!(!session.closed().is_cancelled());
    server.close_all();
    session.closed().cancelled().await;

    let err = session.current_scene().await.unwrap_err();
    assert!(matches!(err, Error::Closed));
}

#[tokio::test]
async fn denied_handshake_is_a_handshake_error() {
    let server = MockObs::new().deny_handshake().start().await;

    let err = RemoteSession::connect(&server.uri(), None, ProtocolVersion::V5)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Handshake { .. }));
    assert_eq!(server.connection_attempts(), 1);
}

// ── Legacy protocol ─────────────────────────────────────────────────

/// Minimal scripted 4.x remote: flat frames, `GetAuthRequired` handshake.
async fn spawn_v4_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                while let Some(Ok(Message::Text(text))) = ws.next().await {
                    let request: Value = serde_json::from_str(text.as_str()).unwrap();
                    let id = request["message-id"].as_str().unwrap();
                    let response = match request["request-type"].as_str().unwrap() {
                        "GetAuthRequired" => json!({
                            "message-id": id,
                            "status": "ok",
                            "authRequired": false,
                        }),
                        "GetCurrentScene" => json!({
                            "message-id": id,
                            "status": "ok",
                            "name": "Main",
                            "sources": [
                                { "id": 1, "name": "Webcam", "type": "dshow_input", "render": true }
                            ],
                        }),
                        "GetSceneItemProperties" => json!({
                            "message-id": id,
                            "status": "ok",
                            "name": "Webcam",
                            "visible": true,
                        }),
                        other => json!({
                            "message-id": id,
                            "status": "error",
                            "error": format!("unknown request {other}"),
                        }),
                    };
                    ws.send(Message::Text(response.to_string().into()))
                        .await
                        .unwrap();
                }
            });
        }
    });

    format!("ws://{addr}")
}

#[tokio::test]
async fn legacy_session_uses_item_addressing() {
    let uri = spawn_v4_server().await;
    let session = RemoteSession::connect(&uri, None, ProtocolVersion::V4)
        .await
        .expect("legacy connect");

    assert_eq!(session.current_scene().await.unwrap(), "Main");

    let items = session.scene_item_list().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item_id, Some(1));

    let source = SourceRef::Item {
        scene: "Main".into(),
        item_id: 1,
    };
    assert!(session.source_visibility(&source).await.unwrap());

    let err = session
        .source_visibility(&SourceRef::Name("Webcam".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AddressingScheme { version: "v4", .. }));
}
