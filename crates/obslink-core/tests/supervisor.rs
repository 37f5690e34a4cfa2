//! End-to-end tests: supervisor, facade, and relay against the
//! in-process mock remote.

use std::time::Duration;

use obslink_api::testing::{MockObs, MockObsServer};
use obslink_core::{
    ConnectionConfig, ConnectionState, ObsSession, ProtocolVersion, RemoteEvent, SourceAction,
    SourceRef,
};
use pretty_assertions::assert_eq;
use tokio::time::timeout;

const FAST_RETRY: Duration = Duration::from_millis(25);
const WAIT: Duration = Duration::from_secs(2);

fn config_for(server: &MockObsServer) -> ConnectionConfig {
    ConnectionConfig {
        host: "127.0.0.1".into(),
        port: Some(server.addr().port()),
        protocol: ProtocolVersion::V5,
        reconnect_delay: FAST_RETRY,
        ..ConnectionConfig::default()
    }
}

async fn connected_session(server: &MockObsServer) -> ObsSession {
    let session = ObsSession::new(config_for(server));
    session.initialize().await.expect("initialize");
    wait_for(&session, ConnectionState::Connected).await;
    session
}

async fn wait_for(session: &ObsSession, target: ConnectionState) {
    let mut state = session.state();
    timeout(WAIT, state.wait_for(|s| *s == target))
        .await
        .expect("state change timed out")
        .expect("state channel closed");
}

#[tokio::test]
async fn operations_while_disconnected_are_neutral() {
    let server = MockObs::new()
        .scene("Main", &[(1, "Webcam", "dshow_input")])
        .start()
        .await;

    // Session exists but was never initialized.
    let session = ObsSession::new(config_for(&server));
    assert!(!session.is_ready());

    assert_eq!(session.get_scene_list().await, Vec::<String>::new());
    assert_eq!(session.get_current_scene_name().await, None);
    assert_eq!(session.get_source_data().await, None);
    assert_eq!(session.get_all_sources().await, None);
    assert!(!session.get_streaming_status().await);
    session.set_current_scene("Main").await;
    session.start_streaming().await;
    session
        .apply_source_visibility(&SourceRef::Name("Webcam".into()), SourceAction::Toggle)
        .await;

    // Nothing ever reached the server, not even a connection.
    assert_eq!(server.connection_attempts(), 0);
}

#[tokio::test]
async fn connects_and_reconnects_after_server_close() {
    let server = MockObs::new().scene("Main", &[]).start().await;
    let session = connected_session(&server).await;
    assert!(session.is_ready());
    assert_eq!(server.connection_attempts(), 1);

    server.close_all();
    wait_for(&session, ConnectionState::Disconnected).await;
    assert!(!session.is_ready());

    // Exactly one reconnect arms per disconnect.
    wait_for(&session, ConnectionState::Connected).await;
    assert_eq!(server.connection_attempts(), 2);
    assert_eq!(session.get_current_scene_name().await.as_deref(), Some("Main"));

    session.shutdown().await;
    assert!(!session.is_ready());
}

#[tokio::test]
async fn toggle_reads_current_state_then_inverts() {
    let server = MockObs::new()
        .scene("Main", &[(4, "Webcam", "dshow_input")])
        .start()
        .await;
    let session = connected_session(&server).await;

    let source = SourceRef::Name("Webcam".into());
    session
        .apply_source_visibility(&source, SourceAction::Toggle)
        .await;

    // Default visibility is true, so the toggle wrote false.
    assert_eq!(session.get_source_visibility(&source).await, Some(false));
    assert_eq!(server.request_count("SetSceneItemEnabled"), 1);
}

#[tokio::test]
async fn toggle_skips_target_when_probe_fails() {
    let server = MockObs::new()
        .scene("Main", &[(4, "Webcam", "dshow_input")])
        .fail_request("GetSceneItemEnabled")
        .start()
        .await;
    let session = connected_session(&server).await;

    session
        .apply_source_visibility(&SourceRef::Name("Webcam".into()), SourceAction::Toggle)
        .await;

    // Unknown current state: no write was attempted.
    assert_eq!(server.request_count("SetSceneItemEnabled"), 0);
}

#[tokio::test]
async fn filter_toggle_follows_the_same_contract() {
    let server = MockObs::new()
        .scene("Main", &[(1, "Webcam", "dshow_input")])
        .filters("Webcam", &[("Blur", false)])
        .start()
        .await;
    let session = connected_session(&server).await;

    session
        .apply_filter_action("Webcam", "Blur", SourceAction::Toggle)
        .await;
    assert_eq!(session.get_filter_enabled("Webcam", "Blur").await, Some(true));

    session
        .apply_filter_action("Webcam", "Blur", SourceAction::Disable)
        .await;
    assert_eq!(session.get_filter_enabled("Webcam", "Blur").await, Some(false));
}

#[tokio::test]
async fn double_initialize_does_not_duplicate_subscriptions() {
    let server = MockObs::new().scene("Main", &[]).start().await;
    let session = connected_session(&server).await;

    // Second initialize while connected is a no-op.
    session.initialize().await.expect("re-initialize");
    assert_eq!(server.connection_attempts(), 1);

    let mut events = session.events();
    server.emit_event(
        "CurrentProgramSceneChanged",
        serde_json::json!({ "sceneName": "BRB" }),
    );

    let event = timeout(WAIT, events.recv()).await.expect("event").unwrap();
    assert_eq!(
        event,
        RemoteEvent::SceneChanged {
            scene_name: "BRB".into()
        }
    );
    // One notification, one delivery.
    assert!(timeout(Duration::from_millis(100), events.recv()).await.is_err());
}

#[tokio::test]
async fn aggregate_drops_sources_whose_filter_lookup_fails() {
    let server = MockObs::new()
        .scene(
            "Main",
            &[
                (1, "Webcam", "dshow_input"),
                (2, "Broken", "ffmpeg_source"),
                (3, "Overlay", "image_source"),
            ],
        )
        .filters("Webcam", &[("Blur", true)])
        .fail_filters_for("Broken")
        .start()
        .await;
    let session = connected_session(&server).await;

    let sources = session.get_all_sources().await.expect("sources");
    let names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();
    // The failed source is dropped; the scene pseudo-source survives.
    assert_eq!(names, ["Webcam", "Overlay", "Main"]);

    let scene = sources.iter().find(|s| s.name == "Main").unwrap();
    assert_eq!(scene.kind, "scene");
    assert_eq!(scene.item_id, None);

    let with_filters = session.get_sources_with_filters().await.expect("sources");
    let names: Vec<_> = with_filters.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Webcam"]);
}

#[tokio::test]
async fn audio_enumeration_keeps_only_probed_inputs() {
    let server = MockObs::new()
        .scene(
            "Main",
            &[(1, "Mic", "wasapi_input_capture"), (2, "Overlay", "image_source")],
        )
        .audio_source("Mic")
        .start()
        .await;
    let session = connected_session(&server).await;

    let audio = session.get_audio_sources().await.expect("audio sources");
    let names: Vec<_> = audio.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Mic"]);
}

#[tokio::test]
async fn scene_switch_relays_exactly_one_event() {
    let server = MockObs::new()
        .scene("Scene A", &[])
        .scene("Scene B", &[])
        .start()
        .await;
    let session = connected_session(&server).await;

    assert_eq!(session.get_scene_list().await, ["Scene A", "Scene B"]);

    let mut events = session.events();
    session.set_current_scene("Scene B").await;

    let event = timeout(WAIT, events.recv()).await.expect("event").unwrap();
    assert_eq!(
        event,
        RemoteEvent::SceneChanged {
            scene_name: "Scene B".into()
        }
    );
    assert!(timeout(Duration::from_millis(100), events.recv()).await.is_err());
    assert_eq!(
        session.get_current_scene_name().await.as_deref(),
        Some("Scene B")
    );
}

#[tokio::test]
async fn stream_lifecycle_relays_started_and_stopped() {
    let server = MockObs::new().scene("Main", &[]).start().await;
    let session = connected_session(&server).await;
    let mut events = session.events();

    assert!(!session.get_streaming_status().await);
    session.start_streaming().await;
    assert!(session.get_streaming_status().await);
    session.stop_streaming().await;

    let first = timeout(WAIT, events.recv()).await.expect("event").unwrap();
    assert_eq!(first, RemoteEvent::StreamStarted);
    let second = timeout(WAIT, events.recv()).await.expect("event").unwrap();
    assert_eq!(second, RemoteEvent::StreamStopped);
}

#[tokio::test]
async fn refused_handshake_keeps_retrying_without_fault() {
    let server = MockObs::new().deny_handshake().start().await;
    let session = ObsSession::new(config_for(&server));

    // Initialize succeeds even though the remote refuses everything.
    session.initialize().await.expect("initialize");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!session.is_ready());
    // Multiple attempts observed, one per retry window.
    assert!(server.connection_attempts() >= 2);

    session.shutdown().await;
}

#[tokio::test]
async fn wrong_addressing_scheme_yields_neutral_result() {
    let server = MockObs::new()
        .scene("Main", &[(4, "Webcam", "dshow_input")])
        .start()
        .await;
    let session = connected_session(&server).await;

    let legacy_ref = SourceRef::Item {
        scene: "Main".into(),
        item_id: 4,
    };
    assert_eq!(session.get_source_visibility(&legacy_ref).await, None);
    assert_eq!(server.request_count("GetSceneItemEnabled"), 0);
}

#[tokio::test]
async fn replace_config_moves_to_the_new_remote() {
    let first = MockObs::new().scene("Old", &[]).start().await;
    let second = MockObs::new().scene("New", &[]).start().await;

    let session = ObsSession::new(config_for(&first));
    session.initialize().await.expect("initialize");
    wait_for(&session, ConnectionState::Connected).await;
    assert_eq!(session.get_current_scene_name().await.as_deref(), Some("Old"));

    session
        .replace_config(config_for(&second))
        .await
        .expect("replace config");
    wait_for(&session, ConnectionState::Connected).await;
    assert_eq!(session.get_current_scene_name().await.as_deref(), Some("New"));
    assert_eq!(second.connection_attempts(), 1);
}
