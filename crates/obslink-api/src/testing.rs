//! In-process obs-websocket 5.x server for integration tests.
//!
//! [`MockObs`] builds the remote's fixture state (scenes, filters,
//! collections, streaming flag) and [`MockObsServer`] serves it over a
//! real websocket on an ephemeral port, including the Hello/Identify
//! handshake and challenge authentication. Tests can inject request
//! failures, push notifications, and drop every live connection to
//! exercise reconnect paths.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::auth;
use crate::protocol::v5::op;

const CHALLENGE: &str = "mock-challenge";
const SALT: &str = "mock-salt";

// ── Fixture builder ─────────────────────────────────────────────────

/// Fixture state for one mock remote. Build, then [`start`](Self::start).
#[derive(Default)]
pub struct MockObs {
    password: Option<String>,
    deny_handshake: bool,
    scenes: Vec<(String, Vec<(i64, String, String)>)>,
    current_scene: Option<String>,
    collections: Vec<String>,
    current_collection: Option<String>,
    filters: HashMap<String, Vec<(String, bool)>>,
    audio_sources: HashSet<String>,
    streaming: bool,
    fail_requests: HashSet<String>,
    fail_filters_for: HashSet<String>,
}

impl MockObs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require challenge authentication with this password.
    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Close every connection before sending Hello, as a remote that
    /// refuses service does.
    pub fn deny_handshake(mut self) -> Self {
        self.deny_handshake = true;
        self
    }

    /// Add a scene with its `(item_id, source_name, input_kind)` items.
    /// The first added scene becomes the current program scene.
    pub fn scene(mut self, name: &str, sources: &[(i64, &str, &str)]) -> Self {
        if self.current_scene.is_none() {
            self.current_scene = Some(name.to_string());
        }
        self.scenes.push((
            name.to_string(),
            sources
                .iter()
                .map(|(id, n, k)| (*id, n.to_string(), k.to_string()))
                .collect(),
        ));
        self
    }

    pub fn collections(mut self, current: &str, all: &[&str]) -> Self {
        self.current_collection = Some(current.to_string());
        self.collections = all.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn filters(mut self, source: &str, filters: &[(&str, bool)]) -> Self {
        self.filters.insert(
            source.to_string(),
            filters
                .iter()
                .map(|(n, e)| (n.to_string(), *e))
                .collect(),
        );
        self
    }

    /// Mark a source as audio-capable: the audio-monitor probe succeeds
    /// for it and fails for everything else.
    pub fn audio_source(mut self, name: &str) -> Self {
        self.audio_sources.insert(name.to_string());
        self
    }

    pub fn streaming(mut self, active: bool) -> Self {
        self.streaming = active;
        self
    }

    /// Reject every request of this type with an injected failure.
    pub fn fail_request(mut self, request_type: &str) -> Self {
        self.fail_requests.insert(request_type.to_string());
        self
    }

    /// Reject `GetSourceFilterList` for this source only.
    pub fn fail_filters_for(mut self, source: &str) -> Self {
        self.fail_filters_for.insert(source.to_string());
        self
    }

    /// Bind an ephemeral port and start serving connections.
    pub async fn start(self) -> MockObsServer {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");

        let state = Arc::new(Mutex::new(State {
            fixture: self,
            visibility: HashMap::new(),
            muted: HashMap::new(),
            request_counts: HashMap::new(),
            connection_attempts: 0,
        }));
        let (push_tx, _) = broadcast::channel(64);

        let server = MockObsServer {
            addr,
            state: Arc::clone(&state),
            push_tx: push_tx.clone(),
        };

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&state);
                let push_rx = push_tx.subscribe();
                tokio::spawn(serve_connection(stream, state, push_rx));
            }
        });

        server
    }
}

// ── Server handle ───────────────────────────────────────────────────

#[derive(Clone)]
enum Push {
    Event { event_type: String, data: Value },
    Close,
}

struct State {
    fixture: MockObs,
    visibility: HashMap<(String, i64), bool>,
    muted: HashMap<String, bool>,
    request_counts: HashMap<String, usize>,
    connection_attempts: usize,
}

/// Handle to a running mock remote.
pub struct MockObsServer {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
    push_tx: broadcast::Sender<Push>,
}

impl MockObsServer {
    /// `ws://` endpoint for clients to connect to.
    pub fn uri(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// The bound socket address, for callers that build their own endpoint.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// How many requests of this type have been served.
    pub fn request_count(&self, request_type: &str) -> usize {
        self.lock()
            .request_counts
            .get(request_type)
            .copied()
            .unwrap_or(0)
    }

    /// How many websocket connections have been attempted, counting
    /// denied handshakes.
    pub fn connection_attempts(&self) -> usize {
        self.lock().connection_attempts
    }

    /// Push an op-5 event to every live connection.
    pub fn emit_event(&self, event_type: &str, data: Value) {
        let _ = self.push_tx.send(Push::Event {
            event_type: event_type.to_string(),
            data,
        });
    }

    /// Send a close frame on every live connection.
    pub fn close_all(&self) {
        let _ = self.push_tx.send(Push::Close);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Connection handling ─────────────────────────────────────────────

async fn serve_connection(
    stream: TcpStream,
    state: Arc<Mutex<State>>,
    mut push_rx: broadcast::Receiver<Push>,
) {
    let deny = {
        let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
        guard.connection_attempts += 1;
        guard.fixture.deny_handshake
    };

    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    if deny {
        let _ = ws.close(None).await;
        return;
    }

    if !handshake(&mut ws, &state).await {
        let _ = ws.close(None).await;
        return;
    }

    loop {
        tokio::select! {
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let Ok(envelope) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    if envelope["op"] != op::REQUEST {
                        continue;
                    }
                    let d = &envelope["d"];
                    let request_type = d["requestType"].as_str().unwrap_or("").to_string();
                    let request_id = d["requestId"].as_str().unwrap_or("").to_string();
                    let data = d.get("requestData").cloned().unwrap_or(Value::Null);

                    let (response, events) = {
                        let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
                        *guard.request_counts.entry(request_type.clone()).or_insert(0) += 1;
                        handle_request(&mut guard, &request_type, &data)
                    };

                    let frame = response_frame(&request_id, &request_type, response);
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                    for (event_type, data) in events {
                        let frame = event_frame(&event_type, data);
                        if ws.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = ws.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            push = push_rx.recv() => match push {
                Ok(Push::Event { event_type, data }) => {
                    let frame = event_frame(&event_type, data);
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Ok(Push::Close) => {
                    let _ = ws.close(None).await;
                    break;
                }
                Err(_) => {}
            },
        }
    }
}

async fn handshake(
    ws: &mut WebSocketStream<TcpStream>,
    state: &Arc<Mutex<State>>,
) -> bool {
    let password = {
        let guard = state.lock().unwrap_or_else(|e| e.into_inner());
        guard.fixture.password.clone()
    };

    let mut hello = json!({ "obsWebSocketVersion": "5.1.0", "rpcVersion": 1 });
    if password.is_some() {
        hello["authentication"] = json!({ "challenge": CHALLENGE, "salt": SALT });
    }
    let frame = json!({ "op": op::HELLO, "d": hello }).to_string();
    if ws.send(Message::Text(frame.into())).await.is_err() {
        return false;
    }

    let identify = loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                    return false;
                };
                break value;
            }
            Some(Ok(_)) => {}
            _ => return false,
        }
    };
    if identify["op"] != op::IDENTIFY {
        return false;
    }

    if let Some(password) = password {
        let expected = auth::challenge_response(&password, CHALLENGE, SALT);
        if identify["d"]["authentication"].as_str() != Some(expected.as_str()) {
            // Real remotes refuse bad auth by closing the socket.
            return false;
        }
    }

    let frame = json!({ "op": op::IDENTIFIED, "d": { "negotiatedRpcVersion": 1 } }).to_string();
    ws.send(Message::Text(frame.into())).await.is_ok()
}

// ── Request dispatch ────────────────────────────────────────────────

type RequestResult = Result<Value, (u32, String)>;

fn response_frame(request_id: &str, request_type: &str, result: RequestResult) -> String {
    let d = match result {
        Ok(data) => json!({
            "requestId": request_id,
            "requestType": request_type,
            "requestStatus": { "result": true, "code": 100 },
            "responseData": data,
        }),
        Err((code, comment)) => json!({
            "requestId": request_id,
            "requestType": request_type,
            "requestStatus": { "result": false, "code": code, "comment": comment },
        }),
    };
    json!({ "op": op::REQUEST_RESPONSE, "d": d }).to_string()
}

fn event_frame(event_type: &str, data: Value) -> String {
    json!({
        "op": op::EVENT,
        "d": { "eventType": event_type, "eventIntent": 1, "eventData": data },
    })
    .to_string()
}

fn handle_request(
    state: &mut State,
    request_type: &str,
    data: &Value,
) -> (RequestResult, Vec<(String, Value)>) {
    if state.fixture.fail_requests.contains(request_type) {
        return (Err((700, "injected failure".into())), Vec::new());
    }

    let mut events = Vec::new();
    let result = match request_type {
        "GetSceneList" => Ok(json!({
            "currentProgramSceneName": state.fixture.current_scene,
            "scenes": state
                .fixture
                .scenes
                .iter()
                .enumerate()
                .map(|(i, (name, _))| json!({ "sceneName": name, "sceneIndex": i }))
                .collect::<Vec<_>>(),
        })),
        "GetCurrentProgramScene" => match &state.fixture.current_scene {
            Some(name) => Ok(json!({ "currentProgramSceneName": name })),
            None => Err((600, "no current scene".into())),
        },
        "SetCurrentProgramScene" => {
            let name = data["sceneName"].as_str().unwrap_or("");
            if state.fixture.scenes.iter().any(|(n, _)| n == name) {
                state.fixture.current_scene = Some(name.to_string());
                events.push((
                    "CurrentProgramSceneChanged".to_string(),
                    json!({ "sceneName": name }),
                ));
                Ok(Value::Null)
            } else {
                Err((600, format!("no scene named {name}")))
            }
        }
        "GetSceneCollectionList" => Ok(json!({
            "currentSceneCollectionName": state.fixture.current_collection,
            "sceneCollections": state.fixture.collections,
        })),
        "SetCurrentSceneCollection" => {
            let name = data["sceneCollectionName"].as_str().unwrap_or("");
            if state.fixture.collections.iter().any(|c| c == name) {
                state.fixture.current_collection = Some(name.to_string());
                Ok(Value::Null)
            } else {
                Err((600, format!("no scene collection named {name}")))
            }
        }
        "GetSceneItemList" => {
            let scene = data["sceneName"].as_str().unwrap_or("");
            match state.fixture.scenes.iter().find(|(n, _)| n == scene) {
                Some((_, items)) => Ok(json!({
                    "sceneItems": items
                        .iter()
                        .map(|(id, name, kind)| json!({
                            "sceneItemId": id,
                            "sourceName": name,
                            "inputKind": kind,
                        }))
                        .collect::<Vec<_>>(),
                })),
                None => Err((600, format!("no scene named {scene}"))),
            }
        }
        "GetSceneItemId" => {
            let scene = data["sceneName"].as_str().unwrap_or("");
            let source = data["sourceName"].as_str().unwrap_or("");
            state
                .fixture
                .scenes
                .iter()
                .find(|(n, _)| n == scene)
                .and_then(|(_, items)| items.iter().find(|(_, name, _)| name == source))
                .map(|(id, _, _)| json!({ "sceneItemId": id }))
                .ok_or_else(|| (600, format!("no source named {source} in {scene}")))
        }
        "GetSceneItemEnabled" => {
            let scene = data["sceneName"].as_str().unwrap_or("").to_string();
            let item_id = data["sceneItemId"].as_i64().unwrap_or(-1);
            let enabled = state
                .visibility
                .get(&(scene, item_id))
                .copied()
                .unwrap_or(true);
            Ok(json!({ "sceneItemEnabled": enabled }))
        }
        "SetSceneItemEnabled" => {
            let scene = data["sceneName"].as_str().unwrap_or("").to_string();
            let item_id = data["sceneItemId"].as_i64().unwrap_or(-1);
            let enabled = data["sceneItemEnabled"].as_bool().unwrap_or(true);
            state.visibility.insert((scene, item_id), enabled);
            Ok(Value::Null)
        }
        "GetSourceFilterList" => {
            let source = data["sourceName"].as_str().unwrap_or("");
            if state.fixture.fail_filters_for.contains(source) {
                Err((600, format!("no source named {source}")))
            } else {
                let filters = state.fixture.filters.get(source).cloned().unwrap_or_default();
                Ok(json!({
                    "filters": filters
                        .iter()
                        .map(|(name, enabled)| json!({
                            "filterName": name,
                            "filterEnabled": enabled,
                        }))
                        .collect::<Vec<_>>(),
                }))
            }
        }
        "GetSourceFilter" => {
            let source = data["sourceName"].as_str().unwrap_or("");
            let filter = data["filterName"].as_str().unwrap_or("");
            state
                .fixture
                .filters
                .get(source)
                .and_then(|fs| fs.iter().find(|(name, _)| name == filter))
                .map(|(_, enabled)| json!({ "filterEnabled": enabled }))
                .ok_or_else(|| (600, format!("no filter named {filter} on {source}")))
        }
        "SetSourceFilterEnabled" => {
            let source = data["sourceName"].as_str().unwrap_or("");
            let filter = data["filterName"].as_str().unwrap_or("");
            let enabled = data["filterEnabled"].as_bool().unwrap_or(false);
            match state
                .fixture
                .filters
                .get_mut(source)
                .and_then(|fs| fs.iter_mut().find(|(name, _)| name == filter))
            {
                Some(entry) => {
                    entry.1 = enabled;
                    Ok(Value::Null)
                }
                None => Err((600, format!("no filter named {filter} on {source}"))),
            }
        }
        "ToggleInputMute" => {
            let input = data["inputName"].as_str().unwrap_or("").to_string();
            let muted = state.muted.entry(input).or_insert(false);
            *muted = !*muted;
            Ok(json!({ "inputMuted": *muted }))
        }
        "SetInputMute" => {
            let input = data["inputName"].as_str().unwrap_or("").to_string();
            let muted = data["inputMuted"].as_bool().unwrap_or(false);
            state.muted.insert(input, muted);
            Ok(Value::Null)
        }
        "GetInputAudioMonitorType" => {
            let input = data["inputName"].as_str().unwrap_or("");
            if state.fixture.audio_sources.contains(input) {
                Ok(json!({ "monitorType": "OBS_MONITORING_TYPE_NONE" }))
            } else {
                Err((604, format!("{input} is not an input")))
            }
        }
        "GetStreamStatus" => Ok(json!({
            "outputActive": state.fixture.streaming,
            "outputReconnecting": false,
        })),
        "StartStream" => {
            state.fixture.streaming = true;
            events.push((
                "StreamStateChanged".to_string(),
                json!({ "outputActive": true, "outputState": "OBS_WEBSOCKET_OUTPUT_STARTED" }),
            ));
            Ok(Value::Null)
        }
        "StopStream" => {
            state.fixture.streaming = false;
            events.push((
                "StreamStateChanged".to_string(),
                json!({ "outputActive": false, "outputState": "OBS_WEBSOCKET_OUTPUT_STOPPED" }),
            ));
            Ok(Value::Null)
        }
        "StartVirtualCam" | "StopVirtualCam" => Ok(Value::Null),
        other => Err((204, format!("unknown request type {other}"))),
    };

    (result, events)
}
