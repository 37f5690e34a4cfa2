//! Version-neutral operation surface over one live connection.
//!
//! [`RemoteSession`] is the boundary the facade depends on: one typed
//! method per remote capability, dispatched by protocol version to the
//! request shaping and response schemas in [`protocol::v4`] /
//! [`protocol::v5`]. The version is fixed at connect time; callers never
//! see a wire payload.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::client::ObsClient;
use crate::error::{self, Error};
use crate::protocol::{
    Filter, ProtocolEvent, ProtocolVersion, Scene, SceneSource, SourceData, SourceInfo, SourceRef,
    v4, v5,
};

/// Kind assigned to scenes when they are surfaced as pseudo-sources.
pub const SCENE_KIND: &str = "scene";

/// A connected, version-resolved session against one OBS instance.
#[derive(Debug, Clone)]
pub struct RemoteSession {
    client: ObsClient,
}

impl RemoteSession {
    /// Connect, authenticate, and fix the protocol version for this session.
    pub async fn connect(
        endpoint: &str,
        password: Option<&str>,
        version: ProtocolVersion,
    ) -> Result<Self, Error> {
        let client = ObsClient::connect(endpoint, password, version).await?;
        Ok(Self { client })
    }

    pub fn version(&self) -> ProtocolVersion {
        self.client.version()
    }

    /// Cancelled when the transport observes connection-closed.
    pub fn closed(&self) -> CancellationToken {
        self.client.closed()
    }

    /// Subscribe to the session's remote notifications.
    pub fn events(&self) -> broadcast::Receiver<ProtocolEvent> {
        self.client.events()
    }

    async fn call_parsed<T: DeserializeOwned>(
        &self,
        request_type: &str,
        data: Option<Value>,
    ) -> Result<T, Error> {
        let payload = self.client.call(request_type, data).await?;
        serde_json::from_value(payload).map_err(error::deserialization)
    }

    async fn call_unit(&self, request_type: &str, data: Option<Value>) -> Result<(), Error> {
        self.client.call(request_type, data).await.map(|_| ())
    }

    // ── Scenes ──────────────────────────────────────────────────────

    /// All scenes, in the remote's declared order.
    pub async fn scene_list(&self) -> Result<Vec<Scene>, Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                let list: v5::SceneList = self.call_parsed("GetSceneList", None).await?;
                Ok(list
                    .scenes
                    .into_iter()
                    .map(|s| Scene { name: s.scene_name })
                    .collect())
            }
            ProtocolVersion::V4 => {
                let list: v4::SceneList = self.call_parsed("GetSceneList", None).await?;
                Ok(list
                    .scenes
                    .into_iter()
                    .map(|s| Scene { name: s.name })
                    .collect())
            }
        }
    }

    pub async fn current_scene(&self) -> Result<String, Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                let scene: v5::CurrentProgramScene =
                    self.call_parsed("GetCurrentProgramScene", None).await?;
                Ok(scene.current_program_scene_name)
            }
            ProtocolVersion::V4 => {
                let scene: v4::CurrentScene = self.call_parsed("GetCurrentScene", None).await?;
                Ok(scene.name)
            }
        }
    }

    pub async fn set_current_scene(&self, name: &str) -> Result<(), Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                self.call_unit(
                    "SetCurrentProgramScene",
                    Some(json!({ "sceneName": name })),
                )
                .await
            }
            ProtocolVersion::V4 => {
                self.call_unit("SetCurrentScene", Some(json!({ "scene-name": name })))
                    .await
            }
        }
    }

    // ── Scene collections ───────────────────────────────────────────

    pub async fn scene_collections(&self) -> Result<Vec<String>, Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                let list: v5::SceneCollectionList =
                    self.call_parsed("GetSceneCollectionList", None).await?;
                Ok(list.scene_collections)
            }
            ProtocolVersion::V4 => {
                let list: v4::SceneCollectionList =
                    self.call_parsed("ListSceneCollections", None).await?;
                Ok(list.scene_collections.into_iter().map(|c| c.name).collect())
            }
        }
    }

    pub async fn current_scene_collection(&self) -> Result<String, Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                let list: v5::SceneCollectionList =
                    self.call_parsed("GetSceneCollectionList", None).await?;
                Ok(list.current_scene_collection_name)
            }
            ProtocolVersion::V4 => {
                let current: v4::CurrentSceneCollection =
                    self.call_parsed("GetCurrentSceneCollection", None).await?;
                Ok(current.name)
            }
        }
    }

    pub async fn set_current_scene_collection(&self, name: &str) -> Result<(), Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                self.call_unit(
                    "SetCurrentSceneCollection",
                    Some(json!({ "sceneCollectionName": name })),
                )
                .await
            }
            ProtocolVersion::V4 => {
                self.call_unit(
                    "SetCurrentSceneCollection",
                    Some(json!({ "sc-name": name })),
                )
                .await
            }
        }
    }

    // ── Source catalog ──────────────────────────────────────────────

    /// Scene name → ordered `{item_id, name}` pairs, rebuilt per call.
    ///
    /// v4 returns the sources inline with the scene list; v5 requires one
    /// item-list call per scene.
    pub async fn source_data(&self) -> Result<SourceData, Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                let list: v5::SceneList = self.call_parsed("GetSceneList", None).await?;
                let mut data = SourceData::new();
                for scene in list.scenes {
                    let items: v5::SceneItemList = self
                        .call_parsed(
                            "GetSceneItemList",
                            Some(json!({ "sceneName": scene.scene_name })),
                        )
                        .await?;
                    data.insert(
                        scene.scene_name,
                        items
                            .scene_items
                            .into_iter()
                            .map(|i| SceneSource {
                                item_id: i.scene_item_id,
                                name: i.source_name,
                            })
                            .collect(),
                    );
                }
                Ok(data)
            }
            ProtocolVersion::V4 => {
                let list: v4::SceneList = self.call_parsed("GetSceneList", None).await?;
                Ok(list
                    .scenes
                    .into_iter()
                    .map(|scene| {
                        let sources = scene
                            .sources
                            .into_iter()
                            .map(|s| SceneSource {
                                item_id: s.id,
                                name: s.name,
                            })
                            .collect();
                        (scene.name, sources)
                    })
                    .collect())
            }
        }
    }

    /// Sources of the current program scene.
    pub async fn scene_item_list(&self) -> Result<Vec<SourceInfo>, Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                let scene = self.current_scene().await?;
                let items: v5::SceneItemList = self
                    .call_parsed("GetSceneItemList", Some(json!({ "sceneName": scene })))
                    .await?;
                Ok(items
                    .scene_items
                    .into_iter()
                    .map(|i| SourceInfo {
                        name: i.source_name,
                        kind: i.input_kind.unwrap_or_else(|| "unknown".into()),
                        item_id: Some(i.scene_item_id),
                    })
                    .collect())
            }
            ProtocolVersion::V4 => {
                let scene: v4::CurrentScene = self.call_parsed("GetCurrentScene", None).await?;
                Ok(scene
                    .sources
                    .into_iter()
                    .map(|s| SourceInfo {
                        name: s.name,
                        kind: s.kind.unwrap_or_else(|| "unknown".into()),
                        item_id: Some(s.id),
                    })
                    .collect())
            }
        }
    }

    // ── Visibility ──────────────────────────────────────────────────

    pub async fn source_visibility(&self, source: &SourceRef) -> Result<bool, Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                let name = require_name(source)?;
                let (scene, item_id) = self.resolve_item(name).await?;
                let enabled: v5::SceneItemEnabled = self
                    .call_parsed(
                        "GetSceneItemEnabled",
                        Some(json!({ "sceneName": scene, "sceneItemId": item_id })),
                    )
                    .await?;
                Ok(enabled.scene_item_enabled)
            }
            ProtocolVersion::V4 => {
                let (scene, item_id) = require_item(source)?;
                let props: v4::SceneItemProperties = self
                    .call_parsed(
                        "GetSceneItemProperties",
                        Some(json!({ "scene-name": scene, "item": { "id": item_id } })),
                    )
                    .await?;
                Ok(props.visible)
            }
        }
    }

    pub async fn set_source_visibility(
        &self,
        source: &SourceRef,
        visible: bool,
    ) -> Result<(), Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                let name = require_name(source)?;
                let (scene, item_id) = self.resolve_item(name).await?;
                self.call_unit(
                    "SetSceneItemEnabled",
                    Some(json!({
                        "sceneName": scene,
                        "sceneItemId": item_id,
                        "sceneItemEnabled": visible,
                    })),
                )
                .await
            }
            ProtocolVersion::V4 => {
                let (scene, item_id) = require_item(source)?;
                self.call_unit(
                    "SetSceneItemProperties",
                    Some(json!({
                        "scene-name": scene,
                        "item": { "id": item_id },
                        "visible": visible,
                    })),
                )
                .await
            }
        }
    }

    /// v5 name addressing: resolve a source name to its item id in the
    /// current program scene.
    async fn resolve_item(&self, source_name: &str) -> Result<(String, i64), Error> {
        let scene = self.current_scene().await?;
        let id: v5::SceneItemId = self
            .call_parsed(
                "GetSceneItemId",
                Some(json!({ "sceneName": scene, "sourceName": source_name })),
            )
            .await?;
        Ok((scene, id.scene_item_id))
    }

    // ── Filters ─────────────────────────────────────────────────────

    pub async fn source_filters(&self, source_name: &str) -> Result<Vec<Filter>, Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                let list: v5::SourceFilterList = self
                    .call_parsed(
                        "GetSourceFilterList",
                        Some(json!({ "sourceName": source_name })),
                    )
                    .await?;
                Ok(list
                    .filters
                    .into_iter()
                    .map(|f| Filter {
                        name: f.filter_name,
                        enabled: f.filter_enabled,
                    })
                    .collect())
            }
            ProtocolVersion::V4 => {
                let list: v4::SourceFilterList = self
                    .call_parsed(
                        "GetSourceFilters",
                        Some(json!({ "sourceName": source_name })),
                    )
                    .await?;
                Ok(list
                    .filters
                    .into_iter()
                    .map(|f| Filter {
                        name: f.name,
                        enabled: f.enabled,
                    })
                    .collect())
            }
        }
    }

    pub async fn filter_enabled(
        &self,
        source_name: &str,
        filter_name: &str,
    ) -> Result<bool, Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                let filter: v5::SourceFilter = self
                    .call_parsed(
                        "GetSourceFilter",
                        Some(json!({ "sourceName": source_name, "filterName": filter_name })),
                    )
                    .await?;
                Ok(filter.filter_enabled)
            }
            ProtocolVersion::V4 => {
                let filter: v4::SourceFilterInfo = self
                    .call_parsed(
                        "GetSourceFilterInfo",
                        Some(json!({ "sourceName": source_name, "filterName": filter_name })),
                    )
                    .await?;
                Ok(filter.enabled)
            }
        }
    }

    pub async fn set_filter_enabled(
        &self,
        source_name: &str,
        filter_name: &str,
        enabled: bool,
    ) -> Result<(), Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                self.call_unit(
                    "SetSourceFilterEnabled",
                    Some(json!({
                        "sourceName": source_name,
                        "filterName": filter_name,
                        "filterEnabled": enabled,
                    })),
                )
                .await
            }
            ProtocolVersion::V4 => {
                self.call_unit(
                    "SetSourceFilterVisibility",
                    Some(json!({
                        "sourceName": source_name,
                        "filterName": filter_name,
                        "filterEnabled": enabled,
                    })),
                )
                .await
            }
        }
    }

    // ── Audio ───────────────────────────────────────────────────────

    pub async fn toggle_source_muted(&self, source_name: &str) -> Result<(), Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                self.call_unit("ToggleInputMute", Some(json!({ "inputName": source_name })))
                    .await
            }
            ProtocolVersion::V4 => {
                self.call_unit("ToggleMute", Some(json!({ "source": source_name })))
                    .await
            }
        }
    }

    pub async fn set_source_muted(&self, source_name: &str, muted: bool) -> Result<(), Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                self.call_unit(
                    "SetInputMute",
                    Some(json!({ "inputName": source_name, "inputMuted": muted })),
                )
                .await
            }
            ProtocolVersion::V4 => {
                self.call_unit(
                    "SetMute",
                    Some(json!({ "source": source_name, "mute": muted })),
                )
                .await
            }
        }
    }

    /// Probe whether a source exposes the audio-monitor capability.
    /// The remote rejects the request for non-audio sources; the caller
    /// treats any failure as "no audio capability".
    pub async fn probe_audio_monitor(&self, source_name: &str) -> Result<(), Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                self.call_unit(
                    "GetInputAudioMonitorType",
                    Some(json!({ "inputName": source_name })),
                )
                .await
            }
            ProtocolVersion::V4 => {
                self.call_unit(
                    "GetAudioMonitorType",
                    Some(json!({ "sourceName": source_name })),
                )
                .await
            }
        }
    }

    // ── Streaming / virtual camera ──────────────────────────────────

    pub async fn stream_status(&self) -> Result<bool, Error> {
        match self.version() {
            ProtocolVersion::V5 => {
                let status: v5::StreamStatus = self.call_parsed("GetStreamStatus", None).await?;
                Ok(status.output_active)
            }
            ProtocolVersion::V4 => {
                let status: v4::StreamingStatus =
                    self.call_parsed("GetStreamingStatus", None).await?;
                Ok(status.streaming)
            }
        }
    }

    pub async fn start_stream(&self) -> Result<(), Error> {
        match self.version() {
            ProtocolVersion::V5 => self.call_unit("StartStream", None).await,
            ProtocolVersion::V4 => self.call_unit("StartStreaming", None).await,
        }
    }

    pub async fn stop_stream(&self) -> Result<(), Error> {
        match self.version() {
            ProtocolVersion::V5 => self.call_unit("StopStream", None).await,
            ProtocolVersion::V4 => self.call_unit("StopStreaming", None).await,
        }
    }

    pub async fn start_virtual_cam(&self) -> Result<(), Error> {
        // Same request name in both generations (4.9 added it).
        self.call_unit("StartVirtualCam", None).await
    }

    pub async fn stop_virtual_cam(&self) -> Result<(), Error> {
        self.call_unit("StopVirtualCam", None).await
    }
}

// ── Addressing-scheme checks ────────────────────────────────────────

fn require_name(source: &SourceRef) -> Result<&str, Error> {
    match source {
        SourceRef::Name(name) => Ok(name),
        SourceRef::Item { .. } => Err(Error::AddressingScheme {
            version: "v5",
            expected: "a globally unique source name",
        }),
    }
}

fn require_item(source: &SourceRef) -> Result<(&str, i64), Error> {
    match source {
        SourceRef::Item { scene, item_id } => Ok((scene, *item_id)),
        SourceRef::Name(_) => Err(Error::AddressingScheme {
            version: "v4",
            expected: "a scene-scoped numeric item id",
        }),
    }
}
