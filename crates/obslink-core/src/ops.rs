// ── Remote operations facade ──
//
// The host-facing operation surface on `ObsSession`. Contract: an
// operation issued while disconnected returns a neutral empty value
// without touching the transport; a protocol failure while connected is
// logged at error level and yields the same neutral value. No error
// ever crosses this boundary as a fault.

use obslink_api::{Filter, SCENE_KIND, SourceData, SourceRef};
use tracing::{debug, error, warn};

use crate::session::ObsSession;

/// A source with its filters, as returned by the aggregate enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsSource {
    pub name: String,
    /// Source kind, e.g. `"ffmpeg_source"`; `"scene"` for scenes
    /// surfaced as pseudo-sources.
    pub kind: String,
    /// Scene-item id when the enumeration provides one.
    pub item_id: Option<i64>,
    pub filters: Vec<Filter>,
}

/// What to do with a toggleable target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAction {
    Enable,
    Disable,
    /// Read the current state first; skip the target entirely when the
    /// read yields unknown.
    Toggle,
}

impl ObsSession {
    // ── Scenes ──────────────────────────────────────────────────────

    /// Scene names in the remote's declared order. Empty when down.
    pub async fn get_scene_list(&self) -> Vec<String> {
        let Some(remote) = self.remote() else {
            debug!("get_scene_list skipped, not connected");
            return Vec::new();
        };
        match remote.scene_list().await {
            Ok(scenes) => scenes.into_iter().map(|s| s.name).collect(),
            Err(e) => {
                error!(error = %e, "failed to get scene list");
                Vec::new()
            }
        }
    }

    pub async fn get_current_scene_name(&self) -> Option<String> {
        let remote = self.remote()?;
        match remote.current_scene().await {
            Ok(name) => Some(name),
            Err(e) => {
                error!(error = %e, "failed to get current scene");
                None
            }
        }
    }

    pub async fn set_current_scene(&self, name: &str) {
        let Some(remote) = self.remote() else {
            debug!(scene = name, "set_current_scene skipped, not connected");
            return;
        };
        if let Err(e) = remote.set_current_scene(name).await {
            error!(scene = name, error = %e, "failed to set current scene");
        }
    }

    // ── Scene collections ───────────────────────────────────────────

    pub async fn get_scene_collection_list(&self) -> Vec<String> {
        let Some(remote) = self.remote() else {
            return Vec::new();
        };
        match remote.scene_collections().await {
            Ok(collections) => collections,
            Err(e) => {
                error!(error = %e, "failed to get scene collection list");
                Vec::new()
            }
        }
    }

    pub async fn get_current_scene_collection_name(&self) -> Option<String> {
        let remote = self.remote()?;
        match remote.current_scene_collection().await {
            Ok(name) => Some(name),
            Err(e) => {
                error!(error = %e, "failed to get current scene collection");
                None
            }
        }
    }

    pub async fn set_current_scene_collection(&self, name: &str) {
        let Some(remote) = self.remote() else {
            return;
        };
        if let Err(e) = remote.set_current_scene_collection(name).await {
            error!(collection = name, error = %e, "failed to set scene collection");
        }
    }

    // ── Source catalog ──────────────────────────────────────────────

    /// Scene name → ordered sources, rebuilt fresh. `None` when down
    /// or the enumeration fails.
    pub async fn get_source_data(&self) -> Option<SourceData> {
        let remote = self.remote()?;
        match remote.source_data().await {
            Ok(data) => Some(data),
            Err(e) => {
                error!(error = %e, "failed to get source data");
                None
            }
        }
    }

    /// Every source of the current scene plus all scenes as
    /// pseudo-sources, each with its filters.
    ///
    /// A per-source filter failure drops that source and keeps the
    /// rest; only the initial enumeration failing yields `None`.
    pub async fn get_all_sources(&self) -> Option<Vec<ObsSource>> {
        let remote = self.remote()?;

        let items = match remote.scene_item_list().await {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "failed to list scene items");
                return None;
            }
        };
        let scenes = match remote.scene_list().await {
            Ok(scenes) => scenes,
            Err(e) => {
                error!(error = %e, "failed to list scenes");
                return None;
            }
        };

        let mut candidates = items;
        candidates.extend(scenes.into_iter().map(|s| obslink_api::SourceInfo {
            name: s.name,
            kind: SCENE_KIND.to_string(),
            item_id: None,
        }));

        let mut sources = Vec::with_capacity(candidates.len());
        for info in candidates {
            match remote.source_filters(&info.name).await {
                Ok(filters) => sources.push(ObsSource {
                    name: info.name,
                    kind: info.kind,
                    item_id: info.item_id,
                    filters,
                }),
                Err(e) => {
                    warn!(source = %info.name, error = %e, "dropping source, filter lookup failed");
                }
            }
        }
        Some(sources)
    }

    /// The subset of [`get_all_sources`](Self::get_all_sources) that
    /// has at least one filter.
    pub async fn get_sources_with_filters(&self) -> Option<Vec<ObsSource>> {
        let sources = self.get_all_sources().await?;
        Some(
            sources
                .into_iter()
                .filter(|s| !s.filters.is_empty())
                .collect(),
        )
    }

    /// Sources that respond to the audio-monitor probe. A failed probe
    /// excludes that source, never the whole enumeration.
    pub async fn get_audio_sources(&self) -> Option<Vec<ObsSource>> {
        let remote = self.remote()?;
        let sources = self.get_all_sources().await?;

        let mut audio = Vec::new();
        for source in sources {
            if remote.probe_audio_monitor(&source.name).await.is_ok() {
                audio.push(source);
            }
        }
        Some(audio)
    }

    // ── Visibility ──────────────────────────────────────────────────

    pub async fn get_source_visibility(&self, source: &SourceRef) -> Option<bool> {
        let remote = self.remote()?;
        match remote.source_visibility(source).await {
            Ok(visible) => Some(visible),
            Err(e) => {
                error!(source = %source, error = %e, "failed to get source visibility");
                None
            }
        }
    }

    pub async fn set_source_visibility(&self, source: &SourceRef, visible: bool) {
        let Some(remote) = self.remote() else {
            debug!(source = %source, "set_source_visibility skipped, not connected");
            return;
        };
        if let Err(e) = remote.set_source_visibility(source, visible).await {
            error!(source = %source, visible, error = %e, "failed to set source visibility");
        }
    }

    /// Apply an action to a source's visibility. `Toggle` reads the
    /// current state first and skips the source when it is unknown.
    pub async fn apply_source_visibility(&self, source: &SourceRef, action: SourceAction) {
        let visible = match action {
            SourceAction::Enable => true,
            SourceAction::Disable => false,
            SourceAction::Toggle => match self.get_source_visibility(source).await {
                Some(current) => !current,
                None => {
                    warn!(source = %source, "skipping toggle, current visibility unknown");
                    return;
                }
            },
        };
        self.set_source_visibility(source, visible).await;
    }

    // ── Filters ─────────────────────────────────────────────────────

    pub async fn get_source_filters(&self, source_name: &str) -> Vec<Filter> {
        let Some(remote) = self.remote() else {
            return Vec::new();
        };
        match remote.source_filters(source_name).await {
            Ok(filters) => filters,
            Err(e) => {
                error!(source = source_name, error = %e, "failed to get source filters");
                Vec::new()
            }
        }
    }

    pub async fn get_filter_enabled(&self, source_name: &str, filter_name: &str) -> Option<bool> {
        let remote = self.remote()?;
        match remote.filter_enabled(source_name, filter_name).await {
            Ok(enabled) => Some(enabled),
            Err(e) => {
                error!(source = source_name, filter = filter_name, error = %e,
                    "failed to get filter state");
                None
            }
        }
    }

    pub async fn set_filter_enabled(&self, source_name: &str, filter_name: &str, enabled: bool) {
        let Some(remote) = self.remote() else {
            return;
        };
        if let Err(e) = remote
            .set_filter_enabled(source_name, filter_name, enabled)
            .await
        {
            error!(source = source_name, filter = filter_name, error = %e,
                "failed to set filter state");
        }
    }

    /// Apply an action to a filter. `Toggle` reads the current state
    /// first and skips the filter when it is unknown.
    pub async fn apply_filter_action(
        &self,
        source_name: &str,
        filter_name: &str,
        action: SourceAction,
    ) {
        let enabled = match action {
            SourceAction::Enable => true,
            SourceAction::Disable => false,
            SourceAction::Toggle => match self.get_filter_enabled(source_name, filter_name).await {
                Some(current) => !current,
                None => {
                    warn!(source = source_name, filter = filter_name,
                        "skipping toggle, current filter state unknown");
                    return;
                }
            },
        };
        self.set_filter_enabled(source_name, filter_name, enabled)
            .await;
    }

    // ── Audio ───────────────────────────────────────────────────────

    pub async fn toggle_source_muted(&self, source_name: &str) {
        let Some(remote) = self.remote() else {
            return;
        };
        if let Err(e) = remote.toggle_source_muted(source_name).await {
            error!(source = source_name, error = %e, "failed to toggle mute");
        }
    }

    pub async fn set_source_muted(&self, source_name: &str, muted: bool) {
        let Some(remote) = self.remote() else {
            return;
        };
        if let Err(e) = remote.set_source_muted(source_name, muted).await {
            error!(source = source_name, muted, error = %e, "failed to set mute");
        }
    }

    // ── Streaming / virtual camera ──────────────────────────────────

    /// Whether the stream output is active. `false` when down.
    pub async fn get_streaming_status(&self) -> bool {
        let Some(remote) = self.remote() else {
            return false;
        };
        match remote.stream_status().await {
            Ok(active) => active,
            Err(e) => {
                error!(error = %e, "failed to get streaming status");
                false
            }
        }
    }

    pub async fn start_streaming(&self) {
        let Some(remote) = self.remote() else {
            return;
        };
        if let Err(e) = remote.start_stream().await {
            error!(error = %e, "failed to start streaming");
        }
    }

    pub async fn stop_streaming(&self) {
        let Some(remote) = self.remote() else {
            return;
        };
        if let Err(e) = remote.stop_stream().await {
            error!(error = %e, "failed to stop streaming");
        }
    }

    pub async fn start_virtual_cam(&self) {
        let Some(remote) = self.remote() else {
            return;
        };
        if let Err(e) = remote.start_virtual_cam().await {
            error!(error = %e, "failed to start virtual camera");
        }
    }

    pub async fn stop_virtual_cam(&self) {
        let Some(remote) = self.remote() else {
            return;
        };
        if let Err(e) = remote.stop_virtual_cam().await {
            error!(error = %e, "failed to stop virtual camera");
        }
    }
}
