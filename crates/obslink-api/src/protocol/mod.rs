//! Protocol version model and the shared types both generations map into.
//!
//! The wire formats of obs-websocket 4.x and 5.x are incompatible: different
//! envelopes, different request names, and different source addressing. Each
//! version module owns its request shaping and its typed response schemas;
//! everything they export is expressed in the version-neutral types below.

use serde::{Deserialize, Serialize};

pub mod v4;
pub mod v5;

// ── Protocol version ────────────────────────────────────────────────

/// A supported obs-websocket major version, selected once at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// obs-websocket 4.x: standalone plugin, scene-scoped numeric item ids.
    V4,
    /// obs-websocket 5.x: bundled with OBS 28+, globally unique source names.
    V5,
}

impl ProtocolVersion {
    /// The default websocket port for this protocol generation.
    pub fn default_port(self) -> u16 {
        match self {
            Self::V4 => 4444,
            Self::V5 => 4455,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V4 => "v4",
            Self::V5 => "v5",
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Addressing ──────────────────────────────────────────────────────

/// How a source is addressed, depending on the protocol generation.
///
/// The two schemes are never interchangeable: handing a
/// [`SourceRef::Item`] to a v5 session (or a [`SourceRef::Name`] to a
/// v4 session) is an [`AddressingScheme`](crate::Error::AddressingScheme)
/// error, not a silent coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// Legacy (v4) scheme: a numeric item id scoped to its owning scene.
    Item { scene: String, item_id: i64 },
    /// Current (v5) scheme: a globally unique source name, resolved
    /// against the current program scene.
    Name(String),
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Item { scene, item_id } => write!(f, "{scene}:{item_id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

// ── Version-neutral shapes ──────────────────────────────────────────

/// A scene as declared by the remote, in the remote's declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
}

/// A source entry within one scene of a [`SourceData`] snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSource {
    pub item_id: i64,
    pub name: String,
}

/// Scene name → ordered sources. Rebuilt on every query, never cached.
pub type SourceData = indexmap::IndexMap<String, Vec<SceneSource>>;

/// A source as returned by the scene-item enumeration, before any
/// filter lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    /// Source kind, e.g. `"ffmpeg_source"`; `"scene"` for scenes
    /// surfaced as pseudo-sources.
    pub kind: String,
    /// Scene-item id when the enumeration provides one.
    pub item_id: Option<i64>,
}

/// A named, toggleable transform attached to a source. Always fetched
/// fresh from the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub enabled: bool,
}

// ── Protocol notifications ──────────────────────────────────────────

/// A remote notification the bridge subscribes to.
///
/// Connection-closed is not represented here: it is a transport-level
/// signal surfaced through [`ObsClient::closed`](crate::ObsClient::closed)
/// and consumed by the connection supervisor alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// The current program scene changed.
    SceneChanged { scene_name: String },
    /// The stream output started (`active = true`) or stopped.
    StreamStateChanged { active: bool },
}

// ── Reader-task classification ──────────────────────────────────────

/// What an incoming text frame turned out to be.
pub(crate) enum Incoming {
    /// A response to a pending request.
    Response {
        id: String,
        result: Result<serde_json::Value, crate::Error>,
    },
    /// A subscribed notification.
    Event(ProtocolEvent),
    /// Anything else (unsubscribed events, unparseable frames).
    Ignored,
}
