// ── Host-level events ──
//
// What the bridge republishes into the host's event bus. Identifiers
// follow the host contract: one event-source id for the whole bridge,
// one event id per notification kind, a minimal JSON payload.

use obslink_api::ProtocolEvent;
use serde_json::{Value, json};

/// Event-source identifier under which all bridge events are published.
pub const EVENT_SOURCE_ID: &str = "remote-control-source";

pub const EVENT_SCENE_CHANGED: &str = "scene-changed";
pub const EVENT_STREAM_STARTED: &str = "stream-started";
pub const EVENT_STREAM_STOPPED: &str = "stream-stopped";

/// A remote notification after relay mapping. Fire-and-forget,
/// at most one per underlying protocol notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    /// The current program scene changed.
    SceneChanged { scene_name: String },
    StreamStarted,
    StreamStopped,
}

impl RemoteEvent {
    /// The host event-bus id for this event.
    pub fn event_id(&self) -> &'static str {
        match self {
            Self::SceneChanged { .. } => EVENT_SCENE_CHANGED,
            Self::StreamStarted => EVENT_STREAM_STARTED,
            Self::StreamStopped => EVENT_STREAM_STOPPED,
        }
    }

    /// The payload published alongside the event id.
    pub fn payload(&self) -> Value {
        match self {
            Self::SceneChanged { scene_name } => json!({ "sceneName": scene_name }),
            Self::StreamStarted | Self::StreamStopped => json!({}),
        }
    }

    /// Map a protocol notification to its host-level event. The
    /// stream-state notification splits into started/stopped here.
    pub(crate) fn from_protocol(event: ProtocolEvent) -> Self {
        match event {
            ProtocolEvent::SceneChanged { scene_name } => Self::SceneChanged { scene_name },
            ProtocolEvent::StreamStateChanged { active: true } => Self::StreamStarted,
            ProtocolEvent::StreamStateChanged { active: false } => Self::StreamStopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ids_match_the_host_contract() {
        let scene = RemoteEvent::SceneChanged {
            scene_name: "Main".into(),
        };
        assert_eq!(scene.event_id(), "scene-changed");
        assert_eq!(scene.payload(), json!({ "sceneName": "Main" }));
        assert_eq!(RemoteEvent::StreamStarted.event_id(), "stream-started");
        assert_eq!(RemoteEvent::StreamStopped.event_id(), "stream-stopped");
    }

    #[test]
    fn stream_state_splits_into_started_and_stopped() {
        assert_eq!(
            RemoteEvent::from_protocol(ProtocolEvent::StreamStateChanged { active: true }),
            RemoteEvent::StreamStarted
        );
        assert_eq!(
            RemoteEvent::from_protocol(ProtocolEvent::StreamStateChanged { active: false }),
            RemoteEvent::StreamStopped
        );
    }
}
