//! Connection supervision, remote operations, and event relay for an
//! OBS remote-control bridge.
//!
//! [`ObsSession`] is the single entry point: configure it, call
//! [`initialize`](ObsSession::initialize), and the supervisor keeps the
//! websocket connection alive across remote restarts. Operations are
//! inherent async methods that degrade to neutral empty values while
//! the connection is down; remote notifications are relayed through
//! [`ObsSession::events`].

mod config;
mod error;
mod events;
mod ops;
mod session;

pub use config::{ConnectionConfig, DEFAULT_RECONNECT_DELAY};
pub use error::CoreError;
pub use events::{
    EVENT_SCENE_CHANGED, EVENT_SOURCE_ID, EVENT_STREAM_STARTED, EVENT_STREAM_STOPPED, RemoteEvent,
};
pub use ops::{ObsSource, SourceAction};
pub use session::{ConnectionState, ObsSession};

// Protocol-level types that appear in the facade's signatures.
pub use obslink_api::{Filter, ProtocolVersion, SceneSource, SourceData, SourceRef};
