//! Protocol client for the obs-websocket remote-control interface.
//!
//! Speaks both supported generations of the protocol — 4.x (legacy
//! standalone plugin) and 5.x (bundled with OBS 28+) — behind a single
//! version-neutral surface. [`RemoteSession`] is the entry point: it
//! connects, authenticates, and exposes one typed method per remote
//! capability, plus a broadcast stream of subscribed notifications.

mod auth;
mod client;
mod error;
pub mod protocol;
mod session;

#[cfg(feature = "test-util")]
pub mod testing;

pub use client::ObsClient;
pub use error::Error;
pub use protocol::{
    Filter, ProtocolEvent, ProtocolVersion, Scene, SceneSource, SourceData, SourceInfo, SourceRef,
};
pub use session::{RemoteSession, SCENE_KIND};
