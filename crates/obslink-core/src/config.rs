// ── Runtime connection configuration ──
//
// Describes *how* to reach one OBS instance. Carries the credential and
// reconnect tuning, but never touches disk — the host constructs a
// `ConnectionConfig` and hands it in.

use std::time::Duration;

use obslink_api::ProtocolVersion;
use secrecy::{ExposeSecret, SecretString};

use crate::error::CoreError;

/// Delay between reconnect attempts. Fixed, no backoff: a local OBS
/// instance either comes back or it doesn't.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Configuration for one OBS connection.
///
/// Immutable per connection attempt; [`ObsSession::replace_config`]
/// (crate::ObsSession::replace_config) swaps it wholesale and restarts
/// the supervisor.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Bare hostname or IP of the machine running OBS.
    pub host: String,
    /// Websocket port; `None` uses the protocol version's default
    /// (4455 for v5, 4444 for v4).
    pub port: Option<u16>,
    /// Websocket password. `None` or empty means no authentication.
    pub password: Option<SecretString>,
    /// Which obs-websocket generation the remote speaks.
    pub protocol: ProtocolVersion,
    /// Include underlying errors when logging failed connect attempts.
    pub verbose_logging: bool,
    /// Delay between reconnect attempts.
    pub reconnect_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            password: None,
            protocol: ProtocolVersion::V5,
            verbose_logging: false,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ConnectionConfig {
    /// The port to connect to, falling back to the version default.
    pub fn resolved_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// The `ws://` endpoint this configuration points at.
    pub fn endpoint(&self) -> String {
        format!("ws://{}:{}", self.host, self.resolved_port())
    }

    /// Check the configuration before the supervisor starts retrying it.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.host.trim().is_empty() {
            return Err(CoreError::Config {
                message: "host must not be empty".into(),
            });
        }
        if self.host.contains("://") || self.host.contains('/') {
            return Err(CoreError::Config {
                message: format!("host must be a bare hostname, got {:?}", self.host),
            });
        }
        if self.reconnect_delay.is_zero() {
            return Err(CoreError::Config {
                message: "reconnect delay must be non-zero".into(),
            });
        }
        Ok(())
    }

    /// The password as the handshake wants it: `None` when unset or empty.
    pub(crate) fn password_str(&self) -> Option<&str> {
        self.password
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .filter(|p| !p.is_empty())
    }
}
