// ── Core error types ──
//
// Host-facing errors from obslink-core. Consumers never see wire frames
// or serde failures directly; the `From<obslink_api::Error>` impl
// translates protocol-layer errors into domain variants. The facade
// itself swallows these into neutral results after logging — only
// `initialize`/`replace_config` surface a `CoreError` to the host.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection ──────────────────────────────────────────────────
    #[error("not connected to OBS")]
    NotConnected,

    #[error("cannot connect to OBS: {reason}")]
    ConnectionFailed { reason: String },

    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("connection to OBS lost")]
    Disconnected,

    // ── Operations ──────────────────────────────────────────────────
    #[error("operation rejected by OBS: {message}")]
    Rejected { message: String },

    #[error("source addressing mismatch: {message}")]
    Addressing { message: String },

    #[error("protocol error: {message}")]
    Protocol { message: String },

    // ── Configuration ───────────────────────────────────────────────
    #[error("configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from protocol-layer errors ───────────────────────────

impl From<obslink_api::Error> for CoreError {
    fn from(err: obslink_api::Error) -> Self {
        use obslink_api::Error as Api;

        match err {
            Api::Connect(reason) => Self::ConnectionFailed { reason },
            Api::Closed => Self::Disconnected,
            Api::Handshake { message } => Self::ConnectionFailed { reason: message },
            Api::AuthenticationRequired => Self::AuthenticationFailed {
                message: "remote requires a password but none was provided".into(),
            },
            Api::AuthenticationFailed { message } => Self::AuthenticationFailed { message },
            Api::RequestFailed { code, comment } => Self::Rejected {
                message: if code == 0 {
                    comment
                } else {
                    format!("{comment} (code {code})")
                },
            },
            Api::Deserialization { message } => Self::Protocol { message },
            err @ Api::AddressingScheme { .. } => Self::Addressing {
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_map_to_domain_variants() {
        let err: CoreError = obslink_api::Error::Closed.into();
        assert!(matches!(err, CoreError::Disconnected));

        let err: CoreError = obslink_api::Error::RequestFailed {
            code: 600,
            comment: "no such scene".into(),
        }
        .into();
        match err {
            CoreError::Rejected { message } => assert_eq!(message, "no such scene (code 600)"),
            other => panic!("expected Rejected, got {other:?}"),
        }

        let err: CoreError = obslink_api::Error::AuthenticationRequired.into();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }
}
