use thiserror::Error;

/// Top-level error type for the `obslink-api` crate.
///
/// Covers every failure mode of the protocol layer: connecting,
/// handshake/authentication, request execution, and addressing.
/// `obslink-core` maps these into its own taxonomy; callers of the
/// facade never see them directly.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// The websocket connection could not be established.
    #[error("websocket connection failed: {0}")]
    Connect(String),

    /// The connection dropped; any in-flight request resolves to this.
    #[error("connection closed")]
    Closed,

    // ── Handshake ───────────────────────────────────────────────────
    /// The handshake exchange did not follow the protocol.
    #[error("handshake failed: {message}")]
    Handshake { message: String },

    /// The remote requires a password but none was supplied.
    #[error("remote requires authentication but no password was provided")]
    AuthenticationRequired,

    /// The remote rejected the authentication response.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Requests ────────────────────────────────────────────────────
    /// The remote rejected a request. `code` is 0 for the legacy
    /// protocol, which reports only an error string.
    #[error("request failed (code {code}): {comment}")]
    RequestFailed { code: u32, comment: String },

    /// A response did not match the expected schema.
    #[error("deserialization error: {message}")]
    Deserialization { message: String },

    // ── Addressing ──────────────────────────────────────────────────
    /// A source reference used the wrong addressing scheme for the
    /// active protocol version. Never coerced silently.
    #[error("addressing scheme mismatch: {version} expects {expected}")]
    AddressingScheme {
        version: &'static str,
        expected: &'static str,
    },
}

impl Error {
    /// Returns `true` if this is a transient failure worth retrying
    /// on the next reconnect cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Closed)
    }

    /// Returns `true` if this failure came from the remote rejecting
    /// the request rather than from the transport.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. } | Self::AuthenticationFailed { .. }
        )
    }
}

pub(crate) fn deserialization(err: serde_json::Error) -> Error {
    Error::Deserialization {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(Error::Connect("refused".into()).is_transient());
        assert!(Error::Closed.is_transient());
        assert!(
            !Error::RequestFailed {
                code: 600,
                comment: "no such source".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn rejection_classification() {
        assert!(
            Error::RequestFailed {
                code: 204,
                comment: "invalid request type".into()
            }
            .is_rejection()
        );
        assert!(!Error::Closed.is_rejection());
    }
}
