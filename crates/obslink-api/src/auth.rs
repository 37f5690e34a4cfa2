//! obs-websocket authentication challenge/response.
//!
//! Both protocol generations use the same scheme: the server supplies a
//! `challenge` and a `salt`, and the client answers with
//! `base64(sha256(base64(sha256(password + salt)) + challenge))`.

use base64::Engine;
use sha2::{Digest, Sha256};

/// Compute the authentication string for a challenge/salt pair.
pub fn challenge_response(password: &str, challenge: &str, salt: &str) -> String {
    let secret_hash = Sha256::digest(format!("{password}{salt}").as_bytes());
    let secret = base64::engine::general_purpose::STANDARD.encode(secret_hash);

    let auth_hash = Sha256::digest(format!("{secret}{challenge}").as_bytes());
    base64::engine::general_purpose::STANDARD.encode(auth_hash)
}
