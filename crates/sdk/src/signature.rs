//! Webhook signature check.
//!
//! The platform signs each callback with the SHA-1 hex digest of the
//! lexicographically sorted concatenation of the configured token, the
//! request timestamp and a nonce.

use {
    sha1::{Digest, Sha1},
    tracing::warn,
};

/// Compute the expected signature for a callback.
pub fn sign(token: &str, timestamp: &str, nonce: &str) -> String {
    let mut parts = [token, timestamp, nonce];
    parts.sort_unstable();
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Check `signature` against the token, timestamp and nonce.
pub fn verify_signature(token: &str, timestamp: &str, nonce: &str, signature: &str) -> bool {
    if token.is_empty() {
        warn!("webhook token is empty, rejecting signature");
        return false;
    }
    let computed = sign(token, timestamp, nonce);
    constant_time_eq(&computed, &signature.to_ascii_lowercase())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
