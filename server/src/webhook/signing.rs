//! Inbound Request Signature Verification
//!
//! Verifies `v0`-scheme request signatures: HMAC-SHA256 over
//! `v0:{timestamp}:{body}`, with a replay-window check on the timestamp.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed skew between the request timestamp and now, in seconds.
/// A skew of exactly this many seconds is still accepted.
pub const REPLAY_WINDOW_SECS: i64 = 300;

/// Compute the `v0=`-prefixed hex signature for a timestamp and raw body.
pub fn sign_request(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(format!("v0:{timestamp}:").as_bytes());
    mac.update(body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify an inbound request signature against the exact raw body bytes.
///
/// Fails closed: a `None` secret rejects everything. Timestamps more than
/// [`REPLAY_WINDOW_SECS`] away from `now_secs` in either direction are
/// rejected regardless of signature validity.
pub fn verify_request(
    secret: Option<&str>,
    timestamp: i64,
    body: &[u8],
    signature: &str,
    now_secs: i64,
) -> bool {
    let Some(secret) = secret else {
        return false;
    };

    if (now_secs - timestamp).abs() > REPLAY_WINDOW_SECS {
        return false;
    }

    let expected = sign_request(secret, timestamp, body);
    constant_time_eq(&expected, signature)
}

/// Constant-time string comparison (no short-circuit on first mismatch).
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.as_bytes()
            .iter()
            .zip(b.as_bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-signing-secret";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn sign_and_verify() {
        let body = br#"{"type":"event_callback"}"#;
        let sig = sign_request(SECRET, NOW, body);
        assert!(sig.starts_with("v0="));
        assert!(verify_request(Some(SECRET), NOW, body, &sig, NOW));
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = b"payload";
        let sig = sign_request("other-secret", NOW, body);
        assert!(!verify_request(Some(SECRET), NOW, body, &sig, NOW));
    }

    #[test]
    fn rejects_tampered_body() {
        let sig = sign_request(SECRET, NOW, b"original");
        assert!(!verify_request(Some(SECRET), NOW, b"tampered", &sig, NOW));
    }

    #[test]
    fn rejects_without_secret() {
        let sig = sign_request(SECRET, NOW, b"payload");
        assert!(!verify_request(None, NOW, b"payload", &sig, NOW));
    }

    #[test]
    fn replay_window_is_inclusive() {
        let body = b"payload";

        // Exactly at the boundary: accepted, both directions.
        let old = NOW - REPLAY_WINDOW_SECS;
        let sig = sign_request(SECRET, old, body);
        assert!(verify_request(Some(SECRET), old, body, &sig, NOW));

        let ahead = NOW + REPLAY_WINDOW_SECS;
        let sig = sign_request(SECRET, ahead, body);
        assert!(verify_request(Some(SECRET), ahead, body, &sig, NOW));

        // One second past the boundary: rejected even with a valid signature.
        let stale = NOW - REPLAY_WINDOW_SECS - 1;
        let sig = sign_request(SECRET, stale, body);
        assert!(!verify_request(Some(SECRET), stale, body, &sig, NOW));
    }

    #[test]
    fn rejects_signature_of_wrong_length() {
        assert!(!verify_request(Some(SECRET), NOW, b"payload", "v0=short", NOW));
    }
}
