use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::types::DerivedSessionId;

const SESSION_ID_PREFIX: &str = "SSO-";

/// Computes the checksum accompanying an attach request.
///
/// `hex(SHA256("attach" || token || secret))`. The operation tag keeps an attach
/// checksum from ever being usable as a session hash.
#[must_use]
pub fn attach_checksum(token: &str, client_secret: &str) -> String {
    tagged_digest("attach", token, client_secret)
}

/// Derives the session id shared by a broker and the Host.
///
/// `SSO-{client}-{token}-{hex(SHA256("session" || token || secret))}`
#[must_use]
pub fn session_id(client_name: &str, token: &str, client_secret: &str) -> DerivedSessionId {
    let hash = tagged_digest("session", token, client_secret);
    DerivedSessionId(format!("{SESSION_ID_PREFIX}{client_name}-{token}-{hash}"))
}

/// Components of a well-formed session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionIdParts<'a> {
    pub client_name: &'a str,
    pub token: &'a str,
    pub hash: &'a str,
}

/// Splits a session id into its parts without verifying the hash.
///
/// Accepts exactly `SSO-(\w*)-(\w*)-([a-z0-9]*)`.
#[must_use]
pub fn parse_session_id(value: &str) -> Option<SessionIdParts<'_>> {
    let rest = value.strip_prefix(SESSION_ID_PREFIX)?;
    let mut pieces = rest.splitn(3, '-');
    let client_name = pieces.next()?;
    let token = pieces.next()?;
    let hash = pieces.next()?;

    let is_word = |s: &str| s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    let is_hash = |s: &str| s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());

    if !is_word(client_name) || !is_word(token) || !is_hash(hash) {
        return None;
    }

    Some(SessionIdParts {
        client_name,
        token,
        hash,
    })
}

/// Recomputes `id` from its embedded client name and token against
/// `client_secret` and compares in constant time.
#[must_use]
pub fn verify_session_id(id: &DerivedSessionId, client_secret: &str) -> bool {
    let Some(parts) = parse_session_id(id.as_str()) else {
        return false;
    };
    let expected = session_id(parts.client_name, parts.token, client_secret);
    checksums_match(expected.as_str(), id.as_str())
}

/// Constant-time string equality.
#[must_use]
pub fn checksums_match(expected: &str, actual: &str) -> bool {
    expected.as_bytes().ct_eq(actual.as_bytes()).into()
}

fn tagged_digest(tag: &str, token: &str, client_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tag.as_bytes());
    hasher.update(token.as_bytes());
    hasher.update(client_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_checksum_matches_known_digest() {
        // sha256("attach") with empty token and secret
        let expected = hex::encode(Sha256::digest(b"attach"));
        assert_eq!(attach_checksum("", ""), expected);
    }

    #[test]
    fn attach_checksum_deterministic() {
        assert_eq!(
            attach_checksum("token123", "secret"),
            attach_checksum("token123", "secret")
        );
    }

    #[test]
    fn attach_checksum_changes_with_inputs() {
        let base = attach_checksum("token123", "secret");
        assert_ne!(base, attach_checksum("token124", "secret"));
        assert_ne!(base, attach_checksum("token123", "secret2"));
    }

    #[test]
    fn attach_checksum_is_scoped_to_operation() {
        let id = session_id("app", "token123", "secret");
        let parts = parse_session_id(id.as_str()).unwrap();
        assert_ne!(parts.hash, attach_checksum("token123", "secret"));
    }

    #[test]
    fn session_id_format() {
        let id = session_id("app1", "T1", "s3cret");
        let hash = hex::encode(Sha256::digest(b"sessionT1s3cret"));
        assert_eq!(id.as_str(), format!("SSO-app1-T1-{hash}"));
    }

    #[test]
    fn session_id_round_trips_against_true_secret() {
        let id = session_id("my_app", "abcDEF123", "secret");
        assert!(verify_session_id(&id, "secret"));
        assert!(!verify_session_id(&id, "wrong-secret"));
    }

    #[test]
    fn parse_session_id_accepts_valid() {
        let id = session_id("app_1", "tok", "secret");
        let parts = parse_session_id(id.as_str()).unwrap();
        assert_eq!(parts.client_name, "app_1");
        assert_eq!(parts.token, "tok");
        assert_eq!(parts.hash.len(), 64);
    }

    #[test]
    fn parse_session_id_rejects_malformed() {
        assert!(parse_session_id("").is_none());
        assert!(parse_session_id("SSO-app-token").is_none());
        assert!(parse_session_id("XYZ-app-token-abc").is_none());
        assert!(parse_session_id("SSO-app-tok-en-abc").is_none());
        assert!(parse_session_id("SSO-app-token-ABC").is_none());
        assert!(parse_session_id("SSO-my app-token-abc").is_none());
    }

    #[test]
    fn tampered_session_id_fails_verification() {
        let id = session_id("app", "token", "secret");
        let tampered = DerivedSessionId(id.as_str().replacen("token", "tokeN", 1));
        assert!(!verify_session_id(&tampered, "secret"));
    }

    #[test]
    fn checksums_match_requires_equal_length() {
        assert!(checksums_match("abc", "abc"));
        assert!(!checksums_match("abc", "abcd"));
        assert!(!checksums_match("abc", "abd"));
    }
}
