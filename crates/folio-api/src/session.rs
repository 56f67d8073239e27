//! # Session Tokens
//!
//! A session token is 32 random bytes from the OS RNG, hex encoded and
//! handed to the client once. The server keeps only its SHA-256, so a
//! leaked `documents` table does not leak usable tokens.

use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::state::SessionRecord;

/// Random bytes per token.
pub const TOKEN_BYTES: usize = 32;

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generate a fresh bearer token.
pub fn generate_token() -> Zeroizing<String> {
    let mut bytes = Zeroizing::new([0u8; TOKEN_BYTES]);
    OsRng.fill_bytes(&mut bytes[..]);
    Zeroizing::new(to_hex(&bytes[..]))
}

/// Hex SHA-256 of a token, as stored in [`SessionRecord::token_hash`].
pub fn hash_token(token: &str) -> String {
    to_hex(&Sha256::digest(token.as_bytes()))
}

/// Constant-time comparison of a presented token against a stored hash.
pub fn token_matches(token: &str, stored_hash: &str) -> bool {
    let presented = hash_token(token);
    presented.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Create a session for `user_id` lasting `ttl_hours`. Returns the plaintext
/// token (for the client) and the record to store.
pub fn issue(user_id: Uuid, ttl_hours: i64, now: DateTime<Utc>) -> (Zeroizing<String>, SessionRecord) {
    let token = generate_token();
    let record = SessionRecord {
        id: Uuid::new_v4(),
        user_id,
        token_hash: hash_token(&token),
        expires_at: now + Duration::hours(ttl_hours),
        created_at: now,
    };
    (token, record)
}

impl SessionRecord {
    /// Whether the session has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_hex_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(*a, *b);
    }

    #[test]
    fn hash_is_stable_sha256() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn issued_session_stores_only_hash() {
        let now = Utc::now();
        let (token, record) = issue(Uuid::new_v4(), 24, now);
        assert_ne!(record.token_hash, *token);
        assert!(token_matches(&token, &record.token_hash));
        assert!(!token_matches("other", &record.token_hash));
        assert_eq!(record.expires_at, now + Duration::hours(24));
    }

    #[test]
    fn expiry() {
        let now = Utc::now();
        let (_, record) = issue(Uuid::new_v4(), 1, now);
        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::hours(1)));
    }
}
