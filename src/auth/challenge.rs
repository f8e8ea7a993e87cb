//! Login challenge messages.
//!
//! Wallet clients sign a human-readable message.  The plain phrase alone
//! can be replayed by anyone who has seen a signature, so the gate can
//! hand out server-issued challenges instead: each one names the address,
//! carries a random nonce and an expiry, and is accepted exactly once.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::RngCore;

/// Phrase every login message starts with.
pub const LOGIN_PHRASE: &str = "Sign in to EncryptoLock";

const NONCE_LEN: usize = 16;

/// A single-use, time-bounded login challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Lower-cased address the challenge was issued for.
    pub address: String,
    pub nonce: String,
    /// The exact text the wallet must sign.
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    pub fn new(address: &str, ttl: Duration, now: DateTime<Utc>) -> Self {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = hex::encode(nonce_bytes);

        let address = normalize_address(address);
        let expires_at = now + ttl;
        let message = format!(
            "{LOGIN_PHRASE}\n\nAddress: {address}\nNonce: {nonce}\nExpires: {}",
            expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        Self {
            address,
            nonce,
            message,
            expires_at,
        }
    }
}

/// Canonical form of an address: trimmed and lower-cased.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// `0x` followed by 40 hex digits, any case.
pub fn is_valid_address(address: &str) -> bool {
    let address = address.trim();
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .is_some_and(|hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0xDEF0000000000000000000000000000000000001";

    #[test]
    fn message_binds_address_and_nonce() {
        let now = Utc::now();
        let challenge = Challenge::new(ADDRESS, Duration::minutes(5), now);

        assert!(challenge.message.starts_with(LOGIN_PHRASE));
        assert!(challenge.message.contains(&ADDRESS.to_ascii_lowercase()));
        assert!(challenge.message.contains(&challenge.nonce));
        assert_eq!(challenge.nonce.len(), NONCE_LEN * 2);
        assert_eq!(challenge.expires_at, now + Duration::minutes(5));
    }

    #[test]
    fn nonces_are_unique() {
        let now = Utc::now();
        let a = Challenge::new(ADDRESS, Duration::minutes(5), now);
        let b = Challenge::new(ADDRESS, Duration::minutes(5), now);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.message, b.message);
    }

    #[test]
    fn address_validation() {
        assert!(is_valid_address(ADDRESS));
        assert!(is_valid_address(&ADDRESS.to_ascii_lowercase()));
        assert!(!is_valid_address("0x1234"));
        assert!(!is_valid_address("DEF0000000000000000000000000000000000001"));
        assert!(!is_valid_address("0xZZZ0000000000000000000000000000000000001"));
    }
}
