//! Cryptographic primitives for EncryptoLock.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 per-secret key derivation (`kdf`)
//! - AES-256-GCM with a detached tag (`encryption`)
//! - The `salt:nonce:tag:ciphertext` payload framing (`payload`)
//! - The zeroizing `MasterKey` wrapper (`keys`)
//! - `CryptoEngine`, which ties them together (`engine`)

pub mod encryption;
pub mod engine;
pub mod kdf;
pub mod keys;
pub mod payload;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, CryptoEngine, ...};
pub use engine::{decrypt, encrypt, CryptoEngine};
pub use kdf::{derive_data_key, generate_salt};
pub use keys::MasterKey;
pub use payload::CipherPayload;
