//! Encrypt and decrypt secret values under the master key.
//!
//! `encrypt` draws a fresh salt, derives a one-off AES key from the master
//! key, seals the plaintext under a fresh nonce and packs everything into
//! a `CipherPayload`.  `decrypt` reverses the process.  Because every call
//! gets its own derived key, nonce reuse across calls cannot happen even
//! for identical plaintexts.

use zeroize::{Zeroize, Zeroizing};

use super::encryption;
use super::kdf::{derive_data_key, generate_salt};
use super::keys::MasterKey;
use super::payload::CipherPayload;
use crate::errors::{CryptoFailure, Result, VaultError};

/// Encrypt `plaintext` under `master_key`.
pub fn encrypt(plaintext: &[u8], master_key: &MasterKey) -> Result<CipherPayload> {
    let salt = generate_salt();
    let data_key = derive_data_key(master_key.as_bytes(), &salt);
    let sealed = encryption::encrypt(&data_key, plaintext)?;

    Ok(CipherPayload {
        salt,
        nonce: sealed.nonce,
        tag: sealed.tag,
        ciphertext: sealed.ciphertext,
    })
}

/// Decrypt a payload produced by `encrypt`.
pub fn decrypt(payload: &CipherPayload, master_key: &MasterKey) -> Result<Zeroizing<Vec<u8>>> {
    let data_key = derive_data_key(master_key.as_bytes(), &payload.salt);
    let plaintext = encryption::decrypt(&data_key, &payload.nonce, &payload.tag, &payload.ciphertext)?;
    Ok(Zeroizing::new(plaintext))
}

/// Holds the master key for the lifetime of the process.  Cheap to
/// share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CryptoEngine {
    master_key: MasterKey,
}

impl CryptoEngine {
    pub fn new(master_key: MasterKey) -> Self {
        Self { master_key }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<CipherPayload> {
        encrypt(plaintext, &self.master_key)
    }

    pub fn decrypt(&self, payload: &CipherPayload) -> Result<Zeroizing<Vec<u8>>> {
        decrypt(payload, &self.master_key)
    }

    /// Parse a stored payload string and decrypt it to UTF-8 text.
    ///
    /// Invalid UTF-8 is wiped before the error is returned.
    pub fn decrypt_str(&self, stored: &str) -> Result<Zeroizing<String>> {
        let payload: CipherPayload = stored.parse()?;
        let mut plaintext = self.decrypt(&payload)?;
        let bytes = std::mem::take(&mut *plaintext);

        String::from_utf8(bytes).map(Zeroizing::new).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            VaultError::Crypto(CryptoFailure::MalformedPayload)
        })
    }
}
