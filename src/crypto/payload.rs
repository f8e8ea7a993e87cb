//! At-rest framing for encrypted secret values.
//!
//! A cipher payload is four lowercase hex fields joined by colons:
//!
//! ```text
//! <salt: 16 bytes>:<nonce: 12 bytes>:<auth tag: 16 bytes>:<ciphertext>
//! ```
//!
//! Hex never contains `:`, so the framing is unambiguous.  Parsing is
//! strict: anything that is not exactly four well-formed fields is a
//! `MalformedPayload`.

use std::fmt;
use std::str::FromStr;

use super::encryption::{NONCE_LEN, TAG_LEN};
use super::kdf::SALT_LEN;
use crate::errors::{CryptoFailure, VaultError};

const DELIMITER: char = ':';

/// The four components of an encrypted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherPayload {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl fmt::Display for CipherPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            hex::encode(self.salt),
            hex::encode(self.nonce),
            hex::encode(self.tag),
            hex::encode(&self.ciphertext)
        )
    }
}

impl FromStr for CipherPayload {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(DELIMITER).collect();
        let [salt, nonce, tag, ciphertext] = fields.as_slice() else {
            return Err(CryptoFailure::MalformedPayload.into());
        };

        Ok(Self {
            salt: decode_fixed(salt)?,
            nonce: decode_fixed(nonce)?,
            tag: decode_fixed(tag)?,
            ciphertext: hex::decode(ciphertext).map_err(|_| CryptoFailure::MalformedPayload)?,
        })
    }
}

/// Decode a hex field that must be exactly `N` bytes long.
fn decode_fixed<const N: usize>(field: &str) -> Result<[u8; N], VaultError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(field, &mut out).map_err(|_| CryptoFailure::MalformedPayload)?;
    Ok(out)
}
