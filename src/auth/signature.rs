//! Signer recovery for wallet-signed login messages.
//!
//! Wallets sign logins with EIP-191 "personal" messages:
//!
//! ```text
//! keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)
//! ```
//!
//! The signature is 65 bytes, `r || s || v`, hex encoded.  Recovering
//! the public key from it and hashing that key gives the signer's
//! address, which is what the access gate compares against.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::errors::{AuthFailure, Result};

const SIGNATURE_LEN: usize = 65;

/// Recovers the address that produced a signature over a message.
pub trait SignerRecovery: Send + Sync {
    /// Returns the signer address as `0x`-prefixed lowercase hex.
    fn recover_signer_address(&self, message: &str, signature: &str) -> Result<String>;
}

/// secp256k1 / EIP-191 recovery, as used by Ethereum wallets.
#[derive(Debug, Default, Clone, Copy)]
pub struct EthereumRecovery;

impl SignerRecovery for EthereumRecovery {
    fn recover_signer_address(&self, message: &str, signature: &str) -> Result<String> {
        let raw = signature.trim();
        let raw = raw.strip_prefix("0x").unwrap_or(raw);
        let bytes = hex::decode(raw).map_err(|_| AuthFailure::InvalidSignature)?;
        if bytes.len() != SIGNATURE_LEN {
            return Err(AuthFailure::InvalidSignature.into());
        }

        let recovery_byte = match bytes[64] {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - 27,
            _ => return Err(AuthFailure::InvalidSignature.into()),
        };

        let mut sig =
            Signature::from_slice(&bytes[..64]).map_err(|_| AuthFailure::InvalidSignature)?;
        let mut recovery_id =
            RecoveryId::from_byte(recovery_byte).ok_or(AuthFailure::InvalidSignature)?;

        // Flip high-S signatures into the canonical half, which also flips
        // the parity of the recovered point.
        if let Some(normalized) = sig.normalize_s() {
            sig = normalized;
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        }

        let digest = personal_message_hash(message.as_bytes());
        let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
            .map_err(|_| AuthFailure::InvalidSignature)?;

        Ok(address_of(&key))
    }
}

/// EIP-191 hash of a personal message.
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Ethereum address of a public key: last 20 bytes of the keccak256 of
/// the uncompressed point (without its `0x04` prefix).
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Sign `message` the way a wallet's `personal_sign` does.  Returns the
/// `0x`-prefixed 65-byte signature with `v` in `{27, 28}`.
pub fn sign_personal_message(key: &SigningKey, message: &str) -> Result<String> {
    let digest = personal_message_hash(message.as_bytes());
    let (sig, recovery_id) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|_| AuthFailure::InvalidSignature)?;

    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    Ok(format!("0x{}", hex::encode(bytes)))
}
