//! Per-secret data-key derivation using PBKDF2-HMAC-SHA256.
//!
//! Every encryption draws a fresh 16-byte salt and derives a new 256-bit
//! AES key from the master key and that salt.  The iteration count is
//! deliberately high so that a dump of the storage layer cannot be
//! brute-forced cheaply.
//!
//! The salt is fed to PBKDF2 as its lowercase hex text, which is the
//! form every stored payload has been keyed with.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Length of the random salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived data key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// PBKDF2 rounds.  Stored payloads carry no iteration count, so every
/// payload ever written was derived with exactly this value.
pub const ITERATIONS: u32 = 100_000;

/// Derive a 32-byte data key from `master_key` and `salt`.
///
/// The same master key and salt always produce the same key.
pub fn derive_data_key(master_key: &[u8], salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
    let salt_text = hex::encode(salt);
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(master_key, salt_text.as_bytes(), ITERATIONS, &mut *key);
    key
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_key() {
        let salt = [7u8; SALT_LEN];
        let a = derive_data_key(b"master", &salt);
        let b = derive_data_key(b"master", &salt);
        assert_eq!(*a, *b);
    }

    #[test]
    fn different_salts_different_keys() {
        let a = derive_data_key(b"master", &[1u8; SALT_LEN]);
        let b = derive_data_key(b"master", &[2u8; SALT_LEN]);
        assert_ne!(*a, *b);
    }

    #[test]
    fn salt_is_used_in_hex_form() {
        let salt = [0xABu8; SALT_LEN];
        let key = derive_data_key(b"master", &salt);

        let mut expected = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(
            b"master",
            "abababababababababababababababab".as_bytes(),
            100_000,
            &mut expected,
        );
        assert_eq!(*key, expected);
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
