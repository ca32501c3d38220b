//! Key derivation from a user passphrase.
//!
//! This module turns a low-entropy passphrase plus a persisted random salt
//! into a symmetric encryption key using Argon2id. The derivation is
//! deliberately expensive (memory-hard) so that offline brute force of the
//! passphrase stays costly even if the encrypted database and the salt are
//! exfiltrated together.

use crate::error::{Error, Result};
use crate::salt::SALT_SIZE;
use argon2::{Argon2, Params};
use secrecy::SecretVec;
use zeroize::Zeroizing;

/// Derived key size in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Argon2id memory cost in KiB (64 MiB).
pub const KDF_MEMORY_COST: u32 = 65536;

/// Argon2id time cost (passes over memory).
pub const KDF_TIME_COST: u32 = 3;

/// Argon2id parallelism (lanes).
pub const KDF_PARALLELISM: u32 = 4;

/// Derives a symmetric encryption key from a passphrase and salt.
///
/// Deterministic: identical inputs always yield an identical key. The
/// passphrase is only read transiently; nothing is persisted.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the passphrase is empty or the salt is
/// not exactly [`SALT_SIZE`] bytes, and `Error::KeyDerivation` if the
/// Argon2 computation itself fails.
pub fn derive_key(passphrase: &str, salt: &[u8]) -> Result<SecretVec<u8>> {
    if passphrase.is_empty() {
        return Err(Error::InvalidInput("passphrase must not be empty".to_string()));
    }
    if salt.len() != SALT_SIZE {
        return Err(Error::InvalidInput(format!(
            "salt must be exactly {SALT_SIZE} bytes, got {}",
            salt.len()
        )));
    }

    let params = Params::new(KDF_MEMORY_COST, KDF_TIME_COST, KDF_PARALLELISM, Some(KEY_SIZE))
        .map_err(|_| Error::KeyDerivation)?;
    let argon = Argon2::from(params);

    let mut key = Zeroizing::new(vec![0u8; KEY_SIZE]);
    argon
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|_| Error::KeyDerivation)?;

    Ok(SecretVec::new(key.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const SALT: [u8; SALT_SIZE] = [7u8; SALT_SIZE];

    #[test]
    fn test_derive_key_deterministic() {
        let key1 = derive_key("correct horse", &SALT).expect("derivation failed");
        let key2 = derive_key("correct horse", &SALT).expect("derivation failed");

        assert_eq!(key1.expose_secret(), key2.expose_secret());
    }

    #[test]
    fn test_derive_key_different_passphrases() {
        let key1 = derive_key("passphrase one", &SALT).expect("derivation failed");
        let key2 = derive_key("passphrase two", &SALT).expect("derivation failed");

        assert_ne!(key1.expose_secret(), key2.expose_secret());
    }

    #[test]
    fn test_derive_key_different_salts() {
        let other_salt = [8u8; SALT_SIZE];

        let key1 = derive_key("same passphrase", &SALT).expect("derivation failed");
        let key2 = derive_key("same passphrase", &other_salt).expect("derivation failed");

        assert_ne!(key1.expose_secret(), key2.expose_secret());
    }

    #[test]
    fn test_derive_key_output_length() {
        let key = derive_key("any passphrase", &SALT).expect("derivation failed");

        assert_eq!(key.expose_secret().len(), KEY_SIZE);
    }

    #[test]
    fn test_derive_key_empty_passphrase() {
        let result = derive_key("", &SALT);

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_derive_key_wrong_salt_length() {
        let short_salt = [1u8; 8];
        let result = derive_key("passphrase", &short_salt);
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let long_salt = [1u8; 32];
        let result = derive_key("passphrase", &long_salt);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
