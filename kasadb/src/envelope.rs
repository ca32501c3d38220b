//! On-disk envelope format for the encrypted database.
//!
//! One database file is one envelope:
//!
//! ```text
//! [version:1][nonce:12][ciphertext || tag]
//! ```
//!
//! The version byte participates in authentication as associated data, so
//! any modification of header or body surfaces as a loud failure rather
//! than silently-wrong plaintext.

use crate::error::{Error, Result};
use chacha20poly1305::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    ChaCha20Poly1305, Nonce,
};
use secrecy::{ExposeSecret, SecretVec};

/// Envelope format version.
pub const FORMAT_VERSION: u8 = 1;

/// Nonce size for ChaCha20-Poly1305 (96 bits).
const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag size.
const TAG_SIZE: usize = 16;

/// Smallest well-formed envelope: header, nonce and the tag of an empty
/// plaintext.
const MIN_ENVELOPE_SIZE: usize = 1 + NONCE_SIZE + TAG_SIZE;

fn cipher_for(key: &SecretVec<u8>) -> Result<ChaCha20Poly1305> {
    ChaCha20Poly1305::new_from_slice(key.expose_secret())
        .map_err(|_| Error::InvalidInput("encryption key must be 32 bytes".to_string()))
}

/// Encrypts `plaintext` into a versioned envelope.
///
/// A fresh random nonce is generated on every call, so sealing the same
/// plaintext twice never produces the same bytes.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the key has the wrong length and
/// `Error::EncryptionFailed` if the AEAD operation fails.
pub fn seal(plaintext: &[u8], key: &SecretVec<u8>) -> Result<Vec<u8>> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from(nonce_bytes);

    let ciphertext = cipher
        .encrypt(&nonce, Payload { msg: plaintext, aad: &[FORMAT_VERSION] })
        .map_err(|e| Error::EncryptionFailed(format!("ChaCha20-Poly1305: {e}")))?;

    let mut envelope = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
    envelope.push(FORMAT_VERSION);
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&ciphertext);

    Ok(envelope)
}

/// Decrypts an envelope produced by [`seal`].
///
/// An empty envelope decrypts to empty plaintext so a fresh store can
/// bootstrap before any database file has been written.
///
/// # Errors
///
/// Returns `Error::AuthenticationFailed` if the tag does not verify (wrong
/// key, corruption or tampering), `Error::UnsupportedVersion` for an
/// unknown version byte and `Error::InvalidEnvelope` for truncated data.
pub fn open(envelope: &[u8], key: &SecretVec<u8>) -> Result<Vec<u8>> {
    if envelope.is_empty() {
        return Ok(Vec::new());
    }

    let version = envelope[0];
    if version != FORMAT_VERSION {
        return Err(Error::UnsupportedVersion { version, supported: FORMAT_VERSION.to_string() });
    }

    if envelope.len() < MIN_ENVELOPE_SIZE {
        return Err(Error::InvalidEnvelope(format!(
            "{} bytes is shorter than the minimum envelope of {MIN_ENVELOPE_SIZE}",
            envelope.len()
        )));
    }

    let nonce_bytes: [u8; NONCE_SIZE] = envelope[1..=NONCE_SIZE]
        .try_into()
        .map_err(|_| Error::InvalidEnvelope("nonce truncated".to_string()))?;
    let nonce = Nonce::from(nonce_bytes);

    let cipher = cipher_for(key)?;
    cipher
        .decrypt(&nonce, Payload { msg: &envelope[1 + NONCE_SIZE..], aad: &[version] })
        .map_err(|_| Error::AuthenticationFailed)
}
