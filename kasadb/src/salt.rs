//! On-disk salt artifact management.
//!
//! The salt is 16 random bytes generated once during provisioning and mixed
//! into key derivation. A database file is only ever decryptable with the
//! salt that was active when it was encrypted, so [`SaltStore::initialize`]
//! refuses to overwrite an existing salt while a database is present unless
//! the caller explicitly forces a destructive reset.

use crate::error::{Error, Result};
use crate::fsio;
use chacha20poly1305::aead::{rand_core::RngCore, OsRng};
use std::fs;
use std::path::{Path, PathBuf};

/// Salt size in bytes.
pub const SALT_SIZE: usize = 16;

/// A persisted key-derivation salt.
///
/// The salt is public material; it only prevents precomputed-table attacks
/// and does not need the secrecy treatment the derived key gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Returns the raw salt bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Owns the salt artifact on disk and enforces create-once semantics.
pub struct SaltStore {
    salt_path: PathBuf,
    db_path: PathBuf,
}

impl SaltStore {
    /// Creates a store over the given artifact locations.
    ///
    /// The database path is only consulted to decide whether overwriting
    /// the salt would destroy access to existing encrypted data.
    #[must_use]
    pub fn new(salt_path: impl Into<PathBuf>, db_path: impl Into<PathBuf>) -> Self {
        Self { salt_path: salt_path.into(), db_path: db_path.into() }
    }

    /// Returns the path of the salt artifact.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.salt_path
    }

    /// Loads the persisted salt.
    ///
    /// # Errors
    ///
    /// Returns `Error::SaltMissing` if no salt artifact exists and
    /// `Error::Corrupt` if the artifact does not hold exactly
    /// [`SALT_SIZE`] bytes.
    pub fn load(&self) -> Result<Salt> {
        let bytes = match fs::read(&self.salt_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::SaltMissing),
            Err(e) => return Err(Error::Io(e)),
        };

        let salt: [u8; SALT_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            Error::Corrupt(format!(
                "salt file holds {} bytes, expected {SALT_SIZE}",
                bytes.len()
            ))
        })?;

        Ok(Salt(salt))
    }

    /// Generates and persists a fresh random salt.
    ///
    /// The artifact is written atomically and left owner-read-only. If a
    /// salt already exists and an encrypted database is present, this
    /// refuses with `Error::AlreadyInitialized` unless `force` is set, in
    /// which case the salt is overwritten and all existing encrypted data
    /// becomes unrecoverable.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyInitialized` as described above, or
    /// `Error::Io` if persisting the artifact fails.
    pub fn initialize(&self, force: bool) -> Result<Salt> {
        if self.salt_path.exists() && self.db_path.exists() && !force {
            return Err(Error::AlreadyInitialized);
        }

        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);

        fsio::write_atomic(&self.salt_path, &salt, 0o400)?;
        tracing::info!(path = %self.salt_path.display(), forced = force, "salt initialized");

        Ok(Salt(salt))
    }
}
