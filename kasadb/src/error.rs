//! Error types for `KasaDB` operations.

/// Main error type for `KasaDB` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller supplied malformed input (empty passphrase, wrong salt length)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No salt artifact exists yet; the store has not been provisioned
    #[error("salt file not found: run initialization first")]
    SaltMissing,

    /// A salt already exists and an encrypted database is present
    #[error("salt already initialized and a database exists: refusing to overwrite without force")]
    AlreadyInitialized,

    /// The supplied passphrase does not decrypt the current database
    #[error("wrong passphrase")]
    WrongPassphrase,

    /// Encryption operation failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Authentication tag verification failed (data may be corrupted or tampered)
    #[error("authentication failed: envelope may be corrupted or tampered")]
    AuthenticationFailed,

    /// Unsupported envelope format version
    #[error("unsupported version: {version} (supported: {supported})")]
    UnsupportedVersion {
        /// The version found in the envelope
        version: u8,
        /// Supported versions
        supported: String,
    },

    /// Envelope parsing failed before any cryptographic check
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// The store is locked; unlock with a passphrase first
    #[error("store is locked")]
    Locked,

    /// The database decrypted but its contents are not a valid document table
    #[error("corrupt database: {0}")]
    Corrupt(String),

    /// Key derivation failed
    #[error("key derivation failed")]
    KeyDerivation,

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
