//! # `KasaDB`
//!
//! Passphrase-encrypted JSON document store with salt management and
//! auto-locking sessions.
//!
//! ## Features
//!
//! - Argon2id passphrase key derivation against a persisted random salt
//! - AEAD encryption at rest (ChaCha20-Poly1305) in a versioned envelope
//! - Named collections of JSON documents with stable, never-reused ids
//! - Atomic full-table writes (temp file + rename), durable before return
//! - Unlock/lock session with an idle timeout that re-locks autonomously
//!
//! ## Example
//!
//! ```rust,ignore
//! use kasadb::prelude::*;
//! use serde_json::json;
//!
//! let config = StoreConfig::new("./data");
//! SaltStore::new(config.salt_path(), config.db_path()).initialize(false)?;
//!
//! let store = SecureStore::new(config)?;
//! store.unlock("correct horse battery staple")?;
//! let id = store.insert("pot", fields)?;
//! store.lock();
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod envelope;
pub mod error;
mod fsio;
pub mod kdf;
pub mod salt;
pub mod session;
pub mod store;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::config::StoreConfig;
    pub use crate::error::{Error, Result};
    pub use crate::salt::SaltStore;
    pub use crate::session::SecureStore;
    pub use crate::store::{DocId, Document, Fields};
}
