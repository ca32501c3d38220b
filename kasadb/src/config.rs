//! Store configuration: artifact locations and the idle window.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default database artifact file name.
pub const DEFAULT_DB_FILE: &str = "db.enc";

/// Default salt artifact file name.
pub const DEFAULT_SALT_FILE: &str = "kdf_salt.bin";

/// Default idle window before an unlocked session re-locks itself.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(180);

/// Filesystem locations of the two persisted artifacts plus the idle
/// timeout for unlocked sessions.
///
/// # Example
///
/// ```
/// use kasadb::config::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::new("./data").with_idle_timeout(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    db_path: PathBuf,
    salt_path: PathBuf,
    idle_timeout: Duration,
}

impl StoreConfig {
    /// Creates a configuration with both artifacts under `data_dir` and the
    /// default idle timeout.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            db_path: data_dir.join(DEFAULT_DB_FILE),
            salt_path: data_dir.join(DEFAULT_SALT_FILE),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Overrides the database artifact location.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Overrides the salt artifact location.
    #[must_use]
    pub fn with_salt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.salt_path = path.into();
        self
    }

    /// Overrides the idle window after which an unlocked session re-locks.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Returns the database artifact path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Returns the salt artifact path.
    #[must_use]
    pub fn salt_path(&self) -> &Path {
        &self.salt_path
    }

    /// Returns the idle timeout.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
}
