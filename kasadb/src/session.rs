//! The unlock/lock session guarding every document operation.
//!
//! [`SecureStore`] owns the session state machine. The derived key exists
//! only inside the `Unlocked` state; both explicit [`SecureStore::lock`]
//! and the idle-timeout monitor replace the state with `Locked`, which
//! drops (and zeroizes) the key and discards the plaintext table. The
//! monitor thread takes the same mutex as every operation, so a timeout
//! can never race a concurrent unlock.

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::kdf;
use crate::salt::SaltStore;
use crate::store::{self, DocId, Document, DocumentTable, Fields};
use parking_lot::{Condvar, Mutex, MutexGuard};
use secrecy::SecretVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Session state. The only place a derived key ever lives.
enum Session {
    Locked,
    Unlocked(Unlocked),
}

struct Unlocked {
    key: SecretVec<u8>,
    table: DocumentTable,
    last_access: Instant,
}

struct Shared {
    config: StoreConfig,
    session: Mutex<Session>,
    wake: Condvar,
    shutdown: AtomicBool,
}

/// Re-locks the session if the idle window has elapsed. Callers hold the
/// session mutex; the monitor thread and every gated operation run this
/// same check, so an operation arriving after the deadline but before the
/// monitor fires still observes `Locked`.
fn expire_if_idle(session: &mut Session, shared: &Shared) {
    if let Session::Unlocked(unlocked) = &*session {
        let Some(deadline) = unlocked.last_access.checked_add(shared.config.idle_timeout()) else {
            return;
        };
        if Instant::now() >= deadline {
            *session = Session::Locked;
            tracing::info!("store auto-locked after inactivity");
        }
    }
}

fn monitor_loop(shared: &Shared) {
    let mut session = shared.session.lock();
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }
        expire_if_idle(&mut session, shared);
        match &*session {
            Session::Locked => shared.wake.wait(&mut session),
            Session::Unlocked(unlocked) => {
                match unlocked.last_access.checked_add(shared.config.idle_timeout()) {
                    Some(deadline) => {
                        let _ = shared.wake.wait_until(&mut session, deadline);
                    }
                    None => shared.wake.wait(&mut session),
                }
            }
        }
    }
}

/// A passphrase-guarded document store.
///
/// Created in `Locked` state; every document operation fails with
/// [`Error::Locked`] until [`SecureStore::unlock`] validates a passphrase
/// against the current database file. All operations on one store share a
/// single critical section, serializing each read-modify-encrypt-write
/// sequence.
///
/// # Example
///
/// ```no_run
/// use kasadb::config::StoreConfig;
/// use kasadb::session::SecureStore;
/// use serde_json::json;
///
/// # fn main() -> kasadb::error::Result<()> {
/// let store = SecureStore::new(StoreConfig::new("./data"))?;
/// store.unlock("correct horse battery staple")?;
/// let fields = match json!({"date": "2024-01-01", "starting_balance": 500}) {
///     serde_json::Value::Object(map) => map,
///     _ => unreachable!(),
/// };
/// let id = store.insert("pot", fields)?;
/// store.lock();
/// # Ok(())
/// # }
/// ```
pub struct SecureStore {
    shared: Arc<Shared>,
    monitor: Option<JoinHandle<()>>,
}

impl SecureStore {
    /// Creates a locked store over the configured artifact locations and
    /// starts its idle-timeout monitor.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the monitor thread cannot be spawned.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let shared = Arc::new(Shared {
            config,
            session: Mutex::new(Session::Locked),
            wake: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let monitor_shared = Arc::clone(&shared);
        let monitor = thread::Builder::new()
            .name("kasadb-autolock".to_string())
            .spawn(move || monitor_loop(&monitor_shared))?;

        Ok(Self { shared, monitor: Some(monitor) })
    }

    /// Derives a key from the passphrase and validates it against the
    /// current database file.
    ///
    /// On success the store transitions to unlocked, caching the key and
    /// the decoded table, and the idle window starts. Key derivation runs
    /// outside the critical section. A failed attempt always leaves the
    /// store locked, including a failed re-unlock of an unlocked store.
    ///
    /// # Errors
    ///
    /// Returns `Error::SaltMissing` if the store was never provisioned,
    /// `Error::InvalidInput` for an empty passphrase,
    /// `Error::WrongPassphrase` if the current database does not
    /// authenticate under the derived key, and `Error::Corrupt` if it
    /// authenticates but does not decode.
    pub fn unlock(&self, passphrase: &str) -> Result<()> {
        let salt =
            SaltStore::new(self.shared.config.salt_path(), self.shared.config.db_path()).load()?;
        let key = kdf::derive_key(passphrase, salt.as_bytes())?;

        let mut session = self.shared.session.lock();
        let table = match store::load(self.shared.config.db_path(), &key) {
            Ok(table) => table,
            Err(e) => {
                *session = Session::Locked;
                return Err(match e {
                    Error::AuthenticationFailed => Error::WrongPassphrase,
                    other => other,
                });
            }
        };

        *session = Session::Unlocked(Unlocked { key, table, last_access: Instant::now() });
        self.shared.wake.notify_all();
        tracing::info!("store unlocked");
        Ok(())
    }

    /// Locks the store, discarding the cached key and plaintext table.
    pub fn lock(&self) {
        let mut session = self.shared.session.lock();
        if matches!(&*session, Session::Unlocked(_)) {
            *session = Session::Locked;
            tracing::info!("store locked");
        }
        self.shared.wake.notify_all();
    }

    /// Reports whether the store is currently unlocked.
    ///
    /// An expired idle window counts as locked even if the monitor has not
    /// fired yet.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        let mut session = self.shared.session.lock();
        expire_if_idle(&mut session, &self.shared);
        matches!(&*session, Session::Unlocked(_))
    }

    /// Inserts a document into the named collection and persists the table
    /// before returning.
    ///
    /// # Errors
    ///
    /// Returns `Error::Locked` if no session is active and `Error::Io` if
    /// the write fails, in which case neither disk nor memory state has
    /// changed.
    pub fn insert(&self, collection: &str, document: Fields) -> Result<DocId> {
        let mut live = self.live_session()?;
        let mut table = live.table.clone();
        let id = table.insert(collection, document);
        store::persist(self.shared.config.db_path(), &live.key, &table)?;
        live.table = table;
        live.last_access = Instant::now();
        Ok(id)
    }

    /// Returns the documents of a collection matching `predicate`, in
    /// insertion order. An absent collection yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns `Error::Locked` if no session is active.
    pub fn query<P>(&self, collection: &str, mut predicate: P) -> Result<Vec<Document>>
    where
        P: FnMut(&Document) -> bool,
    {
        let mut live = self.live_session()?;
        live.last_access = Instant::now();
        Ok(live.table.documents(collection).filter(|doc| predicate(doc)).cloned().collect())
    }

    /// Returns every document of a collection in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Locked` if no session is active.
    pub fn all(&self, collection: &str) -> Result<Vec<Document>> {
        self.query(collection, |_| true)
    }

    /// Shallow-merges `patch` into the document with the given id and
    /// persists on success. Returns `Ok(false)` if the id is not present.
    ///
    /// # Errors
    ///
    /// Returns `Error::Locked` if no session is active and `Error::Io` if
    /// the write fails.
    pub fn update(&self, collection: &str, id: DocId, patch: &Fields) -> Result<bool> {
        let mut live = self.live_session()?;
        let mut table = live.table.clone();
        if !table.update(collection, id, patch) {
            live.last_access = Instant::now();
            return Ok(false);
        }
        store::persist(self.shared.config.db_path(), &live.key, &table)?;
        live.table = table;
        live.last_access = Instant::now();
        Ok(true)
    }

    /// Removes the document with the given id and persists on success.
    /// The identifier is retired and never reassigned. Returns `Ok(false)`
    /// if the id is not present.
    ///
    /// # Errors
    ///
    /// Returns `Error::Locked` if no session is active and `Error::Io` if
    /// the write fails.
    pub fn delete(&self, collection: &str, id: DocId) -> Result<bool> {
        let mut live = self.live_session()?;
        let mut table = live.table.clone();
        if !table.delete(collection, id) {
            live.last_access = Instant::now();
            return Ok(false);
        }
        store::persist(self.shared.config.db_path(), &live.key, &table)?;
        live.table = table;
        live.last_access = Instant::now();
        Ok(true)
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    fn live_session(&self) -> Result<parking_lot::MappedMutexGuard<'_, Unlocked>> {
        let mut session = self.shared.session.lock();
        expire_if_idle(&mut session, &self.shared);
        MutexGuard::try_map(session, |session| match session {
            Session::Unlocked(unlocked) => Some(unlocked),
            Session::Locked => None,
        })
        .map_err(|_| Error::Locked)
    }
}

impl Drop for SecureStore {
    fn drop(&mut self) {
        {
            let mut session = self.shared.session.lock();
            *session = Session::Locked;
            self.shared.shutdown.store(true, Ordering::Release);
            self.shared.wake.notify_all();
        }
        if let Some(monitor) = self.monitor.take() {
            let _ = monitor.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_fresh_store_is_locked() {
        let dir = TempDir::new().expect("temp dir");
        let store = SecureStore::new(StoreConfig::new(dir.path())).expect("store");

        assert!(!store.is_unlocked());
        assert!(matches!(store.insert("pot", fields(json!({}))), Err(Error::Locked)));
        assert!(matches!(store.all("pot"), Err(Error::Locked)));
        assert!(matches!(store.update("pot", 1, &fields(json!({}))), Err(Error::Locked)));
        assert!(matches!(store.delete("pot", 1), Err(Error::Locked)));
    }

    #[test]
    fn test_unlock_without_salt() {
        let dir = TempDir::new().expect("temp dir");
        let store = SecureStore::new(StoreConfig::new(dir.path())).expect("store");

        assert!(matches!(store.unlock("anything"), Err(Error::SaltMissing)));
        assert!(!store.is_unlocked());
    }

    #[test]
    fn test_unlock_with_empty_passphrase() {
        let dir = TempDir::new().expect("temp dir");
        let config = StoreConfig::new(dir.path());
        SaltStore::new(config.salt_path(), config.db_path())
            .initialize(false)
            .expect("salt init");
        let store = SecureStore::new(config).expect("store");

        assert!(matches!(store.unlock(""), Err(Error::InvalidInput(_))));
        assert!(!store.is_unlocked());
    }

    #[test]
    fn test_lock_is_idempotent() {
        let dir = TempDir::new().expect("temp dir");
        let store = SecureStore::new(StoreConfig::new(dir.path())).expect("store");

        store.lock();
        store.lock();
        assert!(!store.is_unlocked());
    }
}
