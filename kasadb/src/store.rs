//! Document table: named collections of JSON documents.
//!
//! The whole table is one unit of persistence. Every mutating operation
//! rewrites the full table through [`persist`], which serializes, seals and
//! atomically replaces the database file. Identifiers are assigned from a
//! per-collection counter that survives deletions, so an id is never
//! reused for the lifetime of the database file.

use crate::envelope;
use crate::error::{Error, Result};
use crate::fsio;
use secrecy::SecretVec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Stable document identifier, unique within a collection.
pub type DocId = u64;

/// Field name to JSON value mapping of one document.
pub type Fields = Map<String, Value>;

/// A stored document: its identifier plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier assigned on insert.
    pub id: DocId,
    /// The document body.
    pub fields: Fields,
}

/// One named collection: an insertion-ordered sequence of documents and
/// the next identifier to hand out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Collection {
    next_id: DocId,
    documents: Vec<Document>,
}

impl Default for Collection {
    fn default() -> Self {
        Self { next_id: 1, documents: Vec::new() }
    }
}

/// The in-memory document table, decrypted form of one database file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTable {
    collections: BTreeMap<String, Collection>,
}

impl DocumentTable {
    /// Appends a document to the named collection, creating the collection
    /// if absent, and returns the assigned identifier.
    pub fn insert(&mut self, collection: &str, fields: Fields) -> DocId {
        let coll = self.collections.entry(collection.to_string()).or_default();
        let id = coll.next_id;
        coll.next_id += 1;
        coll.documents.push(Document { id, fields });
        id
    }

    /// Returns the document with the given id, if present.
    #[must_use]
    pub fn get(&self, collection: &str, id: DocId) -> Option<&Document> {
        self.collections.get(collection)?.documents.iter().find(|doc| doc.id == id)
    }

    /// Merges `patch` fields into the document with the given id.
    ///
    /// The merge is shallow: each patch field replaces the whole value
    /// under that name. Returns `false` if the id is not present.
    pub fn update(&mut self, collection: &str, id: DocId, patch: &Fields) -> bool {
        let Some(coll) = self.collections.get_mut(collection) else {
            return false;
        };
        let Some(doc) = coll.documents.iter_mut().find(|doc| doc.id == id) else {
            return false;
        };
        for (name, value) in patch {
            doc.fields.insert(name.clone(), value.clone());
        }
        true
    }

    /// Removes the document with the given id, retiring the identifier.
    ///
    /// The collection entry itself is kept so its id counter survives and
    /// deleted identifiers are never reassigned. Returns `false` if the id
    /// is not present.
    pub fn delete(&mut self, collection: &str, id: DocId) -> bool {
        let Some(coll) = self.collections.get_mut(collection) else {
            return false;
        };
        let before = coll.documents.len();
        coll.documents.retain(|doc| doc.id != id);
        coll.documents.len() != before
    }

    /// Iterates the named collection's documents in insertion order.
    ///
    /// An absent collection yields an empty iterator, not an error.
    pub fn documents<'a>(&'a self, collection: &str) -> impl Iterator<Item = &'a Document> + 'a {
        self.collections.get(collection).map(|coll| coll.documents.iter()).into_iter().flatten()
    }

    /// Iterates the collection names present in the table.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Serializes the table for sealing.
    ///
    /// # Errors
    ///
    /// Returns `Error::Corrupt` if the table does not encode as JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::Corrupt(format!("document table did not encode: {e}")))
    }

    /// Decodes a table from decrypted payload bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Corrupt` if the payload is not a valid table.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Corrupt(format!("decrypted payload is not a document table: {e}")))
    }
}

/// Reads and decrypts the database file into a table.
///
/// A missing or empty file yields an empty table so the first unlock can
/// bootstrap a fresh database.
pub(crate) fn load(path: &Path, key: &SecretVec<u8>) -> Result<DocumentTable> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(Error::Io(e)),
    };

    let plaintext = envelope::open(&bytes, key)?;
    if plaintext.is_empty() {
        return Ok(DocumentTable::default());
    }
    DocumentTable::from_bytes(&plaintext)
}

/// Serializes, seals and atomically replaces the database file.
///
/// On return the write has reached durable storage; on failure the prior
/// on-disk state is left intact.
pub(crate) fn persist(path: &Path, key: &SecretVec<u8>, table: &DocumentTable) -> Result<()> {
    let plaintext = table.to_bytes()?;
    let sealed = envelope::seal(&plaintext, key)?;
    fsio::write_atomic(path, &sealed, 0o600)?;
    tracing::debug!(path = %path.display(), bytes = sealed.len(), "database persisted");
    Ok(())
}
