//! InMemoryBackend - HashMap-backed document store for testing and development.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use bson::Bson;

use super::{Backend, BackendFault, Connector};
use crate::codec::{self, Fields, Filter, Identifier, ID_KEY};
use crate::config::StoreConfig;

/// Error type for the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// A document with this `_id` already exists in the namespace.
    DuplicateKey { namespace: String, id: String },
    /// A replacement tried to change the stored `_id`.
    ImmutableId { namespace: String },
    /// The backend was switched off with `set_available(false)`.
    Unavailable,
    LockPoisoned(&'static str),
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::DuplicateKey { namespace, id } => {
                write!(f, "duplicate key in {}: _id {}", namespace, id)
            }
            MemoryError::ImmutableId { namespace } => {
                write!(f, "replacement would modify the immutable _id in {}", namespace)
            }
            MemoryError::Unavailable => write!(f, "in-memory backend unavailable"),
            MemoryError::LockPoisoned(operation) => {
                write!(f, "in-memory backend lock poisoned during {}", operation)
            }
        }
    }
}

impl std::error::Error for MemoryError {}

impl BackendFault for MemoryError {
    fn is_duplicate_key(&self) -> bool {
        matches!(self, MemoryError::DuplicateKey { .. })
    }
}

/// In-memory document store.
///
/// Namespaces are keyed `"database.table"`; each holds its documents in
/// insertion order, which is the order "first match" follows. Clone-friendly
/// via Arc: clones share storage, so a test can keep a handle to inspect
/// what an adapter wrote.
#[derive(Clone)]
pub struct InMemoryBackend {
    storage: Arc<RwLock<HashMap<String, Vec<Fields>>>>,
    available: Arc<AtomicBool>,
    shut_down: Arc<AtomicBool>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
            shut_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every call (ping included) fail with `MemoryError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Whether `shutdown` has run on this instance or one of its clones.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Number of documents stored in one table.
    ///
    /// Inspection only: a poisoned lock still reports what was stored, while
    /// the `Backend` calls fail with `MemoryError::LockPoisoned`.
    pub fn len(&self, database: &str, table: &str) -> usize {
        let storage = self.storage.read().unwrap_or_else(PoisonError::into_inner);
        storage
            .get(&Self::namespace(database, table))
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self, database: &str, table: &str) -> bool {
        self.len(database, table) == 0
    }

    fn namespace(database: &str, table: &str) -> String {
        format!("{}.{}", database, table)
    }

    fn check_available(&self) -> Result<(), MemoryError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MemoryError::Unavailable)
        }
    }
}

fn matches(document: &Fields, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

fn display_id(id: &Bson) -> String {
    match Identifier::from_bson(id) {
        Ok(id) => id.to_string(),
        Err(_) => id.to_string(),
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    type Error = MemoryError;

    async fn ping(&self) -> Result<(), MemoryError> {
        self.check_available()
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }

    async fn insert_one(
        &self,
        database: &str,
        table: &str,
        mut document: Fields,
    ) -> Result<Bson, MemoryError> {
        self.check_available()?;

        let id = match document.get(ID_KEY) {
            Some(id) => id.clone(),
            None => {
                let id = Identifier::generate();
                codec::inject_identifier(&mut document, &id);
                id.to_bson()
            }
        };

        let namespace = Self::namespace(database, table);
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MemoryError::LockPoisoned("insert"))?;
        let documents = storage.entry(namespace.clone()).or_default();

        if documents.iter().any(|stored| stored.get(ID_KEY) == Some(&id)) {
            return Err(MemoryError::DuplicateKey {
                namespace,
                id: display_id(&id),
            });
        }

        documents.push(document);
        Ok(id)
    }

    async fn find_one(
        &self,
        database: &str,
        table: &str,
        filter: Filter,
    ) -> Result<Option<Fields>, MemoryError> {
        self.check_available()?;

        let storage = self
            .storage
            .read()
            .map_err(|_| MemoryError::LockPoisoned("find"))?;

        Ok(storage
            .get(&Self::namespace(database, table))
            .and_then(|documents| documents.iter().find(|doc| matches(doc, &filter)))
            .cloned())
    }

    async fn find_one_and_replace(
        &self,
        database: &str,
        table: &str,
        filter: Filter,
        mut replacement: Fields,
    ) -> Result<Option<Fields>, MemoryError> {
        self.check_available()?;

        let namespace = Self::namespace(database, table);
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MemoryError::LockPoisoned("replace"))?;

        let Some(stored) = storage
            .get_mut(&namespace)
            .and_then(|documents| documents.iter_mut().find(|doc| matches(doc, &filter)))
        else {
            return Ok(None);
        };

        let stored_id = stored.get(ID_KEY).cloned();
        if let Some(new_id) = codec::take_identifier(&mut replacement) {
            if stored_id.as_ref() != Some(&new_id) {
                return Err(MemoryError::ImmutableId { namespace });
            }
        }

        let mut next = Fields::new();
        if let Some(id) = stored_id {
            next.insert(ID_KEY, id);
        }
        for (key, value) in replacement {
            next.insert(key, value);
        }

        Ok(Some(std::mem::replace(stored, next)))
    }

    async fn delete_one(
        &self,
        database: &str,
        table: &str,
        filter: Filter,
    ) -> Result<u64, MemoryError> {
        self.check_available()?;

        let mut storage = self
            .storage
            .write()
            .map_err(|_| MemoryError::LockPoisoned("delete"))?;

        let Some(documents) = storage.get_mut(&Self::namespace(database, table)) else {
            return Ok(0);
        };

        match documents.iter().position(|doc| matches(doc, &filter)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

/// The in-memory backend is its own connector: connecting hands out a clone
/// sharing this instance's storage, whatever the URI.
#[async_trait]
impl Connector for InMemoryBackend {
    type Backend = InMemoryBackend;

    async fn connect(&self, _config: &StoreConfig) -> Result<InMemoryBackend, MemoryError> {
        Ok(self.clone())
    }
}
