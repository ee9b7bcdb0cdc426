//! Backend boundary - the document-store client the adapter translates onto.
//!
//! A backend exposes a liveness probe, shutdown, and four per-collection
//! calls. Each call returns the backend's own error type; the adapter
//! classifies those through [`BackendFault`] into the normalized
//! [`StoreError`](crate::StoreError) taxonomy.
//!
//! - [`InMemoryBackend`] - HashMap-backed store for testing and development
//! - [`MongoBackend`] - MongoDB via the official driver (requires `mongodb` feature)

mod memory;
#[cfg(feature = "mongodb")]
mod mongo;

use std::error::Error;

use async_trait::async_trait;
use bson::Bson;

use crate::codec::{Fields, Filter};
use crate::config::StoreConfig;

pub use memory::{InMemoryBackend, MemoryError};
#[cfg(feature = "mongodb")]
pub use mongo::{MongoBackend, MongoConnector, DUPLICATE_KEY_CODE};

/// Classification hook for backend-native errors.
pub trait BackendFault: Error + Send + Sync + 'static {
    /// True when the error reports a uniqueness violation on insert.
    fn is_duplicate_key(&self) -> bool;
}

/// A connected document-store client.
///
/// Collections are addressed by `(database, table)` on every call. The client
/// must be safe for concurrent use; the adapter adds no locking of its own.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    type Error: BackendFault;

    /// Round trip proving the server is reachable.
    async fn ping(&self) -> Result<(), Self::Error>;

    /// Release the client's resources.
    async fn shutdown(&self);

    /// Insert one document and return its stored `_id`.
    async fn insert_one(
        &self,
        database: &str,
        table: &str,
        document: Fields,
    ) -> Result<Bson, Self::Error>;

    /// First document matching `filter`, if any.
    async fn find_one(
        &self,
        database: &str,
        table: &str,
        filter: Filter,
    ) -> Result<Option<Fields>, Self::Error>;

    /// Replace the first document matching `filter`, returning the document
    /// as it was before replacement.
    async fn find_one_and_replace(
        &self,
        database: &str,
        table: &str,
        filter: Filter,
        replacement: Fields,
    ) -> Result<Option<Fields>, Self::Error>;

    /// Delete the first document matching `filter`, returning how many were removed.
    async fn delete_one(
        &self,
        database: &str,
        table: &str,
        filter: Filter,
    ) -> Result<u64, Self::Error>;
}

/// Creates a [`Backend`] client from configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    type Backend: Backend;

    async fn connect(
        &self,
        config: &StoreConfig,
    ) -> Result<Self::Backend, <Self::Backend as Backend>::Error>;
}
