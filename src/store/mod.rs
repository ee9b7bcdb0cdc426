//! Store - the database-agnostic persistence contract.
//!
//! Callers talk to a [`DatabaseService`]: connect once, then create, read,
//! update and delete documents addressed by `(database, table)`, and finally
//! disconnect. [`StoreAdapter`] implements the contract on top of any
//! [`Connector`](crate::backend::Connector).
//!
//! ## Example
//!
//! ```ignore
//! use pucci::{bson::doc, DatabaseService, MongoConnector, StoreAdapter, StoreConfig};
//!
//! let mut store = StoreAdapter::new(MongoConnector, StoreConfig::from_env()?);
//! let (scope, canceller) = pucci::connect_or_exit(&mut store).await;
//!
//! let id = store.create(&scope, "app", "users", "42", &User { name: "a".into() }).await?;
//! let user: User = store.read(&scope, "app", "users", &doc! { "name": "a" }).await?;
//!
//! store.disconnect(&scope, canceller).await;
//! ```

mod adapter;
mod scope;

use std::fmt;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::codec::{Filter, Identifier};
use crate::error::{ConnectError, StoreError};

pub use adapter::StoreAdapter;
pub use scope::{Canceller, Scope};

/// Lifecycle of a store's backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    /// Terminal.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// The persistence contract.
///
/// Every CRUD call is a single round trip bounded by `scope`: cancelling the
/// scope aborts it with `StoreError::Cancelled`, and a scope deadline aborts
/// it with `StoreError::DeadlineExceeded`. Nothing is retried.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Establish the backend connection and verify it is alive.
    async fn connect(&mut self) -> Result<(Scope, Canceller), ConnectError>;

    /// Release the backend connection and cancel the lifetime scope.
    async fn disconnect(&mut self, scope: &Scope, canceller: Canceller);

    /// Insert `document` under `id` and return the identifier the backend
    /// stored. An empty `id` lets the backend generate one.
    async fn create<D>(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        id: &str,
        document: &D,
    ) -> Result<Identifier, StoreError>
    where
        D: Serialize + Sync + ?Sized;

    /// Decode the first document matching `filter`.
    async fn read<T>(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        filter: &Filter,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Send;

    /// Like [`read`](Self::read), also returning the matched identifier.
    async fn read_with_id<T>(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        filter: &Filter,
    ) -> Result<(Identifier, T), StoreError>
    where
        T: DeserializeOwned + Send;

    /// Decode the document stored under `id`.
    async fn read_by_id<T>(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        id: &str,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Send;

    /// Replace the first document matching `filter` with `document`.
    async fn update<D>(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        filter: &Filter,
        document: &D,
    ) -> Result<(), StoreError>
    where
        D: Serialize + Sync + ?Sized;

    /// Remove the document stored under `id`.
    async fn delete(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        id: &str,
    ) -> Result<(), StoreError>;
}

/// Connect, or log the failure and terminate the process.
///
/// A store that cannot reach its database at startup is not usable, so
/// services call this instead of handling `ConnectError` themselves.
pub async fn connect_or_exit<S>(service: &mut S) -> (Scope, Canceller)
where
    S: DatabaseService,
{
    match service.connect().await {
        Ok(connected) => connected,
        Err(err) => {
            tracing::error!(error = %err, "database connection failed");
            std::process::exit(1);
        }
    }
}
