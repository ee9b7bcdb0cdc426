//! Error types for the persistence contract.
//!
//! `StoreError` is the normalized taxonomy every CRUD call returns. Callers
//! branch on it without depending on any backend's own error types.
//! `ConnectError` covers the failures that make a connection unusable at
//! startup.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use crate::store::ConnectionState;

/// Boxed backend cause, kept for diagnostics.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Normalized error for create, read, update and delete.
#[derive(Debug)]
pub enum StoreError {
    /// No document matched the filter or identifier.
    NotFound { database: String, table: String },
    /// Create attempted with an identifier already present in the table.
    DuplicateIdentifier {
        database: String,
        table: String,
        id: String,
    },
    /// The caller's document could not be converted to a field map.
    Encoding(String),
    /// A stored field map could not be converted into the caller's type.
    Decoding(String),
    /// Any other backend-reported failure (network, auth, malformed query).
    Backend(BoxError),
    /// The operation's scope was cancelled while it was in flight.
    Cancelled,
    /// The operation's scope deadline passed before the backend answered.
    DeadlineExceeded,
    /// The adapter is not connected.
    NotConnected(ConnectionState),
}

impl StoreError {
    pub(crate) fn not_found(database: &str, table: &str) -> Self {
        StoreError::NotFound {
            database: database.to_string(),
            table: table.to_string(),
        }
    }

    pub(crate) fn backend<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }

    /// True for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// True for `DuplicateIdentifier`.
    pub fn is_duplicate_identifier(&self) -> bool {
        matches!(self, StoreError::DuplicateIdentifier { .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { database, table } => {
                write!(f, "item does not exist in {}.{}", database, table)
            }
            StoreError::DuplicateIdentifier {
                database,
                table,
                id,
            } => write!(f, "duplicated id {} in {}.{}", id, database, table),
            StoreError::Encoding(msg) => write!(f, "document encoding error: {}", msg),
            StoreError::Decoding(msg) => write!(f, "document decoding error: {}", msg),
            StoreError::Backend(e) => write!(f, "backend error: {}", e),
            StoreError::Cancelled => write!(f, "operation cancelled"),
            StoreError::DeadlineExceeded => write!(f, "operation deadline exceeded"),
            StoreError::NotConnected(state) => {
                write!(f, "store is not connected (state: {})", state)
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Backend(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::Encoding(err.to_string())
    }
}

impl From<bson::de::Error> for StoreError {
    fn from(err: bson::de::Error) -> Self {
        StoreError::Decoding(err.to_string())
    }
}

/// Failure establishing the backend connection.
///
/// Treated as fatal by [`connect_or_exit`](crate::connect_or_exit).
#[derive(Debug)]
pub enum ConnectError {
    /// `MONGODB_URI` is unset or empty.
    MissingUri,
    /// A configuration value could not be parsed.
    InvalidConfig(String),
    /// The backend client could not be created.
    Client(BoxError),
    /// The liveness probe failed.
    Ping(BoxError),
    /// Client creation plus liveness probe exceeded the configured bound.
    Timeout(Duration),
    /// `connect` was called outside the `Disconnected` state.
    InvalidState(ConnectionState),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::MissingUri => write!(f, "MONGODB_URI is not set"),
            ConnectError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            ConnectError::Client(e) => write!(f, "could not create database client: {}", e),
            ConnectError::Ping(e) => write!(f, "database liveness probe failed: {}", e),
            ConnectError::Timeout(limit) => {
                write!(f, "database did not answer within {:?}", limit)
            }
            ConnectError::InvalidState(state) => {
                write!(f, "cannot connect from state {}", state)
            }
        }
    }
}

impl Error for ConnectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConnectError::Client(e) | ConnectError::Ping(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}
