//! pucci - database-agnostic document persistence.
//!
//! A narrow contract (`create`, `read`, `update`, `delete`, connect and
//! disconnect) that callers use without knowing which document store backs
//! it. [`StoreAdapter`] translates each call onto a [`Backend`] and folds the
//! backend's failures into [`StoreError`].

pub mod backend;
pub mod codec;
mod config;
mod error;
mod store;

pub use backend::{Backend, BackendFault, Connector, InMemoryBackend, MemoryError};
#[cfg(feature = "mongodb")]
pub use backend::{MongoBackend, MongoConnector};
pub use codec::{Fields, Filter, Identifier, ID_KEY};
pub use config::{StoreConfig, DEFAULT_PING_TIMEOUT, PING_TIMEOUT_VAR, URI_VAR};
pub use error::{BoxError, ConnectError, StoreError};
pub use store::{
    connect_or_exit, Canceller, ConnectionState, DatabaseService, Scope, StoreAdapter,
};

// Re-export BSON so callers can build filters with `pucci::bson::doc!`
pub use bson;
