//! StoreAdapter - the persistence contract over a concrete backend.

use async_trait::async_trait;
use bson::Bson;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::{Canceller, ConnectionState, DatabaseService, Scope};
use crate::backend::{Backend, BackendFault, Connector};
use crate::codec::{self, Fields, Filter, Identifier, ID_KEY};
use crate::config::StoreConfig;
use crate::error::{ConnectError, StoreError};

enum State<B> {
    Disconnected,
    Connected(B),
    Closed,
}

/// Implements [`DatabaseService`] by translating each call onto a backend
/// client and classifying the outcome.
///
/// The adapter owns the client exclusively. CRUD calls take `&self` and may
/// run concurrently; the backend client is responsible for its own pooling.
pub struct StoreAdapter<C: Connector> {
    connector: C,
    config: StoreConfig,
    state: State<C::Backend>,
}

impl<C: Connector> StoreAdapter<C> {
    /// A disconnected adapter.
    pub fn new(connector: C, config: StoreConfig) -> Self {
        Self {
            connector,
            config,
            state: State::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match self.state {
            State::Disconnected => ConnectionState::Disconnected,
            State::Connected(_) => ConnectionState::Connected,
            State::Closed => ConnectionState::Closed,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn backend(&self) -> Result<&C::Backend, StoreError> {
        match &self.state {
            State::Connected(backend) => Ok(backend),
            _ => Err(StoreError::NotConnected(self.state())),
        }
    }

    async fn open(&self) -> Result<C::Backend, ConnectError> {
        let backend = self
            .connector
            .connect(&self.config)
            .await
            .map_err(|err| ConnectError::Client(Box::new(err)))?;
        backend
            .ping()
            .await
            .map_err(|err| ConnectError::Ping(Box::new(err)))?;
        Ok(backend)
    }

    async fn find_fields(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        filter: Filter,
    ) -> Result<Fields, StoreError> {
        let backend = self.backend()?;
        scope
            .run(backend.find_one(database, table, filter))
            .await?
            .map_err(StoreError::backend)?
            .ok_or_else(|| StoreError::not_found(database, table))
    }
}

/// Canonical form of whatever identifier a create will store, for
/// duplicate-key reporting. An `_id` that cannot be reported back as an
/// [`Identifier`] is rejected before anything is written.
fn requested_id(fields: &Fields) -> Result<String, StoreError> {
    match fields.get(ID_KEY) {
        Some(value) => Identifier::from_bson(value)
            .map(|id| id.to_string())
            .map_err(|err| StoreError::Encoding(err.to_string())),
        None => Ok(String::new()),
    }
}

#[async_trait]
impl<C> DatabaseService for StoreAdapter<C>
where
    C: Connector + 'static,
{
    async fn connect(&mut self) -> Result<(Scope, Canceller), ConnectError> {
        let current = self.state();
        if current != ConnectionState::Disconnected {
            warn!(state = %current, "connect called on a store that is not disconnected");
            return Err(ConnectError::InvalidState(current));
        }

        let limit = self.config.ping_timeout;
        let backend = match tokio::time::timeout(limit, self.open()).await {
            Ok(opened) => opened?,
            Err(_) => return Err(ConnectError::Timeout(limit)),
        };

        self.state = State::Connected(backend);
        info!("database initialized successfully");
        Ok(Scope::new())
    }

    async fn disconnect(&mut self, _scope: &Scope, canceller: Canceller) {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Connected(backend) => {
                // Runs to completion even when the scope is already cancelled.
                backend.shutdown().await;
                info!("database disconnected");
            }
            State::Disconnected => warn!("disconnect called before connect"),
            State::Closed => warn!("disconnect called on a closed store"),
        }
        canceller.cancel();
    }

    async fn create<D>(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        id: &str,
        document: &D,
    ) -> Result<Identifier, StoreError>
    where
        D: Serialize + Sync + ?Sized,
    {
        let backend = self.backend()?;
        let mut fields = codec::encode(document)?;
        if !id.is_empty() {
            codec::inject_identifier(&mut fields, &Identifier::parse(id));
        }
        let requested = requested_id(&fields)?;
        debug!(database, table, id = %requested, "create");

        match scope.run(backend.insert_one(database, table, fields)).await? {
            Ok(stored) => Identifier::from_bson(&stored).map_err(StoreError::backend),
            Err(err) if err.is_duplicate_key() => Err(StoreError::DuplicateIdentifier {
                database: database.to_string(),
                table: table.to_string(),
                id: requested,
            }),
            Err(err) => Err(StoreError::backend(err)),
        }
    }

    async fn read<T>(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        filter: &Filter,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        debug!(database, table, %filter, "read");
        let fields = self
            .find_fields(scope, database, table, filter.clone())
            .await?;
        codec::decode(fields)
    }

    async fn read_with_id<T>(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        filter: &Filter,
    ) -> Result<(Identifier, T), StoreError>
    where
        T: DeserializeOwned + Send,
    {
        debug!(database, table, %filter, "read with id");
        let fields = self
            .find_fields(scope, database, table, filter.clone())
            .await?;
        let id = Identifier::from_bson(fields.get(ID_KEY).unwrap_or(&Bson::Null))
            .map_err(StoreError::backend)?;
        Ok((id, codec::decode(fields)?))
    }

    async fn read_by_id<T>(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        id: &str,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        debug!(database, table, id, "read by id");
        let filter = codec::id_filter(&Identifier::parse(id));
        let fields = self.find_fields(scope, database, table, filter).await?;
        codec::decode(fields)
    }

    async fn update<D>(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        filter: &Filter,
        document: &D,
    ) -> Result<(), StoreError>
    where
        D: Serialize + Sync + ?Sized,
    {
        let backend = self.backend()?;
        let mut fields = codec::encode(document)?;
        // The matched document keeps its identifier.
        if codec::take_identifier(&mut fields).is_some() {
            debug!(database, table, "update ignores the replacement's _id");
        }
        debug!(database, table, %filter, "update");

        let replaced = scope
            .run(backend.find_one_and_replace(database, table, filter.clone(), fields))
            .await?
            .map_err(StoreError::backend)?;

        match replaced {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(database, table)),
        }
    }

    async fn delete(
        &self,
        scope: &Scope,
        database: &str,
        table: &str,
        id: &str,
    ) -> Result<(), StoreError> {
        let backend = self.backend()?;
        debug!(database, table, id, "delete");

        let filter = codec::id_filter(&Identifier::parse(id));
        let deleted = scope
            .run(backend.delete_one(database, table, filter))
            .await?
            .map_err(StoreError::backend)?;

        if deleted == 0 {
            Err(StoreError::not_found(database, table))
        } else {
            Ok(())
        }
    }
}
