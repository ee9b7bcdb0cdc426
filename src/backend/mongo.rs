//! MongoDB backend over the official driver.

use async_trait::async_trait;
use bson::{doc, Bson};
use mongodb::error::{Error, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, ReadPreference, SelectionCriteria};
use mongodb::{Client, Collection};

use super::{Backend, BackendFault, Connector};
use crate::codec::{Fields, Filter};
use crate::config::StoreConfig;

/// Server error code for a unique index violation.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

impl BackendFault for Error {
    fn is_duplicate_key(&self) -> bool {
        match self.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(err)) => err.code == DUPLICATE_KEY_CODE,
            ErrorKind::Command(err) => err.code == DUPLICATE_KEY_CODE,
            _ => false,
        }
    }
}

/// Connects to the cluster named by `StoreConfig::uri`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

#[async_trait]
impl Connector for MongoConnector {
    type Backend = MongoBackend;

    async fn connect(&self, config: &StoreConfig) -> Result<MongoBackend, Error> {
        let options = ClientOptions::parse(&config.uri).await?;
        let client = Client::with_options(options)?;
        Ok(MongoBackend { client })
    }
}

/// A MongoDB client. The driver pools connections internally and is safe to
/// share across tasks.
#[derive(Debug, Clone)]
pub struct MongoBackend {
    client: Client,
}

impl MongoBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn collection(&self, database: &str, table: &str) -> Collection<Fields> {
        self.client.database(database).collection::<Fields>(table)
    }
}

#[async_trait]
impl Backend for MongoBackend {
    type Error = Error;

    async fn ping(&self) -> Result<(), Error> {
        self.client
            .database("admin")
            .run_command(
                doc! { "ping": 1 },
                SelectionCriteria::ReadPreference(ReadPreference::Primary),
            )
            .await?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }

    async fn insert_one(
        &self,
        database: &str,
        table: &str,
        document: Fields,
    ) -> Result<Bson, Error> {
        let result = self
            .collection(database, table)
            .insert_one(document, None)
            .await?;
        Ok(result.inserted_id)
    }

    async fn find_one(
        &self,
        database: &str,
        table: &str,
        filter: Filter,
    ) -> Result<Option<Fields>, Error> {
        self.collection(database, table).find_one(filter, None).await
    }

    async fn find_one_and_replace(
        &self,
        database: &str,
        table: &str,
        filter: Filter,
        replacement: Fields,
    ) -> Result<Option<Fields>, Error> {
        self.collection(database, table)
            .find_one_and_replace(filter, replacement, None)
            .await
    }

    async fn delete_one(
        &self,
        database: &str,
        table: &str,
        filter: Filter,
    ) -> Result<u64, Error> {
        let result = self
            .collection(database, table)
            .delete_one(filter, None)
            .await?;
        Ok(result.deleted_count)
    }
}
