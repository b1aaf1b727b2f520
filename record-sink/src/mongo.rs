//! MongoDB-backed record sink.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::{Client, Collection};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{Result, SinkError};
use crate::record::FileCreationRecord;
use crate::sink::RecordSink;

/// Sink writing one document per record into a MongoDB collection.
pub struct MongoSink {
    client: Client,
    collection: Collection<FileCreationRecord>,
    closed: AtomicBool,
}

impl MongoSink {
    /// Connect using the URI composed from `config` and verify the server
    /// answers a `ping`, so an unreachable or unauthenticated store fails
    /// here rather than on the first insert.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let redacted = config.redacted_uri();
        debug!("Connecting to {redacted}");

        let client = Client::with_uri_str(config.connection_uri())
            .await
            .map_err(|source| SinkError::Connect {
                uri: redacted.clone(),
                source,
            })?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| SinkError::Connect {
                uri: redacted.clone(),
                source,
            })?;

        let collection = client
            .database(&config.database)
            .collection::<FileCreationRecord>(&config.file_collection);

        info!(
            "Writing records to {}.{} on {redacted}",
            config.database, config.file_collection
        );

        Ok(Self {
            client,
            collection,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl RecordSink for MongoSink {
    fn name(&self) -> &str {
        "mongodb"
    }

    async fn insert(&self, record: &FileCreationRecord) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }

        self.collection
            .insert_one(record)
            .await
            .map_err(SinkError::Insert)?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.client.clone().shutdown().await;
        info!("Disconnected from record store");
        Ok(())
    }
}
