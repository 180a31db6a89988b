use crate::components::document_store::{
    matches_all, merge_partial, new_document_id, Document, DocumentStore, Filter, WriteOp,
};
use crate::config::Config;
use crate::error::{store_error, write_error, EngineResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client as RedisClient};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{error, info};

// Redis key constants
pub mod keys {
    pub const COLLECTION_PREFIX: &str = "workcal:collection:";
}

fn collection_key(collection: &str) -> String {
    format!("{}{}", keys::COLLECTION_PREFIX, collection)
}

/// The Redis actor that processes store commands one at a time.
///
/// Every write goes through this loop, so the read-then-`MULTI` sequence in
/// [`RedisActor::commit`] never interleaves with another write from this process.
pub struct RedisActor {
    client: RedisClient,
    connection: Option<ConnectionManager>,
    command_rx: mpsc::Receiver<RedisCommand>,
}

/// Commands that can be sent to the Redis actor
pub enum RedisCommand {
    Query(String, Vec<Filter>, mpsc::Sender<EngineResult<Vec<Document>>>),
    Get(String, String, mpsc::Sender<EngineResult<Option<Document>>>),
    Commit(String, Vec<WriteOp>, mpsc::Sender<EngineResult<Vec<String>>>),
    Shutdown,
}

/// Handle for communicating with the Redis actor
#[derive(Clone)]
pub struct RedisActorHandle {
    command_tx: mpsc::Sender<RedisCommand>,
}

impl RedisActorHandle {
    /// Create a handle with no actor behind it; every call fails with a store error
    pub fn empty() -> Self {
        let (command_tx, _) = mpsc::channel(32);
        Self { command_tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<EngineResult<T>>) -> RedisCommand,
    ) -> EngineResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(build(response_tx))
            .await
            .map_err(|e| store_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| store_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> EngineResult<()> {
        let _ = self.command_tx.send(RedisCommand::Shutdown).await;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RedisActorHandle {
    async fn query(&self, collection: &str, filters: &[Filter]) -> EngineResult<Vec<Document>> {
        let collection = collection.to_string();
        let filters = filters.to_vec();
        self.request(|tx| RedisCommand::Query(collection, filters, tx))
            .await
    }

    async fn get(&self, collection: &str, id: &str) -> EngineResult<Option<Document>> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.request(|tx| RedisCommand::Get(collection, id, tx)).await
    }

    async fn commit(&self, collection: &str, ops: Vec<WriteOp>) -> EngineResult<Vec<String>> {
        let collection = collection.to_string();
        self.request(|tx| RedisCommand::Commit(collection, ops, tx))
            .await
    }
}

impl RedisActor {
    /// Create a new actor and return its handle
    pub fn new(config: &Config) -> EngineResult<(Self, RedisActorHandle)> {
        let (command_tx, command_rx) = mpsc::channel(32);

        let client = RedisClient::open(config.redis_url.as_str())
            .map_err(|e| store_error(&format!("Failed to create Redis client: {}", e)))?;

        let actor = Self {
            client,
            connection: None,
            command_rx,
        };

        let handle = RedisActorHandle { command_tx };

        Ok((actor, handle))
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Redis actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                RedisCommand::Query(collection, filters, response_tx) => {
                    let result = self.query(&collection, &filters).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::Get(collection, id, response_tx) => {
                    let result = self.get(&collection, &id).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::Commit(collection, ops, response_tx) => {
                    let result = self.commit(&collection, ops).await;
                    if let Err(e) = &result {
                        error!("Redis commit to {} failed: {}", collection, e);
                    }
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::Shutdown => {
                    info!("Redis actor shutting down");
                    break;
                }
            }
        }

        info!("Redis actor shut down");
    }

    /// Get a redis connection, connecting on first use
    async fn connection(&mut self) -> EngineResult<ConnectionManager> {
        if let Some(connection) = &self.connection {
            return Ok(connection.clone());
        }

        let connection = ConnectionManager::new(self.client.clone())
            .await
            .map_err(|e| store_error(&format!("Failed to connect to Redis: {}", e)))?;
        self.connection = Some(connection.clone());
        Ok(connection)
    }

    async fn read_document(
        conn: &mut ConnectionManager,
        key: &str,
        id: &str,
    ) -> EngineResult<Option<Value>> {
        let raw: Option<String> = conn
            .hget(key, id)
            .await
            .map_err(|e| store_error(&format!("Failed to read document {}: {}", id, e)))?;

        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| store_error(&format!("Failed to deserialize document {}: {}", id, e)))
        })
        .transpose()
    }

    async fn query(&mut self, collection: &str, filters: &[Filter]) -> EngineResult<Vec<Document>> {
        let mut conn = self.connection().await?;
        let key = collection_key(collection);

        let raw: HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .map_err(|e| store_error(&format!("Failed to read {}: {}", collection, e)))?;

        let mut documents = Vec::new();
        for (id, json) in raw {
            match serde_json::from_str::<Value>(&json) {
                Ok(data) if matches_all(filters, &data) => documents.push(Document { id, data }),
                Ok(_) => {}
                Err(e) => error!("Skipping corrupt document {} in {}: {}", id, collection, e),
            }
        }
        documents.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(documents)
    }

    async fn get(&mut self, collection: &str, id: &str) -> EngineResult<Option<Document>> {
        let mut conn = self.connection().await?;
        let key = collection_key(collection);

        Ok(Self::read_document(&mut conn, &key, id)
            .await?
            .map(|data| Document {
                id: id.to_string(),
                data,
            }))
    }

    /// Resolve every operation against current state, then write them in one `MULTI/EXEC`
    async fn commit(&mut self, collection: &str, ops: Vec<WriteOp>) -> EngineResult<Vec<String>> {
        let mut conn = self.connection().await?;
        let key = collection_key(collection);

        let mut pipe = redis::pipe();
        pipe.atomic();
        let mut added = Vec::new();

        for op in ops {
            match op {
                WriteOp::Add(data) => {
                    let id = new_document_id();
                    pipe.hset(&key, &id, data.to_string()).ignore();
                    added.push(id);
                }
                WriteOp::Set { id, data } => {
                    if Self::read_document(&mut conn, &key, &id).await?.is_none() {
                        return Err(write_error(&format!("Document {} does not exist", id)));
                    }
                    pipe.hset(&key, &id, data.to_string()).ignore();
                }
                WriteOp::Update { id, partial } => {
                    let mut current = Self::read_document(&mut conn, &key, &id)
                        .await?
                        .ok_or_else(|| write_error(&format!("Document {} does not exist", id)))?;
                    merge_partial(&mut current, &partial);
                    pipe.hset(&key, &id, current.to_string()).ignore();
                }
                WriteOp::Delete { id } => {
                    if Self::read_document(&mut conn, &key, &id).await?.is_none() {
                        return Err(write_error(&format!("Document {} does not exist", id)));
                    }
                    pipe.hdel(&key, &id).ignore();
                }
            }
        }

        let () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| write_error(&format!("Failed to commit batch to {}: {}", collection, e)))?;

        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_handle_reports_store_error() {
        let handle = RedisActorHandle::empty();
        let result = handle.query("calendar-events", &[]).await;
        assert!(matches!(result, Err(crate::error::Error::Store(_))));
        assert!(handle.shutdown().await.is_ok());
    }

    #[test]
    fn test_collection_key() {
        assert_eq!(
            collection_key("calendar-events"),
            "workcal:collection:calendar-events"
        );
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let config = Config {
            redis_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(RedisActor::new(&config).is_err());
    }
}
