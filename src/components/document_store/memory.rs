use super::{matches_all, merge_partial, new_document_id, Document, DocumentStore, Filter, WriteOp};
use crate::error::{write_error, EngineResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

type Collections = HashMap<String, BTreeMap<String, Value>>;

/// In-process document store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |docs| docs.len())
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

/// Apply operations to a staging copy; the caller swaps it in only on success
fn apply_ops(docs: &mut BTreeMap<String, Value>, ops: Vec<WriteOp>) -> EngineResult<Vec<String>> {
    let mut added = Vec::new();
    for op in ops {
        match op {
            WriteOp::Add(data) => {
                let id = new_document_id();
                docs.insert(id.clone(), data);
                added.push(id);
            }
            WriteOp::Set { id, data } => {
                let slot = docs
                    .get_mut(&id)
                    .ok_or_else(|| write_error(&format!("Document {} does not exist", id)))?;
                *slot = data;
            }
            WriteOp::Update { id, partial } => {
                let slot = docs
                    .get_mut(&id)
                    .ok_or_else(|| write_error(&format!("Document {} does not exist", id)))?;
                merge_partial(slot, &partial);
            }
            WriteOp::Delete { id } => {
                docs.remove(&id)
                    .ok_or_else(|| write_error(&format!("Document {} does not exist", id)))?;
            }
        }
    }
    Ok(added)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, collection: &str, filters: &[Filter]) -> EngineResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|(_, data)| matches_all(filters, data))
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> EngineResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn commit(&self, collection: &str, ops: Vec<WriteOp>) -> EngineResult<Vec<String>> {
        let mut collections = self.collections.write().await;
        let mut staged = collections.get(collection).cloned().unwrap_or_default();
        let added = apply_ops(&mut staged, ops)?;
        collections.insert(collection.to_string(), staged);
        Ok(added)
    }
}
