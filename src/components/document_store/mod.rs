//! Generic document store the event store writes through.
//!
//! Documents are JSON objects addressed by collection and id. Queries return a
//! snapshot of the matching documents; filters are evaluated in memory so every
//! backend agrees on their semantics.

mod memory;

pub use memory::MemoryStore;

use crate::error::EngineResult;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;

/// A stored document with its id
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Comparison used by a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ge,
    Le,
}

/// `field op value` condition on a top-level document field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn ge(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Ge,
            value: value.into(),
        }
    }

    pub fn le(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Le,
            value: value.into(),
        }
    }

    /// Whether a document satisfies this filter. Missing fields never match.
    pub fn matches(&self, data: &Value) -> bool {
        let Some(field) = data.get(&self.field) else {
            return false;
        };
        let Some(ordering) = compare_values(field, &self.value) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Ge => ordering != Ordering::Less,
            FilterOp::Le => ordering != Ordering::Greater,
        }
    }
}

/// Whether a document satisfies every filter
pub fn matches_all(filters: &[Filter], data: &Value) -> bool {
    filters.iter().all(|filter| filter.matches(data))
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Shallow-merge `partial` into `target`; both must be JSON objects
pub fn merge_partial(target: &mut Value, partial: &Value) {
    if let (Some(target), Some(partial)) = (target.as_object_mut(), partial.as_object()) {
        for (key, value) in partial {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// One operation of an atomic [`DocumentStore::commit`]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert a new document under a generated id
    Add(Value),
    /// Replace an existing document
    Set { id: String, data: Value },
    /// Merge fields into an existing document
    Update { id: String, partial: Value },
    /// Remove an existing document
    Delete { id: String },
}

/// Storage collaborator for persisted calendar events
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Snapshot of all documents in `collection` matching every filter
    async fn query(&self, collection: &str, filters: &[Filter]) -> EngineResult<Vec<Document>>;

    /// Fetch a single document
    async fn get(&self, collection: &str, id: &str) -> EngineResult<Option<Document>>;

    /// Apply every operation or none of them. Returns the ids of added documents in order.
    async fn commit(&self, collection: &str, ops: Vec<WriteOp>) -> EngineResult<Vec<String>>;

    /// Insert several documents atomically
    async fn add_batch(&self, collection: &str, records: Vec<Value>) -> EngineResult<Vec<String>> {
        self.commit(collection, records.into_iter().map(WriteOp::Add).collect())
            .await
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> EngineResult<()> {
        self.commit(
            collection,
            vec![WriteOp::Update {
                id: id.to_string(),
                partial,
            }],
        )
        .await
        .map(|_| ())
    }

    async fn delete(&self, collection: &str, id: &str) -> EngineResult<()> {
        self.commit(collection, vec![WriteOp::Delete { id: id.to_string() }])
            .await
            .map(|_| ())
    }
}

/// Generate a fresh document id
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_range_filters() {
        let doc = json!({ "eventStart": "2025. 03. 10. 09:00:00", "userId": "u1" });

        assert!(Filter::ge("eventStart", "2025. 03. 01. 00:00:00").matches(&doc));
        assert!(Filter::le("eventStart", "2025. 03. 10. 09:00:00").matches(&doc));
        assert!(!Filter::le("eventStart", "2025. 03. 09. 23:59:59").matches(&doc));
        assert!(Filter::eq("userId", "u1").matches(&doc));
        assert!(!Filter::eq("userId", "u2").matches(&doc));
    }

    #[test]
    fn test_missing_field_or_mismatched_type_never_matches() {
        let doc = json!({ "count": 3 });
        assert!(!Filter::eq("groupId", "g").matches(&doc));
        assert!(!Filter::eq("count", "3").matches(&doc));
        assert!(Filter::ge("count", 2).matches(&doc));
        assert!(matches_all(&[], &doc));
    }

    #[test]
    fn test_merge_partial_overwrites_fields() {
        let mut doc = json!({ "summary": "Old", "type": "HOLIDAY" });
        merge_partial(&mut doc, &json!({ "summary": "New", "groupId": "g1" }));
        assert_eq!(doc, json!({ "summary": "New", "type": "HOLIDAY", "groupId": "g1" }));
    }
}
