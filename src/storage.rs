//!
//! strata storage module
//! ---------------------
//! A schemaless document store: named collections of JSON field maps keyed by
//! opaque string ids. The `DocumentStore` trait is the seam the API talks to;
//! `memory::MemoryStore` is the bundled backend (in-memory, optionally
//! persisted as an atomic bincode snapshot), and `projects::ProjectStore` is the
//! typed adapter the HTTP handlers use.
//!
//! Semantics follow a managed document database:
//! - `merge` writes into an existing document or creates it (no existence check);
//!   `update_existing` only ever touches a document that is already there.
//! - `delete` of an absent id is not an error.
//! - ordered queries skip documents that lack the ordering field.
//! - `commit` applies a batch of writes all-or-nothing.

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

pub mod memory;
pub mod projects;

pub use memory::MemoryStore;
pub use projects::ProjectStore;

/// Field map of a single document.
pub type Fields = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("snapshot encoding failed: {0}")]
    Encoding(String),
    #[error("failed to gather entropy for a document id: {0}")]
    Entropy(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Wire shape: `{"id": <id>, ...fields}`. A stored `id` field never shadows the key.
    pub fn to_json(&self) -> Value {
        let mut out = Map::with_capacity(self.fields.len() + 1);
        out.insert("id".into(), Value::String(self.id.clone()));
        for (k, v) in self.fields.iter() {
            if k != "id" {
                out.insert(k.clone(), v.clone());
            }
        }
        Value::Object(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self { Self::default() }

    pub fn order_by(mut self, field: impl Into<String>, dir: Direction) -> Self {
        self.order_by = Some((field.into(), dir));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// One write inside an atomic batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Set { id: String, fields: Fields },
    Merge { id: String, fields: Fields },
    Delete { id: String },
}

pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;
    /// Insert under a freshly generated id and return it.
    fn add(&self, collection: &str, fields: Fields) -> StoreResult<String>;
    /// Replace the whole document.
    fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;
    /// Deep-merge into the document, creating it when absent.
    fn merge(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;
    /// Deep-merge into an existing document; `Ok(false)` and no write when it is absent.
    /// The check and the write are one atomic step.
    fn update_existing(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<bool>;
    fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
    fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;
    fn commit(&self, collection: &str, ops: Vec<WriteOp>) -> StoreResult<()>;
    /// Push any buffered state to durable storage.
    fn flush(&self) -> StoreResult<()> { Ok(()) }
}

/// Process-wide store handle, cloned into every request.
#[derive(Clone)]
pub struct SharedStore(pub Arc<dyn DocumentStore>);

impl SharedStore {
    pub fn new(store: impl DocumentStore + 'static) -> Self { Self(Arc::new(store)) }

    pub fn in_memory() -> Self { Self::new(MemoryStore::in_memory()) }

    pub fn projects(&self) -> ProjectStore { ProjectStore::new(self.clone()) }
}

impl std::ops::Deref for SharedStore {
    type Target = dyn DocumentStore;
    fn deref(&self) -> &Self::Target { self.0.as_ref() }
}

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 20;

/// 20 random characters from `[A-Za-z0-9]`.
pub fn auto_id() -> StoreResult<String> {
    let mut out = String::with_capacity(ID_LEN);
    let mut buf = [0u8; 32];
    while out.len() < ID_LEN {
        getrandom::getrandom(&mut buf).map_err(|e| StoreError::Entropy(e.to_string()))?;
        // 248 = 4 * 62; rejecting above it keeps the draw uniform
        for b in buf.iter().filter(|b| **b < 248) {
            if out.len() == ID_LEN { break; }
            out.push(ID_ALPHABET[(*b as usize) % ID_ALPHABET.len()] as char);
        }
    }
    Ok(out)
}

/// Deep merge: nested objects merge key by key, any other value replaces.
pub fn merge_fields(target: &mut Fields, patch: Fields) {
    for (k, v) in patch {
        match v {
            Value::Object(incoming) => match target.get_mut(&k) {
                Some(Value::Object(existing)) => merge_fields(existing, incoming),
                _ => { target.insert(k, Value::Object(incoming)); }
            },
            other => { target.insert(k, other); }
        }
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values used by ordered queries: values of different
/// types order by type, same-typed scalars by value.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let o = compare_values(l, r);
                if o != Ordering::Equal { return o; }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Fields { v.as_object().cloned().unwrap() }

    #[test]
    fn auto_id_shape() {
        let a = auto_id().unwrap();
        let b = auto_id().unwrap();
        assert_eq!(a.len(), 20);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn merge_is_deep_for_objects_only() {
        let mut t = obj(json!({"name": "a", "meta": {"x": 1, "y": 2}, "tags": [1, 2]}));
        merge_fields(&mut t, obj(json!({"meta": {"y": 3}, "tags": [9], "extra": null})));
        assert_eq!(Value::Object(t), json!({"name": "a", "meta": {"x": 1, "y": 3}, "tags": [9], "extra": null}));
    }

    #[test]
    fn document_json_keeps_key_as_id() {
        let d = Document { id: "k".into(), fields: obj(json!({"id": "shadow", "name": "n"})) };
        assert_eq!(d.to_json(), json!({"id": "k", "name": "n"}));
    }

    #[test]
    fn value_ordering() {
        assert_eq!(compare_values(&json!("2026-01-02"), &json!("2026-01-01")), Ordering::Greater);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(null), &json!("a")), Ordering::Less);
    }
}
