use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Partition key attribute name.
pub const PK: &str = "PK";
/// Sort key attribute name.
pub const SK: &str = "SK";

/// A stored record: a flat document keyed by `PK` and `SK`.
pub type Item = serde_json::Map<String, Value>;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional write did not apply (item already present, or missing).
    #[error("conditional check failed during {op}")]
    ConditionFailed { op: &'static str },

    #[error("invalid pagination cursor")]
    BadCursor,

    #[error("{op} failed: {message}")]
    Backend { op: &'static str, message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One page of query or scan results.
#[derive(Debug, Default)]
pub struct Page {
    pub items: Vec<Item>,
    /// Opaque cursor for the next page, absent on the last one.
    pub next_cursor: Option<String>,
}

/// A two-part-key document store.
///
/// The contract matches what a single DynamoDB table offers: point reads
/// and writes by exact (PK, SK), range queries by PK and SK prefix, and a
/// full-table scan. There are no multi-item transactions; callers sequence
/// their writes instead.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write an item unconditionally, replacing any existing one.
    async fn put(&self, item: Item) -> StoreResult<()>;

    /// Write an item only if no item exists at its key.
    /// Fails with `ConditionFailed` when one does.
    async fn put_new(&self, item: Item) -> StoreResult<()>;

    async fn get(&self, pk: &str, sk: &str) -> StoreResult<Option<Item>>;

    /// All items whose sort key starts with `sk_prefix`, draining every
    /// backend page, in sort-key order.
    async fn query_prefix(&self, pk: &str, sk_prefix: &str) -> StoreResult<Vec<Item>>;

    /// One page of items whose sort key starts with `sk_prefix`.
    async fn query_page(
        &self,
        pk: &str,
        sk_prefix: &str,
        limit: i32,
        cursor: Option<&str>,
    ) -> StoreResult<Page>;

    /// One page of the whole table, every partition included.
    async fn scan_page(&self, limit: i32, cursor: Option<&str>) -> StoreResult<Page>;

    /// Set the given attributes on an existing item.
    /// Fails with `ConditionFailed` when the item is absent.
    async fn update(&self, pk: &str, sk: &str, changes: Item) -> StoreResult<()>;

    async fn delete(&self, pk: &str, sk: &str) -> StoreResult<()>;
}

/// Serialize a record into a store item, attaching its keys.
pub fn to_item<T: Serialize>(record: &T, pk: &str, sk: &str) -> Result<Item, serde_json::Error> {
    let mut item = match serde_json::to_value(record)? {
        Value::Object(map) => map,
        other => {
            let mut map = Item::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    item.insert(PK.to_string(), Value::String(pk.to_string()));
    item.insert(SK.to_string(), Value::String(sk.to_string()));
    Ok(item)
}

/// Deserialize a record out of a store item, ignoring its keys.
pub fn from_item<T: DeserializeOwned>(item: &Item) -> Result<T, serde_json::Error> {
    let mut map = item.clone();
    map.remove(PK);
    map.remove(SK);
    serde_json::from_value(Value::Object(map))
}

/// The sort key of an item, when present.
pub fn item_sort_key(item: &Item) -> Option<&str> {
    item.get(SK).and_then(Value::as_str)
}

/// The partition key of an item, when present.
pub fn item_partition_key(item: &Item) -> Option<&str> {
    item.get(PK).and_then(Value::as_str)
}

/// Encode a continuation position as an opaque cursor.
pub fn encode_cursor(pk: &str, sk: &str) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::json!([pk, sk]).to_string())
}

/// Decode a cursor produced by `encode_cursor`.
pub fn decode_cursor(cursor: &str) -> StoreResult<(String, String)> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| StoreError::BadCursor)?;
    let (pk, sk): (String, String) =
        serde_json::from_slice(&bytes).map_err(|_| StoreError::BadCursor)?;
    Ok((pk, sk))
}
