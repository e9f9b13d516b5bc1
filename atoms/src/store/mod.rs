//! Record store backends.
//!
//! Everything the engine persists goes through the `RecordStore` trait:
//! flat documents addressed by a partition key (`PK`) and sort key (`SK`),
//! with range queries by sort-key prefix. `DynamoStore` is the production
//! backend; `MemoryStore` backs local development and tests.

mod dynamo;
mod memory;
mod traits;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;
pub use traits::{
    decode_cursor, encode_cursor, from_item, item_partition_key, item_sort_key, to_item, Item,
    Page, RecordStore, StoreError, StoreResult, PK, SK,
};
