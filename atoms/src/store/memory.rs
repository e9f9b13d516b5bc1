use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use super::traits::{
    decode_cursor, encode_cursor, item_partition_key, item_sort_key, Item, Page, RecordStore,
    StoreError, StoreResult,
};

/// In-memory record store for local development and tests.
///
/// Items are kept in key order like the real table, so prefix queries and
/// pagination cursors behave the same way. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    items: RwLock<BTreeMap<(String, String), Item>>,
    failing_deletes: Mutex<HashSet<(String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items, all partitions included.
    pub fn len(&self) -> usize {
        self.inner.items.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next delete of (pk, sk) fail once.
    /// Test hook for exercising the best-effort cleanup path.
    pub fn fail_next_delete(&self, pk: &str, sk: &str) {
        self.inner
            .failing_deletes
            .lock()
            .unwrap()
            .insert((pk.to_string(), sk.to_string()));
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn put(&self, item: Item) -> StoreResult<()> {
        let key = item_key(&item)?;
        self.inner.items.write().unwrap().insert(key, item);
        Ok(())
    }

    async fn put_new(&self, item: Item) -> StoreResult<()> {
        let key = item_key(&item)?;
        let mut items = self.inner.items.write().unwrap();
        if items.contains_key(&key) {
            return Err(StoreError::ConditionFailed { op: "put_item" });
        }
        items.insert(key, item);
        Ok(())
    }

    async fn get(&self, pk: &str, sk: &str) -> StoreResult<Option<Item>> {
        let items = self.inner.items.read().unwrap();
        Ok(items.get(&(pk.to_string(), sk.to_string())).cloned())
    }

    async fn query_prefix(&self, pk: &str, sk_prefix: &str) -> StoreResult<Vec<Item>> {
        let items = self.inner.items.read().unwrap();
        Ok(items
            .iter()
            .filter(|((ipk, isk), _)| ipk == pk && isk.starts_with(sk_prefix))
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn query_page(
        &self,
        pk: &str,
        sk_prefix: &str,
        limit: i32,
        cursor: Option<&str>,
    ) -> StoreResult<Page> {
        let after = cursor.map(decode_cursor).transpose()?;
        let items = self.inner.items.read().unwrap();
        Ok(paginate(
            items
                .iter()
                .filter(|((ipk, isk), _)| ipk == pk && isk.starts_with(sk_prefix)),
            limit,
            after,
        ))
    }

    async fn scan_page(&self, limit: i32, cursor: Option<&str>) -> StoreResult<Page> {
        let after = cursor.map(decode_cursor).transpose()?;
        let items = self.inner.items.read().unwrap();
        Ok(paginate(items.iter(), limit, after))
    }

    async fn update(&self, pk: &str, sk: &str, changes: Item) -> StoreResult<()> {
        let mut items = self.inner.items.write().unwrap();
        let item = items
            .get_mut(&(pk.to_string(), sk.to_string()))
            .ok_or(StoreError::ConditionFailed { op: "update_item" })?;
        for (field, value) in changes {
            item.insert(field, value);
        }
        Ok(())
    }

    async fn delete(&self, pk: &str, sk: &str) -> StoreResult<()> {
        let key = (pk.to_string(), sk.to_string());
        if self.inner.failing_deletes.lock().unwrap().remove(&key) {
            return Err(StoreError::Backend {
                op: "delete_item",
                message: "injected delete failure".to_string(),
            });
        }
        self.inner.items.write().unwrap().remove(&key);
        Ok(())
    }
}

fn item_key(item: &Item) -> StoreResult<(String, String)> {
    let pk = item_partition_key(item).ok_or_else(|| missing_key("PK"))?;
    let sk = item_sort_key(item).ok_or_else(|| missing_key("SK"))?;
    Ok((pk.to_string(), sk.to_string()))
}

fn missing_key(attribute: &str) -> StoreError {
    StoreError::Backend {
        op: "put_item",
        message: format!("item missing {} attribute", attribute),
    }
}

fn paginate<'a>(
    matching: impl Iterator<Item = (&'a (String, String), &'a Item)>,
    limit: i32,
    after: Option<(String, String)>,
) -> Page {
    let limit = limit.max(1) as usize;
    let mut page = Page::default();
    let mut last_key: Option<&(String, String)> = None;

    for (key, item) in matching {
        if let Some(after) = &after {
            if key <= after {
                continue;
            }
        }
        if page.items.len() == limit {
            page.next_cursor = last_key.map(|(pk, sk)| encode_cursor(pk, sk));
            return page;
        }
        last_key = Some(key);
        page.items.push(item.clone());
    }

    page
}
