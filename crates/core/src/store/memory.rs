use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{ContentStore, StoreResult};
use crate::document::id::{Collection, Partition};
use crate::document::model::StoredDocument;

type Key = (Partition, Collection, String);

/// In-process store. Publish runs under the write lock, so readers see
/// either the old or the new live partition, never a mix.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    docs: RwLock<HashMap<Key, StoredDocument>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(partition: Partition, collection: Collection, id: &str) -> Key {
    (partition, collection, id.to_string())
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn read(
        &self,
        partition: Partition,
        collection: Collection,
        id: &str,
    ) -> StoreResult<Option<StoredDocument>> {
        let docs = self.docs.read().await;
        Ok(docs.get(&key(partition, collection, id)).cloned())
    }

    async fn insert(
        &self,
        partition: Partition,
        collection: Collection,
        id: &str,
        body: Map<String, Value>,
    ) -> StoreResult<Option<StoredDocument>> {
        let mut docs = self.docs.write().await;
        let key = key(partition, collection, id);
        if docs.contains_key(&key) {
            return Ok(None);
        }
        let now = Utc::now();
        let doc = StoredDocument {
            id: id.to_string(),
            body,
            created_at: now,
            updated_at: now,
        };
        docs.insert(key, doc.clone());
        Ok(Some(doc))
    }

    async fn write(
        &self,
        partition: Partition,
        collection: Collection,
        id: &str,
        body: Map<String, Value>,
    ) -> StoreResult<StoredDocument> {
        let mut docs = self.docs.write().await;
        let key = key(partition, collection, id);
        let now = Utc::now();
        let created_at = docs.get(&key).map_or(now, |existing| existing.created_at);
        let doc = StoredDocument {
            id: id.to_string(),
            body,
            created_at,
            updated_at: now,
        };
        docs.insert(key, doc.clone());
        Ok(doc)
    }

    async fn delete(&self, partition: Partition, collection: Collection, id: &str) -> StoreResult<bool> {
        let mut docs = self.docs.write().await;
        Ok(docs.remove(&key(partition, collection, id)).is_some())
    }

    async fn list(&self, partition: Partition, collection: Collection) -> StoreResult<Vec<StoredDocument>> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|((p, c, _), _)| *p == partition && *c == collection)
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn publish(&self, collections: &[Collection]) -> StoreResult<DateTime<Utc>> {
        let mut docs = self.docs.write().await;
        let now = Utc::now();

        docs.retain(|(p, c, _), _| !(*p == Partition::Live && collections.contains(c)));

        let promoted: Vec<(Key, StoredDocument)> = docs
            .iter()
            .filter(|((p, c, _), _)| *p == Partition::Draft && collections.contains(c))
            .map(|((_, c, id), doc)| ((Partition::Live, *c, id.clone()), doc.clone()))
            .collect();
        docs.extend(promoted);

        Ok(now)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
