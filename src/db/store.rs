use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;

/// A schemaless document as stored in a collection.
pub type Document = Map<String, Value>;

/// Equality filter on a single top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError>;

    /// Overwrites the whole document at `key`.
    async fn set(&self, collection: &str, key: &str, doc: Document) -> Result<(), StoreError>;

    /// Stores `doc` under a freshly generated key and returns that key.
    async fn add(&self, collection: &str, doc: Document) -> Result<String, StoreError>;

    async fn scan(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
    ) -> Result<Vec<Document>, StoreError>;
}

/// In-process store. Collections keep key order so scans are stable.
#[derive(Default, Clone)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, BTreeMap<String, Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: removes a document, returning whether it existed.
    /// No route deletes data.
    pub async fn delete(&self, collection: &str, key: &str) -> bool {
        let mut collections = self.collections.write().await;
        collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(key))
            .is_some()
    }

    /// Test helper: number of documents in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    async fn set(&self, collection: &str, key: &str, doc: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), doc);
        Ok(())
    }

    async fn add(&self, collection: &str, doc: Document) -> Result<String, StoreError> {
        let key = Uuid::new_v4().simple().to_string();
        self.set(collection, &key, doc).await?;
        Ok(key)
    }

    async fn scan(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .values()
            .filter(|doc| filter.as_ref().map_or(true, |f| f.matches(doc)))
            .cloned()
            .collect())
    }
}
