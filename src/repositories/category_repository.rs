use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::models::category::CategoryRecord;
use crate::repositories::kv_store::{CATEGORIES_KEY, KeyValueStore, RepositoryError};

/// The shared category collection as loaded from storage.
///
/// Entries that do not parse as a `CategoryRecord` are kept verbatim in
/// `unreadable` and written back on save, so one bad entry never costs
/// another user their categories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryCollection {
    pub records: Vec<CategoryRecord>,
    pub unreadable: Vec<Value>,
}

impl CategoryCollection {
    pub fn from_records(records: Vec<CategoryRecord>) -> Self {
        Self {
            records,
            unreadable: Vec::new(),
        }
    }

    /// Whether any entry, readable or not, has this id and belongs to `user_id`
    pub fn is_owned_by(&self, category_id: &str, user_id: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.id == category_id && r.is_owned_by(user_id))
            || self.unreadable.iter().any(|entry| {
                entry.get("id").and_then(Value::as_str) == Some(category_id)
                    && entry.get("userId").and_then(Value::as_str) == Some(user_id)
            })
    }

    /// Drop every entry with this id
    pub fn remove(&mut self, category_id: &str) -> usize {
        let before = self.records.len() + self.unreadable.len();
        self.records.retain(|r| r.id != category_id);
        self.unreadable
            .retain(|entry| entry.get("id").and_then(Value::as_str) != Some(category_id));
        before - self.records.len() - self.unreadable.len()
    }
}

/// Trait defining category repository operations.
///
/// The whole collection is read and written at once; every user's records
/// share the same key.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Load every stored category entry (empty when nothing is stored yet)
    async fn load_all(&self) -> Result<CategoryCollection, RepositoryError>;

    /// Replace the stored collection
    async fn save_all(&self, collection: &CategoryCollection) -> Result<(), RepositoryError>;
}

/// Key-value implementation of CategoryRepository
pub struct KvCategoryRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KvCategoryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CategoryRepository for KvCategoryRepository {
    async fn load_all(&self) -> Result<CategoryCollection, RepositoryError> {
        let Some(raw) = self.store.get(CATEGORIES_KEY).await? else {
            return Ok(CategoryCollection::default());
        };

        // A stored JSON `null` counts as an empty collection
        let entries: Option<Vec<Value>> = serde_json::from_str(&raw)
            .map_err(|e| RepositoryError::Corrupt(format!("{}: {}", CATEGORIES_KEY, e)))?;

        let mut collection = CategoryCollection::default();
        for entry in entries.unwrap_or_default() {
            match serde_json::from_value::<CategoryRecord>(entry.clone()) {
                Ok(record) => collection.records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping unreadable category entry: {}", e);
                    collection.unreadable.push(entry);
                }
            }
        }

        Ok(collection)
    }

    async fn save_all(&self, collection: &CategoryCollection) -> Result<(), RepositoryError> {
        let mut entries = Vec::with_capacity(collection.records.len() + collection.unreadable.len());
        for record in &collection.records {
            entries.push(
                serde_json::to_value(record)
                    .map_err(|e| RepositoryError::WriteFailed(e.to_string()))?,
            );
        }
        entries.extend(collection.unreadable.iter().cloned());

        let raw = serde_json::to_string(&entries)
            .map_err(|e| RepositoryError::WriteFailed(e.to_string()))?;

        self.store.set(CATEGORIES_KEY, &raw).await?;
        Ok(())
    }
}
