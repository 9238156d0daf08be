use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::locks::KeyedLocks;
use crate::models::category::{
    BUILT_IN_CATEGORIES, BuiltInCategory, Category, CategoryPatch, CategoryRecord, CategoryTarget,
    EffectiveCategories,
};
use crate::repositories::category_repository::{CategoryCollection, CategoryRepository};
use crate::repositories::kv_store::{CATEGORIES_KEY, RepositoryError};

/// Category service errors
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("User id is required")]
    NoUserId,

    #[error("Category not found")]
    NotFound,

    #[error("Not allowed to modify this category")]
    Forbidden,

    #[error("Category could not be saved: {0}")]
    SaveFailed(String),
}

impl From<RepositoryError> for CategoryError {
    fn from(err: RepositoryError) -> Self {
        CategoryError::SaveFailed(err.to_string())
    }
}

/// Trait defining category service operations
#[async_trait]
pub trait CategoryService: Send + Sync {
    /// Built-ins (with the user's overrides applied) and the user's own
    /// categories. Storage failures degrade to the plain built-in list.
    async fn get_effective_categories(&self, user_id: &str) -> EffectiveCategories;

    /// Create a custom category and return its id
    async fn add_category(&self, user_id: &str, data: CategoryPatch)
    -> Result<String, CategoryError>;

    /// Update a custom category, or the user's override of a built-in one
    async fn update_category(
        &self,
        category_id: &str,
        data: CategoryPatch,
        user_id: Option<&str>,
    ) -> Result<(), CategoryError>;

    /// Delete a stored category. Callers must refuse built-in ids beforehand.
    async fn delete_category(&self, category_id: &str) -> Result<(), CategoryError>;

    /// Whether `user_id` owns the stored entry `category_id`, including
    /// entries too damaged to list. Unlike the listing this read fails closed.
    async fn owns_category(&self, user_id: &str, category_id: &str)
    -> Result<bool, CategoryError>;
}

/// Find `id` in `categories`, falling back to the built-in "other" category
pub fn resolve_category_or_default(id: &str, categories: &[Category]) -> Category {
    categories
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .unwrap_or_else(|| BuiltInCategory::other().to_category())
}

/// Implementation of CategoryService
pub struct CategoryServiceImpl {
    category_repository: Arc<dyn CategoryRepository>,
    locks: Arc<KeyedLocks>,
}

impl CategoryServiceImpl {
    pub fn new(category_repository: Arc<dyn CategoryRepository>, locks: Arc<KeyedLocks>) -> Self {
        Self {
            category_repository,
            locks,
        }
    }

    /// Load the collection for a read-modify-write. A failed or corrupt read
    /// refuses the write so the stored collection is never clobbered.
    async fn load_for_write(&self) -> Result<CategoryCollection, CategoryError> {
        self.category_repository.load_all().await.map_err(|e| {
            tracing::warn!("Refusing category write, collection unreadable: {}", e);
            CategoryError::from(e)
        })
    }

    async fn save(&self, collection: &CategoryCollection) -> Result<(), CategoryError> {
        self.category_repository.save_all(collection).await.map_err(|e| {
            tracing::warn!("Failed to save categories: {}", e);
            CategoryError::from(e)
        })
    }

    /// Time-ordered UUID, regenerated in the unlikely case it is already taken
    fn new_category_id(records: &[CategoryRecord]) -> String {
        loop {
            let id = Uuid::now_v7().to_string();
            if !records.iter().any(|r| r.id == id) {
                return id;
            }
        }
    }
}

#[async_trait]
impl CategoryService for CategoryServiceImpl {
    async fn get_effective_categories(&self, user_id: &str) -> EffectiveCategories {
        let collection = match self.category_repository.load_all().await {
            Ok(collection) => collection,
            Err(e) => {
                tracing::warn!("Falling back to built-in categories: {}", e);
                return EffectiveCategories::built_ins_only();
            }
        };

        let (overrides, custom): (Vec<&CategoryRecord>, Vec<&CategoryRecord>) = collection
            .records
            .iter()
            .filter(|r| r.is_owned_by(user_id))
            .partition(|r| r.is_override);

        let builtins = BUILT_IN_CATEGORIES
            .iter()
            .map(|built_in| {
                match overrides.iter().find(|o| o.overrides(built_in.id)) {
                    Some(record) => built_in.with_override(record),
                    None => built_in.to_category(),
                }
            })
            .collect();

        let custom = custom
            .into_iter()
            .filter_map(CategoryRecord::to_custom_category)
            .collect();

        EffectiveCategories { builtins, custom }
    }

    async fn add_category(
        &self,
        user_id: &str,
        data: CategoryPatch,
    ) -> Result<String, CategoryError> {
        if user_id.is_empty() {
            return Err(CategoryError::NoUserId);
        }

        let _guard = self.locks.lock(CATEGORIES_KEY).await;
        let mut collection = self.load_for_write().await?;

        let id = Self::new_category_id(&collection.records);
        collection
            .records
            .push(CategoryRecord::new_custom(id.clone(), user_id, &data, Utc::now()));
        self.save(&collection).await?;

        tracing::info!("Added category {} for user {}", id, user_id);
        Ok(id)
    }

    async fn update_category(
        &self,
        category_id: &str,
        data: CategoryPatch,
        user_id: Option<&str>,
    ) -> Result<(), CategoryError> {
        let user_id = user_id
            .filter(|u| !u.is_empty())
            .ok_or(CategoryError::NoUserId)?;

        let _guard = self.locks.lock(CATEGORIES_KEY).await;
        let mut collection = self.load_for_write().await?;
        let records = &mut collection.records;
        let now = Utc::now();

        match CategoryTarget::resolve(category_id) {
            CategoryTarget::BuiltIn(built_in) => {
                let existing = records
                    .iter()
                    .position(|r| r.is_owned_by(user_id) && r.overrides(built_in.id));

                match existing {
                    Some(index) => records[index].update(&data, now),
                    None => {
                        tracing::info!("Creating override of {} for user {}", built_in.id, user_id);
                        records.push(CategoryRecord::new_override(built_in, user_id, &data, now));
                    }
                }
            }
            CategoryTarget::Stored(id) => {
                let record = records
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or(CategoryError::NotFound)?;

                if !record.is_owned_by(user_id) {
                    tracing::warn!("User {} tried to modify category {}", user_id, id);
                    return Err(CategoryError::Forbidden);
                }

                record.update(&data, now);
            }
        }

        self.save(&collection).await?;
        tracing::info!("Updated category {} for user {}", category_id, user_id);
        Ok(())
    }

    async fn delete_category(&self, category_id: &str) -> Result<(), CategoryError> {
        let _guard = self.locks.lock(CATEGORIES_KEY).await;
        let mut collection = self.load_for_write().await?;

        if collection.remove(category_id) == 0 {
            tracing::debug!("Category {} not stored, nothing to delete", category_id);
        }

        self.save(&collection).await?;
        tracing::info!("Deleted category {}", category_id);
        Ok(())
    }

    async fn owns_category(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> Result<bool, CategoryError> {
        if user_id.is_empty() {
            return Err(CategoryError::NoUserId);
        }

        let collection = self.category_repository.load_all().await.map_err(|e| {
            tracing::warn!("Could not check ownership of category {}: {}", category_id, e);
            CategoryError::from(e)
        })?;
        Ok(collection.is_owned_by(category_id, user_id))
    }
}
