use async_trait::async_trait;
use std::sync::Arc;

use crate::models::ip_security::IpSecurityRecord;
use crate::repositories::kv_store::{KeyValueStore, RepositoryError, ip_security_key};

/// Trait defining IP security repository operations
#[async_trait]
pub trait IpSecurityRepository: Send + Sync {
    /// Find a user's IP security record
    async fn find_by_user(&self, user_id: &str)
    -> Result<Option<IpSecurityRecord>, RepositoryError>;

    /// Create or replace a user's IP security record
    async fn save(&self, user_id: &str, record: &IpSecurityRecord) -> Result<(), RepositoryError>;
}

/// Key-value implementation of IpSecurityRepository
pub struct KvIpSecurityRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KvIpSecurityRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IpSecurityRepository for KvIpSecurityRepository {
    async fn find_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<IpSecurityRecord>, RepositoryError> {
        let key = ip_security_key(user_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        serde_json::from_str::<Option<IpSecurityRecord>>(&raw)
            .map_err(|e| RepositoryError::Corrupt(format!("{}: {}", key, e)))
    }

    async fn save(&self, user_id: &str, record: &IpSecurityRecord) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(record)
            .map_err(|e| RepositoryError::WriteFailed(e.to_string()))?;

        self.store.set(&ip_security_key(user_id), &raw).await?;
        Ok(())
    }
}
