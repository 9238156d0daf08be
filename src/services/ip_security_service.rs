use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::locks::KeyedLocks;
use crate::models::ip_security::{IpCheckOutcome, IpSecurityRecord};
use crate::repositories::ip_security_repository::IpSecurityRepository;
use crate::repositories::kv_store::{RepositoryError, ip_security_key};
use crate::services::ip_provider::IpAddressProvider;

/// IP security service errors.
///
/// Unlike category browsing, nothing here fails open: a lost security
/// signal has to reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum IpSecurityError {
    #[error("User id is required")]
    NoUserId,

    #[error("No IP security record for this user")]
    NotFound,

    #[error("IP security data could not be read: {0}")]
    PersistenceReadFailed(String),

    #[error("IP security data could not be saved: {0}")]
    SaveFailed(String),
}

impl From<RepositoryError> for IpSecurityError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ReadFailed(_) | RepositoryError::Corrupt(_) => {
                IpSecurityError::PersistenceReadFailed(err.to_string())
            }
            RepositoryError::WriteFailed(_) => IpSecurityError::SaveFailed(err.to_string()),
        }
    }
}

/// Trait defining IP security service operations
#[async_trait]
pub trait IpSecurityService: Send + Sync {
    /// Compare the current IP with the user's known IPs and record the login
    async fn check_ip(&self, user_id: &str) -> Result<IpCheckOutcome, IpSecurityError>;

    /// The user's IP security record, `None` before the first check
    async fn get_history(&self, user_id: &str)
    -> Result<Option<IpSecurityRecord>, IpSecurityError>;

    /// Trust `new_ip` for the user
    async fn confirm_ip(&self, user_id: &str, new_ip: &str) -> Result<(), IpSecurityError>;
}

/// Implementation of IpSecurityService
pub struct IpSecurityServiceImpl {
    ip_security_repository: Arc<dyn IpSecurityRepository>,
    ip_provider: Arc<dyn IpAddressProvider>,
    locks: Arc<KeyedLocks>,
}

impl IpSecurityServiceImpl {
    pub fn new(
        ip_security_repository: Arc<dyn IpSecurityRepository>,
        ip_provider: Arc<dyn IpAddressProvider>,
        locks: Arc<KeyedLocks>,
    ) -> Self {
        Self {
            ip_security_repository,
            ip_provider,
            locks,
        }
    }

    async fn save(&self, user_id: &str, record: &IpSecurityRecord) -> Result<(), IpSecurityError> {
        self.ip_security_repository
            .save(user_id, record)
            .await
            .map_err(|e| {
                tracing::error!("Failed to save IP security data for user {}: {}", user_id, e);
                IpSecurityError::from(e)
            })
    }
}

#[async_trait]
impl IpSecurityService for IpSecurityServiceImpl {
    async fn check_ip(&self, user_id: &str) -> Result<IpCheckOutcome, IpSecurityError> {
        if user_id.is_empty() {
            return Err(IpSecurityError::NoUserId);
        }

        let current_ip = self.ip_provider.current_ip().await?;

        let _guard = self.locks.lock(&ip_security_key(user_id)).await;
        let now = Utc::now();

        let Some(mut record) = self.ip_security_repository.find_by_user(user_id).await? else {
            self.save(user_id, &IpSecurityRecord::register(&current_ip, now))
                .await?;
            tracing::info!("Registered IP {} for user {}", current_ip, user_id);
            return Ok(IpCheckOutcome::unchanged());
        };

        if record.is_known_ip(&current_ip) {
            record.touch(now);
            self.save(user_id, &record).await?;
            return Ok(IpCheckOutcome::unchanged());
        }

        let change = record.record_change(&current_ip, now);
        self.save(user_id, &record).await?;
        tracing::warn!(
            "IP change detected for user {}: {} -> {}",
            user_id,
            change.old_ip,
            change.new_ip
        );

        Ok(IpCheckOutcome::changed(&change))
    }

    async fn get_history(
        &self,
        user_id: &str,
    ) -> Result<Option<IpSecurityRecord>, IpSecurityError> {
        Ok(self.ip_security_repository.find_by_user(user_id).await?)
    }

    async fn confirm_ip(&self, user_id: &str, new_ip: &str) -> Result<(), IpSecurityError> {
        let _guard = self.locks.lock(&ip_security_key(user_id)).await;

        let mut record = self
            .ip_security_repository
            .find_by_user(user_id)
            .await?
            .ok_or(IpSecurityError::NotFound)?;

        record.trust(new_ip);
        self.save(user_id, &record).await?;

        tracing::info!("User {} trusted IP {}", user_id, new_ip);
        Ok(())
    }
}
