use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;

use crate::locks::KeyedLocks;
use crate::repositories::kv_store::{CURRENT_IP_KEY, KeyValueStore, RepositoryError};

/// Source of the device's current IP fingerprint.
///
/// Implementations must return the same value for repeated calls within a
/// session.
#[async_trait]
pub trait IpAddressProvider: Send + Sync {
    async fn current_ip(&self) -> Result<String, RepositoryError>;
}

/// Provider that resolves a fingerprint once and caches it in the store.
///
/// No IP lookup service is queried; the first resolution produces a random
/// dotted-quad that stays fixed for the device from then on.
pub struct CachedIpProvider {
    store: Arc<dyn KeyValueStore>,
    locks: Arc<KeyedLocks>,
}

impl CachedIpProvider {
    pub fn new(store: Arc<dyn KeyValueStore>, locks: Arc<KeyedLocks>) -> Self {
        Self { store, locks }
    }

    async fn cached(&self) -> Result<Option<String>, RepositoryError> {
        let cached = self.store.get(CURRENT_IP_KEY).await?;
        Ok(cached.filter(|ip| !ip.trim().is_empty()))
    }

    fn simulated_ip() -> String {
        let mut rng = rand::thread_rng();
        format!(
            "{}.{}.{}.{}",
            rng.gen_range(0..255u8),
            rng.gen_range(0..255u8),
            rng.gen_range(0..255u8),
            rng.gen_range(0..255u8)
        )
    }
}

#[async_trait]
impl IpAddressProvider for CachedIpProvider {
    async fn current_ip(&self) -> Result<String, RepositoryError> {
        if let Some(ip) = self.cached().await? {
            return Ok(ip);
        }

        let _guard = self.locks.lock(CURRENT_IP_KEY).await;
        // Another caller may have resolved it while we waited
        if let Some(ip) = self.cached().await? {
            return Ok(ip);
        }

        let ip = Self::simulated_ip();
        self.store.set(CURRENT_IP_KEY, &ip).await?;
        tracing::info!("Resolved device IP fingerprint {}", ip);
        Ok(ip)
    }
}
