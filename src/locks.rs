//! Per-key async locks.
//!
//! The key-value store only makes single `get`/`set` calls atomic, so every
//! read-modify-write cycle against one key takes that key's lock first.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily created async mutex per logical key
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard guard is released before awaiting
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock("categories").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("categories").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("ipSecurity_a").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.lock("ipSecurity_b"))
            .await
            .expect("other key should not wait");
    }
}
