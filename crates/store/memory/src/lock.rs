use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use uuid::Uuid;

use zoo_store::error::StoreError;
use zoo_store::lock::{DistributedLock, LockGuard};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy)]
struct Holder {
    owner: Uuid,
    deadline: Instant,
}

impl Holder {
    fn live(&self) -> bool {
        Instant::now() < self.deadline
    }
}

/// In-process [`DistributedLock`] keyed by lock name.
///
/// An expired holder is replaced in place by the next acquirer, so stale
/// entries never block a slot past their TTL.
#[derive(Debug, Clone, Default)]
pub struct MemoryDistributedLock {
    holders: Arc<DashMap<String, Holder>>,
}

impl MemoryDistributedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of names currently held by a live owner.
    pub fn held_count(&self) -> usize {
        self.holders.iter().filter(|h| h.value().live()).count()
    }
}

#[async_trait]
impl DistributedLock for MemoryDistributedLock {
    async fn try_acquire(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<Option<Box<dyn LockGuard>>, StoreError> {
        let holder = Holder {
            owner: Uuid::new_v4(),
            deadline: Instant::now() + ttl,
        };

        match self.holders.entry(name.to_owned()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().live() {
                    return Ok(None);
                }
                occupied.insert(holder);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(holder);
            }
        }

        Ok(Some(Box::new(MemoryLockGuard {
            holders: Arc::clone(&self.holders),
            name: name.to_owned(),
            owner: holder.owner,
        })))
    }

    async fn acquire(
        &self,
        name: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Box<dyn LockGuard>, StoreError> {
        let give_up_at = Instant::now() + timeout;
        loop {
            if let Some(guard) = self.try_acquire(name, ttl).await? {
                return Ok(guard);
            }
            if Instant::now() >= give_up_at {
                return Err(StoreError::Timeout(timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Guard returned by [`MemoryDistributedLock`].
#[derive(Debug)]
pub struct MemoryLockGuard {
    holders: Arc<DashMap<String, Holder>>,
    name: String,
    owner: Uuid,
}

#[async_trait]
impl LockGuard for MemoryLockGuard {
    async fn extend(&self, duration: Duration) -> Result<(), StoreError> {
        match self.holders.get_mut(&self.name) {
            Some(mut holder) if holder.owner == self.owner && holder.live() => {
                holder.deadline = Instant::now() + duration;
                Ok(())
            }
            _ => Err(StoreError::LockExpired(self.name.clone())),
        }
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        self.holders
            .remove_if(&self.name, |_, holder| holder.owner == self.owner);
        Ok(())
    }

    async fn is_held(&self) -> Result<bool, StoreError> {
        Ok(self
            .holders
            .get(&self.name)
            .is_some_and(|holder| holder.owner == self.owner && holder.live()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use zoo_store::testing::run_lock_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let lock = MemoryDistributedLock::new();
        run_lock_conformance_tests(&lock)
            .await
            .expect("lock conformance tests should pass");
    }

    #[tokio::test(start_paused = true)]
    async fn expired_holder_is_replaced() {
        let lock = MemoryDistributedLock::new();
        let stale = lock
            .try_acquire("slot:m-1:w.bin", Duration::from_secs(2))
            .await
            .unwrap()
            .expect("should acquire");

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(!stale.is_held().await.unwrap());
        assert!(matches!(
            stale.extend(Duration::from_secs(5)).await,
            Err(StoreError::LockExpired(_))
        ));

        let fresh = lock
            .try_acquire("slot:m-1:w.bin", Duration::from_secs(10))
            .await
            .unwrap()
            .expect("should acquire after expiry");

        // Releasing the stale guard must not drop the new holder.
        stale.release().await.unwrap();
        assert!(fresh.is_held().await.unwrap());
        assert_eq!(lock.held_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_for_release() {
        let lock = MemoryDistributedLock::new();
        let first = lock
            .try_acquire("slot:m-1:w.bin", Duration::from_secs(60))
            .await
            .unwrap()
            .expect("should acquire");

        let waiter = {
            let lock = lock.clone();
            tokio::spawn(async move {
                lock.acquire(
                    "slot:m-1:w.bin",
                    Duration::from_secs(60),
                    Duration::from_secs(10),
                )
                .await
            })
        };

        tokio::time::advance(Duration::from_secs(1)).await;
        first.release().await.unwrap();

        let second = waiter.await.unwrap().expect("waiter should acquire");
        assert!(second.is_held().await.unwrap());
    }

    #[tokio::test]
    async fn distinct_slots_do_not_contend() {
        let lock = MemoryDistributedLock::new();
        let a = lock
            .try_acquire("slot:m-1:a.bin", Duration::from_secs(10))
            .await
            .unwrap();
        let b = lock
            .try_acquire("slot:m-1:b.bin", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(a.is_some() && b.is_some());
    }

    #[tokio::test]
    async fn critical_sections_do_not_overlap() {
        let lock = Arc::new(MemoryDistributedLock::new());
        let inside = Arc::new(AtomicU32::new(0));
        let entered = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = Arc::clone(&lock);
            let inside = Arc::clone(&inside);
            let entered = Arc::clone(&entered);
            handles.push(tokio::spawn(async move {
                let guard = lock
                    .acquire(
                        "slot:m-1:shared.bin",
                        Duration::from_secs(5),
                        Duration::from_secs(10),
                    )
                    .await
                    .expect("should eventually acquire");
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
                entered.fetch_add(1, Ordering::SeqCst);
                guard.release().await.expect("release should succeed");
            }));
        }
        for h in handles {
            h.await.expect("task should not panic");
        }
        assert_eq!(entered.load(Ordering::SeqCst), 8);
    }
}
