use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::time::Instant;
use tracing::debug;

use zoo_store::error::StoreError;
use zoo_store::lock::{DistributedLock, LockGuard};

use crate::config::PostgresConfig;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Row-based [`DistributedLock`] in the `{prefix}locks` table.
///
/// Acquisition upserts the row only when it is absent or expired, so a
/// crashed holder blocks a slot for at most its TTL.
pub struct PostgresDistributedLock {
    pool: PgPool,
    config: Arc<PostgresConfig>,
}

impl PostgresDistributedLock {
    /// Wrap a pool opened with [`crate::connect`].
    pub fn new(pool: PgPool, config: PostgresConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl DistributedLock for PostgresDistributedLock {
    async fn try_acquire(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<Option<Box<dyn LockGuard>>, StoreError> {
        let table = self.config.locks_table();
        let owner = uuid::Uuid::new_v4().to_string();
        let expires_at = chrono::Utc::now() + ttl;

        let query = format!(
            "INSERT INTO {table} (name, owner, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO UPDATE SET owner = EXCLUDED.owner, expires_at = EXCLUDED.expires_at \
             WHERE {table}.expires_at <= NOW()"
        );
        let result = sqlx::query(&query)
            .bind(name)
            .bind(&owner)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        debug!(lock = %name, "acquired lock");
        Ok(Some(Box::new(PostgresLockGuard {
            pool: self.pool.clone(),
            config: Arc::clone(&self.config),
            name: name.to_owned(),
            owner,
        })))
    }

    async fn acquire(
        &self,
        name: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Box<dyn LockGuard>, StoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(guard) = self.try_acquire(name, ttl).await? {
                return Ok(guard);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(StoreError::Timeout(timeout));
            }
            tokio::time::sleep(LOCK_POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

/// Guard for a row in the locks table.
pub struct PostgresLockGuard {
    pool: PgPool,
    config: Arc<PostgresConfig>,
    name: String,
    owner: String,
}

#[async_trait]
impl LockGuard for PostgresLockGuard {
    async fn extend(&self, duration: Duration) -> Result<(), StoreError> {
        let table = self.config.locks_table();
        let query = format!(
            "UPDATE {table} SET expires_at = $1 \
             WHERE name = $2 AND owner = $3 AND expires_at > NOW()"
        );
        let result = sqlx::query(&query)
            .bind(chrono::Utc::now() + duration)
            .bind(&self.name)
            .bind(&self.owner)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::LockExpired(self.name.clone()));
        }
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        let table = self.config.locks_table();
        let query = format!("DELETE FROM {table} WHERE name = $1 AND owner = $2");
        sqlx::query(&query)
            .bind(&self.name)
            .bind(&self.owner)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn is_held(&self) -> Result<bool, StoreError> {
        let table = self.config.locks_table();
        let query = format!(
            "SELECT 1 FROM {table} WHERE name = $1 AND owner = $2 AND expires_at > NOW()"
        );
        let row: Option<(i32,)> = sqlx::query_as(&query)
            .bind(&self.name)
            .bind(&self.owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.is_some())
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn lock_conformance() {
        let config = PostgresConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/zoo_test".to_string()),
            table_prefix: format!("test_{}_", uuid::Uuid::new_v4().simple()),
            ..PostgresConfig::default()
        };
        let pool = crate::connect(&config)
            .await
            .expect("pool creation should succeed");
        let lock = PostgresDistributedLock::new(pool, config);
        zoo_store::testing::run_lock_conformance_tests(&lock)
            .await
            .expect("lock conformance tests should pass");
    }
}
