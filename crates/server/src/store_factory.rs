use std::sync::Arc;

use tracing::{info, warn};

use zoo_store::{DistributedLock, DownloadCounter, FileRepository, ModelDirectory, UserDirectory};
use zoo_store_memory::{
    MemoryDirectory, MemoryDistributedLock, MemoryDownloadCounter, MemoryFileRepository,
};
#[cfg(feature = "postgres")]
use zoo_store_postgres::{PostgresConfig, PostgresDistributedLock, PostgresStore};

use crate::config::{FixturesConfig, StoreConfig};
use crate::error::ServerError;

/// Everything the pipeline reads from and writes to, apart from blobs.
pub struct StoreBackends {
    pub files: Arc<dyn FileRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub models: Arc<dyn ModelDirectory>,
    pub downloads: Arc<dyn DownloadCounter>,
    pub lock: Arc<dyn DistributedLock>,
}

/// Create the store backends from the given configuration.
///
/// Fixtures are loaded into the memory directory; other backends own their
/// users and models and ignore them.
#[allow(clippy::unused_async)]
pub async fn create_store(
    config: &StoreConfig,
    fixtures: &FixturesConfig,
) -> Result<StoreBackends, ServerError> {
    match config.backend.as_str() {
        "memory" => {
            let directory = Arc::new(MemoryDirectory::new());
            for user in &fixtures.users {
                directory.insert_user(user.into());
            }
            for model in &fixtures.models {
                directory.insert_model(model.into());
            }
            info!(
                users = fixtures.users.len(),
                models = fixtures.models.len(),
                "memory directory seeded"
            );

            Ok(StoreBackends {
                files: Arc::new(MemoryFileRepository::new()),
                users: directory.clone(),
                models: directory,
                downloads: Arc::new(MemoryDownloadCounter::new()),
                lock: Arc::new(MemoryDistributedLock::new()),
            })
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            if !fixtures.users.is_empty() || !fixtures.models.is_empty() {
                warn!("fixtures are only loaded by the memory backend, ignoring");
            }
            let pg_config = postgres_config(config)?;
            let pool = zoo_store_postgres::connect(&pg_config).await?;
            let store = Arc::new(PostgresStore::new(pool.clone(), pg_config.clone()));
            info!(schema = %pg_config.schema, prefix = %pg_config.table_prefix, "postgres store connected");

            Ok(StoreBackends {
                files: store.clone(),
                users: store.clone(),
                models: store.clone(),
                downloads: store,
                lock: Arc::new(PostgresDistributedLock::new(pool, pg_config)),
            })
        }
        other => {
            if !fixtures.users.is_empty() {
                warn!(backend = %other, "fixtures configured for an unavailable backend");
            }
            Err(ServerError::Config(format!(
                "unknown store backend: {other} (is the feature enabled?)"
            )))
        }
    }
}

/// Connect to the configured database and run its migrations.
#[allow(clippy::unused_async)]
pub async fn migrate(config: &StoreConfig) -> Result<(), ServerError> {
    match config.backend.as_str() {
        "memory" => {
            info!("memory store has no migrations");
            Ok(())
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            let pg_config = postgres_config(config)?;
            // `connect` runs the migrations.
            let pool = zoo_store_postgres::connect(&pg_config).await?;
            pool.close().await;
            Ok(())
        }
        other => Err(ServerError::Config(format!(
            "unknown store backend: {other} (is the feature enabled?)"
        ))),
    }
}

#[cfg(feature = "postgres")]
fn postgres_config(config: &StoreConfig) -> Result<PostgresConfig, ServerError> {
    let url = config
        .url
        .clone()
        .ok_or_else(|| ServerError::Config("postgres backend requires [store] url".into()))?;
    let defaults = PostgresConfig::default();
    Ok(PostgresConfig {
        url,
        pool_size: config.pool_size.unwrap_or(defaults.pool_size),
        schema: config.schema.clone().unwrap_or(defaults.schema),
        table_prefix: config.table_prefix.clone().unwrap_or(defaults.table_prefix),
        ssl_mode: config.ssl_mode.clone(),
        ssl_root_cert: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_loads_fixtures() {
        let fixtures: FixturesConfig = toml::from_str(
            r#"
            [[users]]
            id = "u-1"
            username = "ada"

            [[models]]
            id = "m-1"
            user_id = "u-1"
            slug = "mnist"
            "#,
        )
        .unwrap();

        let backends = create_store(&StoreConfig::default(), &fixtures)
            .await
            .unwrap();
        let user = backends.users.by_username("ada").await.unwrap().unwrap();
        assert_eq!(user.id, "u-1");
        let model = backends
            .models
            .by_user_id_slug("u-1", "mnist")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(model.keep, 10);
    }

    #[tokio::test]
    async fn unknown_backend_is_a_config_error() {
        let config = StoreConfig {
            backend: "cassandra".into(),
            ..StoreConfig::default()
        };
        let result = create_store(&config, &FixturesConfig::default()).await;
        assert!(matches!(result, Err(ServerError::Config(msg)) if msg.contains("cassandra")));
    }
}
