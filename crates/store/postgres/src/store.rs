use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use zoo_core::{DownloadCounts, File, FileStatus, HourlyDownloads, Metadata, Model, Slot, User};
use zoo_store::directory::{ModelDirectory, UserDirectory};
use zoo_store::downloads::DownloadCounter;
use zoo_store::error::StoreError;
use zoo_store::repository::FileRepository;

use crate::config::PostgresConfig;

const FILE_COLUMNS: &str = "id, user_id, model_id, filename, framework, framework_version, \
                            client_name, size, metadata, status, created_time";

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn file_from_row(row: &PgRow) -> Result<File, StoreError> {
    let size: i64 = row.try_get("size").map_err(backend)?;
    let status: String = row.try_get("status").map_err(backend)?;
    let Json(metadata): Json<Metadata> = row.try_get("metadata").map_err(backend)?;

    Ok(File {
        id: row.try_get("id").map_err(backend)?,
        user_id: row.try_get("user_id").map_err(backend)?,
        model_id: row.try_get("model_id").map_err(backend)?,
        filename: row.try_get("filename").map_err(backend)?,
        framework: row.try_get("framework").map_err(backend)?,
        framework_version: row.try_get("framework_version").map_err(backend)?,
        client_name: row.try_get("client_name").map_err(backend)?,
        size: u64::try_from(size)
            .map_err(|_| StoreError::Serialization(format!("negative size {size}")))?,
        metadata,
        status: FileStatus::parse(&status)
            .ok_or_else(|| StoreError::Serialization(format!("unknown status {status}")))?,
        created_time: row.try_get("created_time").map_err(backend)?,
        downloads: None,
    })
}

fn model_from_row(row: &PgRow) -> Result<Model, StoreError> {
    let keep: i32 = row.try_get("keep").map_err(backend)?;
    Ok(Model {
        id: row.try_get("id").map_err(backend)?,
        user_id: row.try_get("user_id").map_err(backend)?,
        slug: row.try_get("slug").map_err(backend)?,
        name: row.try_get("name").map_err(backend)?,
        description: row.try_get("description").map_err(backend)?,
        visibility: row.try_get("visibility").map_err(backend)?,
        keep: u32::try_from(keep)
            .map_err(|_| StoreError::Serialization(format!("negative keep {keep}")))?,
        created_time: row.try_get("created_time").map_err(backend)?,
        downloads: None,
    })
}

/// PostgreSQL implementation of the file repository, the user and model
/// directories and the download counter.
///
/// Ordering within a slot uses `created_time DESC, seq DESC`; `seq` is a
/// `BIGSERIAL` assigned at insert.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    config: Arc<PostgresConfig>,
}

impl PostgresStore {
    /// Wrap a pool opened with [`crate::connect`].
    pub fn new(pool: PgPool, config: PostgresConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    /// Add `downloads` to the hourly bucket containing `at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the upsert fails.
    pub async fn record_download(
        &self,
        file_id: &str,
        model_id: &str,
        at: DateTime<Utc>,
        downloads: u64,
    ) -> Result<(), StoreError> {
        let table = self.config.download_hour_table();
        let hour = at.duration_trunc(TimeDelta::hours(1)).unwrap_or(at);
        let downloads = i64::try_from(downloads)
            .map_err(|_| StoreError::Serialization("download count overflow".into()))?;
        let query = format!(
            "INSERT INTO {table} (file_id, model_id, hour, downloads) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (file_id, hour) DO UPDATE SET downloads = {table}.downloads + EXCLUDED.downloads"
        );
        sqlx::query(&query)
            .bind(file_id)
            .bind(model_id)
            .bind(hour)
            .bind(downloads)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn aggregate_downloads(
        &self,
        key_column: &str,
        ids: &[String],
    ) -> Result<HashMap<String, DownloadCounts>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let table = self.config.download_hour_table();
        let query = format!(
            "SELECT {key_column} AS key, hour, downloads FROM {table} WHERE {key_column} = ANY($1)"
        );
        let rows = sqlx::query(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        let now = Utc::now();
        let mut counts: HashMap<String, DownloadCounts> = HashMap::new();
        for row in &rows {
            let key: String = row.try_get("key").map_err(backend)?;
            let downloads: i64 = row.try_get("downloads").map_err(backend)?;
            let bucket = HourlyDownloads {
                hour: row.try_get("hour").map_err(backend)?,
                downloads: u64::try_from(downloads).unwrap_or(0),
            };
            counts.entry(key).or_default().add(bucket, now);
        }
        Ok(counts)
    }
}

#[async_trait]
impl FileRepository for PostgresStore {
    async fn create(&self, file: &File) -> Result<(), StoreError> {
        if file.status != FileStatus::Pending {
            return Err(StoreError::Backend(format!(
                "new files must be pending, got {}",
                file.status
            )));
        }
        let table = self.config.file_table();
        let size = i64::try_from(file.size)
            .map_err(|_| StoreError::Serialization(format!("size {} overflows", file.size)))?;
        let query = format!(
            "INSERT INTO {table} ({FILE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );

        let result = sqlx::query(&query)
            .bind(&file.id)
            .bind(&file.user_id)
            .bind(&file.model_id)
            .bind(&file.filename)
            .bind(&file.framework)
            .bind(&file.framework_version)
            .bind(&file.client_name)
            .bind(size)
            .bind(Json(&file.metadata))
            .bind(file.status.as_str())
            .bind(file.created_time)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db))
                if db.is_unique_violation()
                    && db.constraint() == Some(self.config.one_pending_index().as_str()) =>
            {
                Err(StoreError::PendingConflict(file.slot().to_string()))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn commit(&self, slot: &Slot, file_id: &str) -> Result<File, StoreError> {
        let table = self.config.file_table();
        let query = format!(
            "UPDATE {table} SET status = 'committed' \
             WHERE id = $1 AND model_id = $2 AND filename = $3 AND status = 'pending' \
             RETURNING {FILE_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(file_id)
            .bind(&slot.model_id)
            .bind(&slot.filename)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => file_from_row(&row),
            None => Err(StoreError::NoPendingFile {
                slot: slot.to_string(),
                file_id: file_id.to_owned(),
            }),
        }
    }

    async fn delete_pending(&self, slot: &Slot) -> Result<Vec<File>, StoreError> {
        let table = self.config.file_table();
        let query = format!(
            "DELETE FROM {table} WHERE model_id = $1 AND filename = $2 AND status = 'pending' \
             RETURNING {FILE_COLUMNS}"
        );
        let rows = sqlx::query(&query)
            .bind(&slot.model_id)
            .bind(&slot.filename)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(file_from_row).collect()
    }

    async fn files_beyond_retention(
        &self,
        slot: &Slot,
        keep: u32,
    ) -> Result<Vec<File>, StoreError> {
        let table = self.config.file_table();
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM {table} \
             WHERE model_id = $1 AND filename = $2 AND status = 'committed' \
             ORDER BY created_time DESC, seq DESC OFFSET $3"
        );
        let rows = sqlx::query(&query)
            .bind(&slot.model_id)
            .bind(&slot.filename)
            .bind(i64::from(keep))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        let mut files = rows.iter().map(file_from_row).collect::<Result<Vec<_>, _>>()?;
        files.reverse();
        Ok(files)
    }

    async fn delete(&self, file_id: &str) -> Result<bool, StoreError> {
        let table = self.config.file_table();
        let query =
            format!("UPDATE {table} SET status = 'deleted' WHERE id = $1 AND status <> 'deleted'");
        let result = sqlx::query(&query)
            .bind(file_id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn by_id(&self, file_id: &str) -> Result<Option<File>, StoreError> {
        let table = self.config.file_table();
        let query = format!("SELECT {FILE_COLUMNS} FROM {table} WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(file_from_row).transpose()
    }

    async fn by_ids(&self, file_ids: &[String]) -> Result<Vec<File>, StoreError> {
        if file_ids.is_empty() {
            return Ok(Vec::new());
        }
        let table = self.config.file_table();
        let query = format!("SELECT {FILE_COLUMNS} FROM {table} WHERE id = ANY($1)");
        let rows = sqlx::query(&query)
            .bind(file_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        let mut found: HashMap<String, File> = rows
            .iter()
            .map(|row| file_from_row(row).map(|f| (f.id.clone(), f)))
            .collect::<Result<_, _>>()?;
        Ok(file_ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    async fn latest_by_model(&self, model_id: &str) -> Result<Vec<File>, StoreError> {
        let table = self.config.file_table();
        let query = format!(
            "SELECT DISTINCT ON (filename) {FILE_COLUMNS} FROM {table} \
             WHERE model_id = $1 AND status = 'committed' \
             ORDER BY filename, created_time DESC, seq DESC"
        );
        let rows = sqlx::query(&query)
            .bind(model_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(file_from_row).collect()
    }

    async fn scan(&self, status: Option<FileStatus>) -> Result<Vec<File>, StoreError> {
        let table = self.config.file_table();
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM {table} \
             WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY seq"
        );
        let rows = sqlx::query(&query)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(file_from_row).collect()
    }
}

#[async_trait]
impl DownloadCounter for PostgresStore {
    async fn counts_by_files(
        &self,
        file_ids: &[String],
    ) -> Result<HashMap<String, DownloadCounts>, StoreError> {
        self.aggregate_downloads("file_id", file_ids).await
    }

    async fn counts_by_models(
        &self,
        model_ids: &[String],
    ) -> Result<HashMap<String, DownloadCounts>, StoreError> {
        self.aggregate_downloads("model_id", model_ids).await
    }
}

#[async_trait]
impl UserDirectory for PostgresStore {
    async fn by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let table = self.config.user_table();
        let query = format!("SELECT id, username FROM {table} WHERE username = $1");
        let row: Option<(String, String)> = sqlx::query_as(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.map(|(id, username)| User { id, username }))
    }
}

#[async_trait]
impl ModelDirectory for PostgresStore {
    async fn by_user_id_slug(
        &self,
        user_id: &str,
        slug: &str,
    ) -> Result<Option<Model>, StoreError> {
        let table = self.config.model_table();
        let query = format!("SELECT * FROM {table} WHERE user_id = $1 AND slug = $2");
        let row = sqlx::query(&query)
            .bind(user_id)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(model_from_row).transpose()
    }

    async fn by_id(&self, model_id: &str) -> Result<Option<Model>, StoreError> {
        let table = self.config.model_table();
        let query = format!("SELECT * FROM {table} WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(model_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(model_from_row).transpose()
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use zoo_store::testing::run_file_repository_conformance_tests;

    use super::*;

    async fn test_store() -> PostgresStore {
        let config = PostgresConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/zoo_test".to_string()),
            table_prefix: format!("test_{}_", uuid::Uuid::new_v4().simple()),
            ..PostgresConfig::default()
        };
        let pool = crate::connect(&config)
            .await
            .expect("pool creation should succeed");
        PostgresStore::new(pool, config)
    }

    #[tokio::test]
    async fn file_repository_conformance() {
        let store = test_store().await;
        run_file_repository_conformance_tests(&store)
            .await
            .expect("file repository conformance tests should pass");
    }

    #[tokio::test]
    async fn download_counts() {
        let store = test_store().await;
        let now = Utc::now();
        store.record_download("f-1", "m-1", now, 2).await.unwrap();
        store.record_download("f-1", "m-1", now, 3).await.unwrap();
        store.record_download("f-2", "m-1", now, 1).await.unwrap();

        let files = store
            .counts_by_files(&["f-1".into(), "f-404".into()])
            .await
            .unwrap();
        assert_eq!(files["f-1"].hour, 5);
        assert!(!files.contains_key("f-404"));

        let models = store.counts_by_models(&["m-1".into()]).await.unwrap();
        assert_eq!(models["m-1"].all, 6);
    }

    #[tokio::test]
    async fn directory_lookups() {
        let store = test_store().await;
        sqlx::query(&format!(
            "INSERT INTO {} (id, username) VALUES ('u-1', 'ada')",
            store.config.user_table()
        ))
        .execute(&store.pool)
        .await
        .unwrap();
        sqlx::query(&format!(
            "INSERT INTO {} (id, user_id, slug, keep) VALUES ('m-1', 'u-1', 'mnist', 100)",
            store.config.model_table()
        ))
        .execute(&store.pool)
        .await
        .unwrap();

        let user = store.by_username("ada").await.unwrap().unwrap();
        assert_eq!(user.id, "u-1");
        let model = store.by_user_id_slug("u-1", "mnist").await.unwrap().unwrap();
        assert_eq!(model.keep, 100);
        assert!(store.by_id("m-2").await.unwrap().is_none());
    }
}
