use sqlx::PgPool;
use tracing::info;

use crate::config::PostgresConfig;

/// Create every table and index if missing. Safe to run repeatedly.
///
/// The user and model tables are owned by the account system; they are
/// created here only so that a fresh database is usable.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if any DDL statement fails.
pub async fn run_migrations(pool: &PgPool, config: &PostgresConfig) -> Result<(), sqlx::Error> {
    let file = config.file_table();
    let download_hour = config.download_hour_table();
    let user = config.user_table();
    let model = config.model_table();
    let locks = config.locks_table();
    let prefix = &config.table_prefix;
    let one_pending = config.one_pending_index();

    let statements = [
        format!(
            "CREATE TABLE IF NOT EXISTS {file} (
                id TEXT PRIMARY KEY,
                seq BIGSERIAL NOT NULL,
                user_id TEXT NOT NULL,
                model_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                framework TEXT NOT NULL,
                framework_version TEXT NOT NULL,
                client_name TEXT NOT NULL,
                size BIGINT NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                status TEXT NOT NULL,
                created_time TIMESTAMPTZ NOT NULL
            )"
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {one_pending} \
             ON {file} (model_id, filename) WHERE status = 'pending'"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {prefix}file_slot_idx \
             ON {file} (model_id, filename, created_time DESC, seq DESC)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {download_hour} (
                file_id TEXT NOT NULL,
                model_id TEXT NOT NULL,
                hour TIMESTAMPTZ NOT NULL,
                downloads BIGINT NOT NULL,
                PRIMARY KEY (file_id, hour)
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {prefix}download_hour_model_idx \
             ON {download_hour} (model_id)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {user} (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {model} (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                slug TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                visibility TEXT NOT NULL DEFAULT 'public',
                keep INTEGER NOT NULL DEFAULT 10,
                created_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (user_id, slug)
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {locks} (
                name TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )"
        ),
    ];

    for statement in &statements {
        sqlx::query(statement).execute(pool).await?;
    }

    info!(schema = %config.schema, prefix = %prefix, "postgres migrations applied");
    Ok(())
}
