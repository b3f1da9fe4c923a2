use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

use zoo_store::error::StoreError;

use crate::config::PostgresConfig;
use crate::migrations;

fn connect_options(config: &PostgresConfig) -> Result<PgConnectOptions, StoreError> {
    let mut options: PgConnectOptions = config
        .url
        .parse()
        .map_err(|e: sqlx::Error| StoreError::Connection(e.to_string()))?;

    if let Some(mode) = &config.ssl_mode {
        let mode = match mode.as_str() {
            "disable" => PgSslMode::Disable,
            "prefer" => PgSslMode::Prefer,
            "require" => PgSslMode::Require,
            "verify-ca" => PgSslMode::VerifyCa,
            "verify-full" => PgSslMode::VerifyFull,
            other => {
                return Err(StoreError::Connection(format!("unknown ssl_mode: {other}")));
            }
        };
        options = options.ssl_mode(mode);
    }
    if let Some(path) = &config.ssl_root_cert {
        options = options.ssl_root_cert(path);
    }
    Ok(options)
}

/// Open a pool and run migrations. The pool is shared by [`crate::PostgresStore`]
/// and [`crate::PostgresDistributedLock`].
///
/// # Errors
///
/// Returns [`StoreError::Connection`] if the pool cannot be created, or
/// [`StoreError::Backend`] if migrations fail.
pub async fn connect(config: &PostgresConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .connect_with(connect_options(config)?)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

    migrations::run_migrations(&pool, config)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_ssl_mode() {
        let config = PostgresConfig {
            ssl_mode: Some("sometimes".into()),
            ..PostgresConfig::default()
        };
        assert!(matches!(
            connect_options(&config),
            Err(StoreError::Connection(msg)) if msg.contains("sometimes")
        ));
    }

    #[test]
    fn rejects_bad_url() {
        let config = PostgresConfig {
            url: "not a url".into(),
            ..PostgresConfig::default()
        };
        assert!(connect_options(&config).is_err());
    }
}
