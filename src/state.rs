use crate::config::{AppConfig, DbConfig};
use anyhow::Context;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::{str::FromStr, sync::Arc, time::Duration};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

/// Connection options for the single-file store: one writer, bounded lock wait,
/// relaxed durability.
pub fn connect_options(cfg: &DbConfig) -> anyhow::Result<SqliteConnectOptions> {
    let opts = SqliteConnectOptions::from_str(&cfg.url)
        .with_context(|| format!("parse database url {}", cfg.url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(cfg.busy_timeout_ms));
    Ok(opts)
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        if let Some(dir) = config
            .db
            .url
            .strip_prefix("sqlite://")
            .and_then(|p| std::path::Path::new(p).parent())
            .filter(|d| !d.as_os_str().is_empty())
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create data dir {}", dir.display()))?;
        }

        let db = SqlitePoolOptions::new()
            .max_connections(config.db.max_connections)
            .connect_with(connect_options(&config.db)?)
            .await
            .context("connect to database")?;

        Ok(Self { db, config })
    }

    /// Fresh in-memory store with migrations and seed data applied.
    #[cfg(test)]
    pub async fn for_tests() -> Self {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("memory url")
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Memory);
        // A second connection would open a separate, empty database.
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .expect("memory pool");

        Self::prepared_for_tests(
            db,
            DbConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
                busy_timeout_ms: 5000,
            },
        )
        .await
    }

    /// File-backed WAL store at `path` with several connections, for tests
    /// that need real concurrent writers.
    #[cfg(test)]
    pub async fn on_disk_for_tests(path: &std::path::Path) -> Self {
        let cfg = DbConfig {
            url: format!("sqlite://{}", path.display()),
            max_connections: 5,
            busy_timeout_ms: 5000,
        };
        let db = SqlitePoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect_with(connect_options(&cfg).expect("file url"))
            .await
            .expect("file pool");

        Self::prepared_for_tests(db, cfg).await
    }

    #[cfg(test)]
    async fn prepared_for_tests(db: SqlitePool, db_config: DbConfig) -> Self {
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .expect("migrations apply");
        crate::rewards::catalog::seed_if_empty(&db)
            .await
            .expect("seed coupons");
        crate::spots::repo::seed_if_empty(&db)
            .await
            .expect("seed spots");

        let config = Arc::new(AppConfig {
            db: db_config,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
        });
        Self { db, config }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_options_accept_file_url() {
        let cfg = DbConfig {
            url: "sqlite://data/recycling.db".into(),
            max_connections: 5,
            busy_timeout_ms: 5000,
        };
        assert!(connect_options(&cfg).is_ok());
    }

    #[tokio::test]
    async fn test_state_is_migrated_and_seeded() {
        let state = AppState::for_tests().await;
        let (coupons,): (i64,) = sqlx::query_as("SELECT COUNT(1) FROM coupons")
            .fetch_one(&state.db)
            .await
            .unwrap();
        let (spots,): (i64,) = sqlx::query_as("SELECT COUNT(1) FROM spots")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(coupons, 4);
        assert_eq!(spots, 3);
    }
}
