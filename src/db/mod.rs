//! Database module for filedrop.
//!
//! Provides the connection pool, migration management, and the repositories
//! that own durable metadata.

mod file;
mod schema;
mod user;

pub use file::{FileRecord, FileRepository, NewFileRecord};
pub use schema::MIGRATIONS;
pub use user::{NewUser, User, UserRepository};

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::datetime::fmt_utc;
use crate::Result;

/// Connection pool type for the active backend.
#[cfg(feature = "sqlite")]
pub type DbPool = sqlx::SqlitePool;
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub type DbPool = sqlx::PgPool;

/// Maximum attempts for the startup connection bootstrap.
const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Initial delay between bootstrap attempts; doubles per attempt.
const CONNECT_BACKOFF_START: Duration = Duration::from_millis(500);

#[cfg(feature = "sqlite")]
const CREATE_VERSION_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL)";
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
const CREATE_VERSION_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS schema_version (version BIGINT PRIMARY KEY, applied_at TEXT NOT NULL)";

/// Database wrapper managing the pool and migrations.
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open the database at the given path, creating it if needed.
    ///
    /// Migrations are applied automatically.
    #[cfg(feature = "sqlite")]
    pub async fn open(path: &str) -> Result<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
        use std::str::FromStr;

        info!("Opening database at {path:?}");

        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| crate::FiledropError::Database(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open the database at the given connection URL.
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    pub async fn open(url: &str) -> Result<Self> {
        use sqlx::postgres::PgPoolOptions;

        info!("Connecting to database");

        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open an in-memory database for testing.
    #[cfg(feature = "sqlite")]
    pub async fn open_in_memory() -> Result<Self> {
        use sqlx::sqlite::SqlitePoolOptions;

        debug!("Opening in-memory database");

        // A single never-recycled connection keeps the :memory: database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open the database with bounded exponential backoff.
    ///
    /// Used at process startup; the process reports unhealthy only after the
    /// final attempt fails.
    pub async fn connect(path: &str) -> Result<Self> {
        let mut delay = CONNECT_BACKOFF_START;

        for attempt in 1..=MAX_CONNECT_ATTEMPTS {
            match Self::open(path).await {
                Ok(db) => return Ok(db),
                Err(e) if attempt < MAX_CONNECT_ATTEMPTS => {
                    warn!(
                        "Database connection attempt {attempt}/{MAX_CONNECT_ATTEMPTS} failed: {e}; retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("bootstrap loop returns on the final attempt")
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Apply pending migrations.
    async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_VERSION_TABLE).execute(&self.pool).await?;

        let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&self.pool)
            .await?;
        let current = current.unwrap_or(0);

        for (idx, script) in MIGRATIONS.iter().enumerate() {
            let version = (idx + 1) as i64;
            if version <= current {
                continue;
            }
            debug!("Applying migration v{version}");
            sqlx::raw_sql(script).execute(&self.pool).await?;
            sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES ($1, $2)")
                .bind(version)
                .bind(fmt_utc(chrono::Utc::now()))
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version.unwrap_or(0))
    }
}
