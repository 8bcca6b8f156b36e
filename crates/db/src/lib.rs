//! Postgres persistence for the movie catalog.
//!
//! Repositories in [`repositories`] own every SQL statement issued against
//! the `movies` and `users` tables. Each one runs its statements inside a
//! [`deadline::QueryScope`] so no call can block past its deadline.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio_util::sync::CancellationToken;

pub mod deadline;
pub mod error;
pub mod models;
pub mod repositories;

pub use deadline::QueryScope;
pub use error::StoreError;
pub use repositories::{MovieRepo, UserRepo};

pub type DbPool = sqlx::PgPool;

/// How long pool creation may spend establishing the first connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection pool and query-deadline settings.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub max_idle_time: Duration,
    /// Deadline applied to every individual store operation.
    pub query_timeout: Duration,
}

impl DbConfig {
    /// Load database settings from environment variables.
    ///
    /// | Env Var                  | Default   |
    /// |--------------------------|-----------|
    /// | `DATABASE_URL`           | required  |
    /// | `DB_MAX_CONNECTIONS`     | `25`      |
    /// | `DB_MAX_IDLE_TIME_SECS`  | `900`     |
    /// | `DB_QUERY_TIMEOUT_SECS`  | `3`       |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let max_connections: u32 = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "25".into())
            .parse()
            .expect("DB_MAX_CONNECTIONS must be a valid u32");

        let max_idle_secs: u64 = std::env::var("DB_MAX_IDLE_TIME_SECS")
            .unwrap_or_else(|_| "900".into())
            .parse()
            .expect("DB_MAX_IDLE_TIME_SECS must be a valid u64");

        let query_timeout_secs: u64 = std::env::var("DB_QUERY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("DB_QUERY_TIMEOUT_SECS must be a valid u64");

        Self {
            database_url,
            max_connections,
            max_idle_time: Duration::from_secs(max_idle_secs),
            query_timeout: Duration::from_secs(query_timeout_secs),
        }
    }
}

/// Create a connection pool and verify connectivity within [`CONNECT_TIMEOUT`].
///
/// Every connection carries a server-side `statement_timeout` equal to the
/// query deadline, so a statement abandoned by [`QueryScope`] is also
/// stopped by Postgres instead of running to completion.
pub async fn create_pool(config: &DbConfig) -> Result<DbPool, sqlx::Error> {
    let connect_options: PgConnectOptions = config.database_url.parse()?;
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .idle_timeout(config.max_idle_time)
        .acquire_timeout(CONNECT_TIMEOUT)
        .connect_with(with_statement_timeout(connect_options, config.query_timeout))
        .await
}

/// Set the session `statement_timeout` (milliseconds) sent at connect time.
pub fn with_statement_timeout(options: PgConnectOptions, timeout: Duration) -> PgConnectOptions {
    options.options([("statement_timeout", timeout.as_millis().to_string())])
}

/// Run a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the SQL migrations embedded from `migrations/`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Every repository, sharing one pool and one query deadline.
#[derive(Debug, Clone)]
pub struct Stores {
    pub movies: MovieRepo,
    pub users: UserRepo,
}

impl Stores {
    pub fn new(pool: DbPool, query_timeout: Duration) -> Self {
        let scope = QueryScope::new(query_timeout);
        Self {
            movies: MovieRepo::new(pool.clone(), scope.clone()),
            users: UserRepo::new(pool, scope),
        }
    }

    /// Rebind every repository to `cancel`, typically one token per request.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            movies: self.movies.with_cancellation(cancel.clone()),
            users: self.users.with_cancellation(cancel),
        }
    }
}
