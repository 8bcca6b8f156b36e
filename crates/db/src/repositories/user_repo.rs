//! Repository for the `users` table.

use omdb_core::types::{DbId, Timestamp};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::deadline::QueryScope;
use crate::error::StoreError;
use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, created_at, name, email, password_hash, activated, version";

/// Name of the unique constraint on `users.email`.
const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

/// Provides insert, lookup and versioned update for users.
#[derive(Debug, Clone)]
pub struct UserRepo {
    pool: PgPool,
    scope: QueryScope,
}

impl UserRepo {
    pub fn new(pool: PgPool, scope: QueryScope) -> Self {
        Self { pool, scope }
    }

    /// A handle whose operations also abort when `cancel` fires.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            pool: self.pool.clone(),
            scope: self.scope.with_cancellation(cancel),
        }
    }

    /// Insert `user`, writing the assigned `id`, `created_at` and `version`
    /// back into it.
    pub async fn insert(&self, user: &mut User) -> Result<(), StoreError> {
        let (id, created_at, version) = self
            .scope
            .run("users.insert", async {
                let mut tx = self.pool.begin().await?;
                let row = sqlx::query_as::<_, (DbId, Timestamp, i32)>(
                    "INSERT INTO users (name, email, password_hash, activated)
                     VALUES ($1, $2, $3, $4)
                     RETURNING id, created_at, version",
                )
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.activated)
                .fetch_one(&mut *tx)
                .await
                .map_err(classify_write_error)?;
                tx.commit().await?;
                Ok::<_, StoreError>(row)
            })
            .await?;

        user.id = id;
        user.created_at = created_at;
        user.version = version;
        tracing::debug!(user_id = id, "User inserted");
        Ok(())
    }

    /// Find a user by email address.
    pub async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        self.scope
            .run("users.get_by_email", async {
                sqlx::query_as::<_, User>(&query)
                    .bind(email)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or(StoreError::RecordNotFound)
            })
            .await
    }

    /// Versioned update; see [`crate::MovieRepo::update`] for the contract.
    pub async fn update(&self, user: &mut User) -> Result<(), StoreError> {
        let new_version = self
            .scope
            .run("users.update", async {
                let mut tx = self.pool.begin().await?;
                let version = sqlx::query_scalar::<_, i32>(
                    "UPDATE users
                     SET name = $1, email = $2, password_hash = $3, activated = $4,
                         version = version + 1
                     WHERE id = $5 AND version = $6
                     RETURNING version",
                )
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.activated)
                .bind(user.id)
                .bind(user.version)
                .fetch_optional(&mut *tx)
                .await
                .map_err(classify_write_error)?
                .ok_or(StoreError::EditConflict)?;
                tx.commit().await?;
                Ok::<_, StoreError>(version)
            })
            .await?;

        user.version = new_version;
        tracing::debug!(user_id = user.id, version = new_version, "User updated");
        Ok(())
    }
}

/// Map a unique violation on `users.email` to [`StoreError::DuplicateEmail`].
fn classify_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        // PostgreSQL unique constraint violation: error code 23505
        if db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT)
        {
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::Database(err)
}
