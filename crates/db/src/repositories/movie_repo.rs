//! Repository for the `movies` table.

use futures::TryStreamExt;
use omdb_core::filters::Filters;
use omdb_core::pagination::{calculate_metadata, Metadata};
use omdb_core::types::{DbId, Timestamp};
use sqlx::{FromRow, PgPool};
use tokio_util::sync::CancellationToken;

use crate::deadline::QueryScope;
use crate::error::StoreError;
use crate::models::movie::Movie;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, created_at, title, year, runtime, genres, version";

/// One row of a listing page: the movie plus the window-function count of
/// every row matching the same predicate.
#[derive(FromRow)]
struct MoviePageRow {
    total_records: i64,
    #[sqlx(flatten)]
    movie: Movie,
}

/// The only component that issues SQL against `movies`.
///
/// Holds no mutable state: concurrent writers are arbitrated by Postgres and
/// the `version` compare-and-swap in [`MovieRepo::update`].
#[derive(Debug, Clone)]
pub struct MovieRepo {
    pool: PgPool,
    scope: QueryScope,
}

impl MovieRepo {
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

    /// Insert `movie`, writing the assigned `id`, `created_at` and `version`
    /// back into it.
    pub async fn insert(&self, movie: &mut Movie) -> Result<(), StoreError> {
        let (id, created_at, version) = self
            .scope
            .run("movies.insert", async {
                let mut tx = self.pool.begin().await?;
                let row = sqlx::query_as::<_, (DbId, Timestamp, i32)>(
                    "INSERT INTO movies (title, year, runtime, genres)
                     VALUES ($1, $2, $3, $4)
                     RETURNING id, created_at, version",
                )
                .bind(&movie.title)
                .bind(movie.year)
                .bind(movie.runtime)
                .bind(&movie.genres)
                .fetch_one(&mut *tx)
                .await?;
                tx.commit().await?;
                Ok::<_, StoreError>(row)
            })
            .await?;

        movie.id = id;
        movie.created_at = created_at;
        movie.version = version;
        tracing::debug!(movie_id = id, "Movie inserted");
        Ok(())
    }

    /// Fetch a movie by ID.
    ///
    /// Non-positive IDs cannot exist in a BIGSERIAL column, so they are
    /// reported as missing without touching the database.
    pub async fn get(&self, id: DbId) -> Result<Movie, StoreError> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }

        let query = format!("SELECT {COLUMNS} FROM movies WHERE id = $1");
        self.scope
            .run("movies.get", async {
                sqlx::query_as::<_, Movie>(&query)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or(StoreError::RecordNotFound)
            })
            .await
    }

    /// Write `movie` back only if its `version` still matches the stored one.
    ///
    /// On success the stored version is incremented and copied into
    /// `movie.version`. If the row was changed or deleted since `movie` was
    /// read, nothing is written and [`StoreError::EditConflict`] is returned.
    ///
    /// The write commits only if the scope's deadline and cancellation have
    /// not fired first; an interrupted call rolls back.
    pub async fn update(&self, movie: &mut Movie) -> Result<(), StoreError> {
        let new_version = self
            .scope
            .run("movies.update", async {
                let mut tx = self.pool.begin().await?;
                let version = sqlx::query_scalar::<_, i32>(
                    "UPDATE movies
                     SET title = $1, year = $2, runtime = $3, genres = $4, version = version + 1
                     WHERE id = $5 AND version = $6
                     RETURNING version",
                )
                .bind(&movie.title)
                .bind(movie.year)
                .bind(movie.runtime)
                .bind(&movie.genres)
                .bind(movie.id)
                .bind(movie.version)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::EditConflict)?;
                tx.commit().await?;
                Ok::<_, StoreError>(version)
            })
            .await
            .inspect_err(|e| {
                if matches!(e, StoreError::EditConflict) {
                    tracing::warn!(
                        movie_id = movie.id,
                        expected_version = movie.version,
                        "Movie update lost version race"
                    );
                }
            })?;

        movie.version = new_version;
        tracing::debug!(movie_id = movie.id, version = new_version, "Movie updated");
        Ok(())
    }

    /// Delete a movie by ID. No version check is applied.
    pub async fn delete(&self, id: DbId) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }

        let rows_affected = self
            .scope
            .run("movies.delete", async {
                let mut tx = self.pool.begin().await?;
                let result = sqlx::query("DELETE FROM movies WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok::<_, StoreError>(result.rows_affected())
            })
            .await?;

        if rows_affected == 0 {
            return Err(StoreError::RecordNotFound);
        }
        tracing::debug!(movie_id = id, "Movie deleted");
        Ok(())
    }

    /// Return one page of movies matching `title` and `genres`, plus
    /// pagination metadata for the full match set.
    ///
    /// - An empty (or whitespace-only) `title` matches every title.
    /// - A movie matches `genres` when its own genres are a superset; an
    ///   empty slice matches everything.
    /// - Rows are ordered by the validated sort key, then by `id` so that
    ///   ties land on a stable page.
    ///
    /// The total count comes from a window function in the same query, so it
    /// reflects the predicate before `LIMIT`/`OFFSET`.
    ///
    /// # Panics
    ///
    /// Panics if `filters.sort` is outside its safelist; see
    /// [`Filters::sort_column`].
    pub async fn get_all(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Movie>, Metadata), StoreError> {
        let query = format!(
            "SELECT count(*) OVER() AS total_records, {COLUMNS}
             FROM movies
             WHERE (to_tsvector('simple', title) @@ plainto_tsquery('simple', $1) OR $1 = '')
               AND (genres @> $2 OR $2 = '{{}}')
             ORDER BY {} {}, id ASC
             LIMIT $3 OFFSET $4",
            filters.sort_column(),
            filters.sort_direction()
        );
        let title = title.trim();

        // The stream is owned by this future: it is dropped (and the
        // connection released) on success, on a mid-stream error, and when
        // the scope's deadline or cancellation fires.
        let (movies, total_records) = self
            .scope
            .run("movies.get_all", async {
                let mut rows = sqlx::query_as::<_, MoviePageRow>(&query)
                    .bind(title)
                    .bind(genres)
                    .bind(filters.limit())
                    .bind(filters.offset())
                    .fetch(&self.pool);

                let mut total_records = 0;
                let mut movies = Vec::new();
                while let Some(row) = rows.try_next().await? {
                    total_records = row.total_records;
                    movies.push(row.movie);
                }
                Ok::<_, StoreError>((movies, total_records))
            })
            .await?;

        let metadata = calculate_metadata(total_records, filters.page, filters.page_size);
        tracing::debug!(
            returned = movies.len(),
            total_records,
            page = filters.page,
            "Movie page fetched"
        );
        Ok((movies, metadata))
    }
}
