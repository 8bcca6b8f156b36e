//! Integration tests for the movie repository.
//!
//! Exercises [`MovieRepo`] against a real database:
//! - Insert / get round trip
//! - Optimistic concurrency on update
//! - Delete and not-found handling
//! - Filtered, sorted, paginated listing
//! - Deadline and cancellation

use std::time::Duration;

use assert_matches::assert_matches;
use omdb_core::filters::Filters;
use omdb_db::models::movie::{Movie, Runtime, MOVIE_SORT_SAFELIST};
use omdb_db::{MovieRepo, QueryScope, StoreError};
use sqlx::{PgPool, Postgres, Transaction};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn repo(pool: &PgPool) -> MovieRepo {
    MovieRepo::new(pool.clone(), QueryScope::default())
}

fn movie(title: &str, year: i32, runtime: i32, genres: &[&str]) -> Movie {
    Movie {
        title: title.to_string(),
        year,
        runtime: Runtime(runtime),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        ..Movie::default()
    }
}

fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
    Filters {
        page,
        page_size,
        sort: sort.to_string(),
        sort_safelist: MOVIE_SORT_SAFELIST,
    }
}

fn genres(values: &[&str]) -> Vec<String> {
    values.iter().map(|g| g.to_string()).collect()
}

async fn seed(repo: &MovieRepo) -> Vec<Movie> {
    let mut movies = vec![
        movie("Black Panther", 2018, 134, &["action", "adventure"]),
        movie("Deadpool", 2016, 108, &["action", "comedy"]),
        movie("The Breakfast Club", 1986, 96, &["drama"]),
        movie("Moana", 2016, 107, &["animation", "adventure"]),
    ];
    for m in &mut movies {
        repo.insert(m).await.unwrap();
    }
    movies
}

fn titles(movies: &[Movie]) -> Vec<&str> {
    movies.iter().map(|m| m.title.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Insert / get
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_insert_then_get(pool: PgPool) {
    let repo = repo(&pool);
    let mut m = movie("Casablanca", 1942, 102, &["drama", "romance"]);
    repo.insert(&mut m).await.unwrap();

    assert!(m.id > 0);
    assert_eq!(m.version, 1);

    let fetched = repo.get(m.id).await.unwrap();
    assert_eq!(fetched, m);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_missing(pool: PgPool) {
    let result = repo(&pool).get(9_999).await;
    assert_matches!(result, Err(StoreError::RecordNotFound));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_non_positive_id_skips_database(pool: PgPool) {
    let repo = repo(&pool);
    pool.close().await;

    // A closed pool would fail any round trip with PoolClosed.
    assert_matches!(repo.get(0).await, Err(StoreError::RecordNotFound));
    assert_matches!(repo.get(-3).await, Err(StoreError::RecordNotFound));
    assert_matches!(repo.delete(0).await, Err(StoreError::RecordNotFound));
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_update_bumps_version(pool: PgPool) {
    let repo = repo(&pool);
    let mut m = movie("Casablanca", 1942, 102, &["drama"]);
    repo.insert(&mut m).await.unwrap();

    m.runtime = Runtime(103);
    repo.update(&mut m).await.unwrap();
    assert_eq!(m.version, 2);

    let fetched = repo.get(m.id).await.unwrap();
    assert_eq!(fetched.runtime, Runtime(103));
    assert_eq!(fetched.version, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_updates_one_wins(pool: PgPool) {
    let repo = repo(&pool);
    let mut original = movie("Casablanca", 1942, 102, &["drama"]);
    repo.insert(&mut original).await.unwrap();

    let mut a = repo.get(original.id).await.unwrap();
    let mut b = a.clone();
    a.year = 1943;
    b.title = "Casablanca (Restored)".to_string();

    let (ra, rb) = tokio::join!(repo.update(&mut a), repo.update(&mut b));

    let outcomes = [ra.is_ok(), rb.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    for result in [ra, rb] {
        if let Err(e) = result {
            assert_matches!(e, StoreError::EditConflict);
        }
    }

    let stored = repo.get(original.id).await.unwrap();
    assert_eq!(stored.version, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_stale_version_conflicts(pool: PgPool) {
    let repo = repo(&pool);
    let mut m = movie("Casablanca", 1942, 102, &["drama"]);
    repo.insert(&mut m).await.unwrap();

    let mut stale = m.clone();
    repo.update(&mut m).await.unwrap();

    stale.year = 1950;
    assert_matches!(repo.update(&mut stale).await, Err(StoreError::EditConflict));
    assert_eq!(stale.version, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_after_delete_conflicts(pool: PgPool) {
    let repo = repo(&pool);
    let mut m = movie("Casablanca", 1942, 102, &["drama"]);
    repo.insert(&mut m).await.unwrap();
    repo.delete(m.id).await.unwrap();

    assert_matches!(repo.update(&mut m).await, Err(StoreError::EditConflict));
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_delete(pool: PgPool) {
    let repo = repo(&pool);
    let mut m = movie("Casablanca", 1942, 102, &["drama"]);
    repo.insert(&mut m).await.unwrap();

    repo.delete(m.id).await.unwrap();
    assert_matches!(repo.get(m.id).await, Err(StoreError::RecordNotFound));
    assert_matches!(repo.delete(m.id).await, Err(StoreError::RecordNotFound));
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_get_all_unfiltered(pool: PgPool) {
    let repo = repo(&pool);
    let seeded = seed(&repo).await;

    let (movies, metadata) = repo.get_all("", &[], &filters(1, 20, "id")).await.unwrap();
    assert_eq!(movies, seeded);
    assert_eq!(metadata.total_records, 4);
    assert_eq!(metadata.current_page, 1);
    assert_eq!(metadata.last_page, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_all_title_search(pool: PgPool) {
    let repo = repo(&pool);
    seed(&repo).await;

    let (movies, metadata) = repo
        .get_all("  panther ", &[], &filters(1, 20, "id"))
        .await
        .unwrap();
    assert_eq!(titles(&movies), ["Black Panther"]);
    assert_eq!(metadata.total_records, 1);

    let (movies, _) = repo
        .get_all("club breakfast", &[], &filters(1, 20, "id"))
        .await
        .unwrap();
    assert_eq!(titles(&movies), ["The Breakfast Club"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_all_genres_superset(pool: PgPool) {
    let repo = repo(&pool);
    seed(&repo).await;

    let (movies, _) = repo
        .get_all("", &genres(&["adventure"]), &filters(1, 20, "title"))
        .await
        .unwrap();
    assert_eq!(titles(&movies), ["Black Panther", "Moana"]);

    let (movies, _) = repo
        .get_all("", &genres(&["action", "comedy"]), &filters(1, 20, "id"))
        .await
        .unwrap();
    assert_eq!(titles(&movies), ["Deadpool"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_all_no_match_has_empty_metadata(pool: PgPool) {
    let repo = repo(&pool);
    seed(&repo).await;

    let (movies, metadata) = repo
        .get_all("nonexistent", &[], &filters(1, 20, "id"))
        .await
        .unwrap();
    assert!(movies.is_empty());
    assert!(metadata.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_all_descending_with_id_tiebreak(pool: PgPool) {
    let repo = repo(&pool);
    seed(&repo).await;

    // Deadpool and Moana share 2016; ties fall back to ascending id.
    let (movies, _) = repo.get_all("", &[], &filters(1, 20, "-year")).await.unwrap();
    assert_eq!(
        titles(&movies),
        ["Black Panther", "Deadpool", "Moana", "The Breakfast Club"]
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_all_pages_are_stable(pool: PgPool) {
    let repo = repo(&pool);
    let mut all = Vec::new();
    for i in 0..5 {
        let mut m = movie(&format!("Tied {i}"), 2000, 90, &["drama"]);
        repo.insert(&mut m).await.unwrap();
        all.push(m);
    }

    let mut paged = Vec::new();
    for page in 1..=3 {
        let (movies, metadata) = repo
            .get_all("", &[], &filters(page, 2, "year"))
            .await
            .unwrap();
        assert_eq!(metadata.total_records, 5);
        assert_eq!(metadata.last_page, 3);
        paged.extend(movies);
    }
    assert_eq!(paged, all);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_all_past_last_page(pool: PgPool) {
    let repo = repo(&pool);
    seed(&repo).await;

    let (movies, metadata) = repo.get_all("", &[], &filters(5, 2, "id")).await.unwrap();
    assert!(movies.is_empty());
    assert!(metadata.is_empty());
}

// ---------------------------------------------------------------------------
// Deadline / cancellation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_cancelled_token_aborts_listing(pool: PgPool) {
    let repo = repo(&pool);
    seed(&repo).await;

    let token = CancellationToken::new();
    token.cancel();
    let result = repo
        .with_cancellation(token)
        .get_all("", &[], &filters(1, 20, "id"))
        .await;
    assert_matches!(result, Err(StoreError::Cancelled));
}

/// Hold a row lock so that any UPDATE of `id` blocks until the returned
/// transaction ends.
async fn lock_row(pool: &PgPool, id: i64) -> Transaction<'static, Postgres> {
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM movies WHERE id = $1 FOR UPDATE")
        .bind(id)
        .execute(&mut *tx)
        .await
        .unwrap();
    tx
}

/// Count backends in this database running (or holding open) an UPDATE of
/// `movies`, optionally only those waiting on a lock.
async fn pending_updates(pool: &PgPool, waiting_on_lock: bool) -> i64 {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM pg_stat_activity
         WHERE datname = current_database()
           AND query LIKE 'UPDATE movies%'
           AND state IN ('active', 'idle in transaction')
           AND ($1 = false OR wait_event_type = 'Lock')",
    )
    .bind(waiting_on_lock)
    .fetch_one(pool)
    .await
    .unwrap();
    count
}

async fn wait_for_blocked_update(pool: &PgPool) {
    for _ in 0..250 {
        if pending_updates(pool, true).await > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("UPDATE never blocked on the row lock");
}

async fn wait_for_abandoned_update(pool: &PgPool) {
    for _ in 0..250 {
        if pending_updates(pool, false).await == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("abandoned UPDATE still holds a connection");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_timed_out_update_is_not_committed(pool: PgPool) {
    let mut m = movie("Casablanca", 1942, 102, &["drama"]);
    repo(&pool).insert(&mut m).await.unwrap();

    let lock = lock_row(&pool, m.id).await;
    let bounded = MovieRepo::new(pool.clone(), QueryScope::new(Duration::from_millis(100)));

    let mut edited = m.clone();
    edited.title = "Changed after timeout".to_string();
    let started = std::time::Instant::now();
    let result = bounded.update(&mut edited).await;

    assert_matches!(result, Err(StoreError::Timeout(d)) if d == Duration::from_millis(100));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(edited.version, 1);

    lock.commit().await.unwrap();
    wait_for_abandoned_update(&pool).await;

    let stored = repo(&pool).get(m.id).await.unwrap();
    assert_eq!(stored.title, "Casablanca");
    assert_eq!(stored.version, 1);

    // A retry from the version the caller holds still succeeds.
    repo(&pool).update(&mut edited).await.unwrap();
    assert_eq!(edited.version, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cancelled_update_in_flight_is_not_committed(pool: PgPool) {
    let mut m = movie("Casablanca", 1942, 102, &["drama"]);
    repo(&pool).insert(&mut m).await.unwrap();

    let lock = lock_row(&pool, m.id).await;
    let token = CancellationToken::new();
    let cancellable = MovieRepo::new(pool.clone(), QueryScope::new(Duration::from_secs(30)))
        .with_cancellation(token.clone());

    let canceller = {
        let pool = pool.clone();
        tokio::spawn(async move {
            wait_for_blocked_update(&pool).await;
            token.cancel();
        })
    };

    let mut edited = m.clone();
    edited.title = "Changed after cancel".to_string();
    let result = cancellable.update(&mut edited).await;
    canceller.await.unwrap();

    assert_matches!(result, Err(StoreError::Cancelled));

    lock.commit().await.unwrap();
    wait_for_abandoned_update(&pool).await;

    let stored = repo(&pool).get(m.id).await.unwrap();
    assert_eq!(stored.title, "Casablanca");
    assert_eq!(stored.version, 1);
}
