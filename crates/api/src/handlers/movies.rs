//! Handlers for the `/movies` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use omdb_core::filters::validate_filters;
use omdb_core::validator::Validator;
use omdb_db::models::movie::{validate_movie, CreateMovie, Movie, UpdateMovie, MOVIE_SORT_SAFELIST};
use omdb_db::StoreError;

use crate::error::AppResult;
use crate::query::{parse_id, ListMoviesParams};
use crate::response::{DataResponse, MessageResponse, PageResponse};
use crate::state::AppState;

/// Request header carrying the version the client last read.
const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

/// GET /v1/movies
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListMoviesParams>,
) -> AppResult<Json<PageResponse<Movie>>> {
    let mut v = Validator::new();
    let query = params.parse(&mut v, MOVIE_SORT_SAFELIST);
    validate_filters(&mut v, &query.filters);
    v.into_result()?;

    let (stores, _cancel_on_drop) = state.request_stores();
    let (movies, metadata) = stores
        .movies
        .get_all(&query.title, &query.genres, &query.filters)
        .await?;
    Ok(Json(PageResponse {
        data: movies,
        metadata,
    }))
}

/// POST /v1/movies
///
/// Responds 201 with a `Location` header pointing at the new movie.
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateMovie>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let mut movie = Movie::from_create(input);

    let mut v = Validator::new();
    validate_movie(&mut v, &movie);
    v.into_result()?;

    let (stores, _cancel_on_drop) = state.request_stores();
    stores.movies.insert(&mut movie).await?;
    tracing::info!(movie_id = movie.id, "Movie created");

    let location = format!("/v1/movies/{}", movie.id);
    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(DataResponse { data: movie }),
    ))
}

/// GET /v1/movies/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Movie>>> {
    let id = parse_id(&id)?;
    let (stores, _cancel_on_drop) = state.request_stores();
    let movie = stores.movies.get(id).await?;
    Ok(Json(DataResponse { data: movie }))
}

/// PATCH /v1/movies/{id}
///
/// Applies only the fields present in the body. When `X-Expected-Version`
/// is sent it must equal the stored version, otherwise the update is
/// refused with 409 before anything is written.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<UpdateMovie>, JsonRejection>,
) -> AppResult<Json<DataResponse<Movie>>> {
    let id = parse_id(&id)?;
    let (stores, _cancel_on_drop) = state.request_stores();
    let mut movie = stores.movies.get(id).await?;

    if let Some(expected) = headers.get(EXPECTED_VERSION_HEADER) {
        if expected.as_bytes() != movie.version.to_string().as_bytes() {
            return Err(StoreError::EditConflict.into());
        }
    }

    let Json(input) = payload?;
    movie.apply(input);

    let mut v = Validator::new();
    validate_movie(&mut v, &movie);
    v.into_result()?;

    stores.movies.update(&mut movie).await?;
    tracing::info!(movie_id = movie.id, version = movie.version, "Movie updated");
    Ok(Json(DataResponse { data: movie }))
}

/// DELETE /v1/movies/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    let id = parse_id(&id)?;
    let (stores, _cancel_on_drop) = state.request_stores();
    stores.movies.delete(id).await?;
    tracing::info!(movie_id = id, "Movie deleted");
    Ok(Json(DataResponse {
        data: MessageResponse {
            message: "movie successfully deleted",
        },
    }))
}
