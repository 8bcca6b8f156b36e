pub mod health;
pub mod movies;
pub mod users;

use axum::http::Method;
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /healthcheck                                     service and database health
///
/// /movies                                          list, create
/// /movies/{id}                                     get, update (PATCH), delete
///
/// /users                                           register
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/movies", movies::router())
        .nest("/users", users::router())
}

/// Fallback for paths no route matches.
pub async fn not_found() -> AppError {
    AppError::not_found()
}

/// Fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method)
}
