//! Handlers for the `/users` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use omdb_core::password::hash_password;
use omdb_core::validator::Validator;
use omdb_db::models::user::{validate_user, RegisterUser, User};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /v1/users
///
/// Hash the password, validate, and store a new (not yet activated) user.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUser>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    let Json(input) = payload?;

    let hashed = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let mut user = User::new(input.name, input.email, hashed);

    let mut v = Validator::new();
    validate_user(&mut v, &user, Some(&input.password));
    v.into_result()?;

    let (stores, _cancel_on_drop) = state.request_stores();
    stores.users.insert(&mut user).await?;
    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}
