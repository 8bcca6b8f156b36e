use axum::extract::rejection::JsonRejection;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use omdb_core::error::CoreError;
use omdb_core::validator::FieldErrors;
use omdb_db::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`StoreError`] for persistence
/// failures, and adds HTTP-specific variants. Implements [`IntoResponse`] to
/// produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `omdb_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A classified failure from the store layer.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The path exists but does not accept this method.
    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// The error every unknown or malformed resource ID maps to.
    pub fn not_found() -> Self {
        AppError::Store(StoreError::RecordNotFound)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, fields) = match &self {
            // --- CoreError variants ---
            AppError::Core(CoreError::Validation(fields)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(fields.clone()),
            ),

            // --- Store errors ---
            AppError::Store(err) => {
                if err.is_interrupted() {
                    tracing::warn!(error = %err, "Request abandoned by the store");
                }
                classify_store_error(err)
            }

            // --- HTTP-specific errors ---
            AppError::MethodNotAllowed(_) => (
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_ALLOWED",
                self.to_string(),
                None,
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = match fields {
            Some(fields) => json!({
                "error": message,
                "code": code,
                "fields": fields,
            }),
            None => json!({
                "error": message,
                "code": code,
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a store error into an HTTP status, error code, message and
/// optional field errors.
///
/// - `RecordNotFound` maps to 404.
/// - `EditConflict` maps to 409.
/// - `DuplicateEmail` maps to 422 as a field error on `email`.
/// - Deadline and cancellation failures map to 503.
/// - Everything else maps to 500 with a sanitized message.
fn classify_store_error(
    err: &StoreError,
) -> (StatusCode, &'static str, String, Option<FieldErrors>) {
    match err {
        StoreError::RecordNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "the requested resource could not be found".to_string(),
            None,
        ),
        StoreError::EditConflict => (
            StatusCode::CONFLICT,
            "EDIT_CONFLICT",
            err.to_string(),
            None,
        ),
        StoreError::DuplicateEmail => {
            let mut fields = FieldErrors::default();
            fields.0.insert("email".to_string(), err.to_string());
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(fields),
            )
        }
        StoreError::Timeout(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "TIMEOUT",
            "the server could not complete the request in time".to_string(),
            None,
        ),
        StoreError::Cancelled => (
            StatusCode::SERVICE_UNAVAILABLE,
            "CANCELLED",
            "the request was cancelled".to_string(),
            None,
        ),
        StoreError::Database(db_err) => {
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            )
        }
    }
}
