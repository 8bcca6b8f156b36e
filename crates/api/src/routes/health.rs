use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    pub system_info: SystemInfo,
    /// Whether the database is reachable.
    pub db_healthy: bool,
}

/// Deployment details reported under `system_info`.
#[derive(Serialize)]
pub struct SystemInfo {
    /// Environment label from `APP_ENV`.
    pub environment: String,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

/// GET /v1/healthcheck -- returns service and database health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = omdb_db::health_check(&state.pool).await.is_ok();

    let status = if db_healthy { "available" } else { "degraded" };

    Json(HealthResponse {
        status,
        system_info: SystemInfo {
            environment: state.config.env.clone(),
            version: env!("CARGO_PKG_VERSION"),
        },
        db_healthy,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/healthcheck", get(health_check))
}
