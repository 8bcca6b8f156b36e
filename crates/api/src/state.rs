use std::sync::Arc;

use omdb_db::Stores;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: omdb_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Repositories sharing `pool` and the per-operation query deadline.
    pub stores: Stores,
}

impl AppState {
    /// Repositories bound to a fresh cancellation token, plus the guard that
    /// cancels it.
    ///
    /// Keep the guard alive for the duration of the handler: if the client
    /// disconnects, axum drops the handler future, the guard fires, and any
    /// in-flight store call is aborted.
    pub fn request_stores(&self) -> (Stores, DropGuard) {
        let cancel = CancellationToken::new();
        let stores = self.stores.with_cancellation(cancel.clone());
        (stores, cancel.drop_guard())
    }
}
