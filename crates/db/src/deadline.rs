//! Per-call deadline and cancellation for store operations.
//!
//! Every repository method wraps its database work in [`QueryScope::run`].
//! The scope starts when `run` is called and ends when it returns, so the
//! deadline never spans two operations. When either the deadline elapses or
//! the caller's token fires, the in-flight future is dropped along with its
//! connection handle and any open result stream.
//!
//! Dropping the future does not stop a statement Postgres is already
//! running. Two things cover that: writes run in a transaction committed
//! inside the scope, so an interrupted write is rolled back, and pools from
//! [`crate::create_pool`] set a matching server-side `statement_timeout`.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// Default deadline for a single store operation.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Deadline plus cancellation signal applied to each store call.
#[derive(Debug, Clone)]
pub struct QueryScope {
    timeout: Duration,
    cancel: CancellationToken,
}

impl Default for QueryScope {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_TIMEOUT)
    }
}

impl QueryScope {
    /// A scope with the given per-call deadline and no external cancellation.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Same deadline, additionally aborted when `cancel` fires.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            timeout: self.timeout,
            cancel,
        }
    }

    /// Drive `fut` to completion unless the deadline or cancellation wins.
    ///
    /// Cancellation is checked first, so an already-cancelled scope never
    /// starts the operation.
    pub async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::warn!(op, "Store operation cancelled by caller");
                Err(StoreError::Cancelled)
            }
            result = tokio::time::timeout(self.timeout, fut) => match result {
                Ok(out) => out,
                Err(_) => {
                    tracing::warn!(
                        op,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Store operation exceeded deadline"
                    );
                    Err(StoreError::Timeout(self.timeout))
                }
            },
        }
    }
}
