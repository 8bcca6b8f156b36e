use std::time::Duration;

/// Failure classification for every store operation.
///
/// Classification happens once, inside the repository; callers only ever
/// see one of these variants. Nothing is retried at this layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row with the requested ID, or the ID is outside the key space.
    #[error("record not found")]
    RecordNotFound,

    /// A versioned update matched zero rows: the record changed (or was
    /// removed) since the caller read it. Re-read and retry.
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    /// The `users.email` unique constraint rejected an insert or update.
    #[error("a user with this email address already exists")]
    DuplicateEmail,

    #[error("database operation exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("database operation cancelled by caller")]
    Cancelled,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// `true` for deadline and cancellation failures, which callers may
    /// want to back off from differently than from hard storage faults.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, StoreError::Timeout(_) | StoreError::Cancelled)
    }
}
