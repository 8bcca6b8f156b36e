use crate::validator::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// One or more field-level constraint violations. Always recoverable.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
}
