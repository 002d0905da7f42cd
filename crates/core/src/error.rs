#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Never raised by the engines. Reserved for storage layers that wrap
    /// them, e.g. a second level record for the same user.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl CoreError {
    /// Whether the error was caused by caller-supplied input, as opposed to
    /// a missing record or an engine fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }
}
