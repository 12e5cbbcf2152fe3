/// Errors from mapping store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or the session was lost.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A connection attempt or store operation exceeded its time budget.
    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    /// An insert collided with an existing identifier or (slug, type) key.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other failure reported by the backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// The connection string names no known backend or is malformed.
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),
}

impl StoreError {
    /// Whether the error is a uniqueness conflict rather than a transport or
    /// storage failure.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
