use slugmap_store::StoreError;
use slugmap_types::TypeError;
use thiserror::Error;

/// Every failure the mapping service reports.
///
/// Store errors never escape raw: they are folded into one of these four
/// kinds, each with a fixed HTTP status.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// A required slug, type, or identifier was missing or empty.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No record carries the requested identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store could not be reached, or an operation timed out.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// An insert hit a uniqueness constraint it could not resolve.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

impl ServiceError {
    /// HTTP status code for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::StoreUnavailable(_) | Self::ConstraintViolation(_) => 500,
        }
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidRequest(m)
            | Self::NotFound(m)
            | Self::StoreUnavailable(m)
            | Self::ConstraintViolation(m) => m,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConstraintViolation(m) => Self::ConstraintViolation(m),
            StoreError::Unavailable(m) => Self::StoreUnavailable(m),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<TypeError> for ServiceError {
    fn from(e: TypeError) -> Self {
        Self::InvalidRequest(e.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
