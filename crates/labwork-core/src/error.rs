use thiserror::Error;

/// Failure reported by an [`crate::EntityStore`] adapter.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum StoreError {
    /// A constraint enforced by the backend itself (foreign key, check, unique) rejected a write.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
    #[error("storage failure: {0}")]
    Backend(String),
}

/// Error taxonomy surfaced by every domain operation.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    /// Stable machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::IntegrityViolation(_) => "integrity_violation",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::IntegrityViolation(detail) => Self::IntegrityViolation(detail),
            StoreError::Backend(detail) => Self::Storage(detail),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
pub type StoreResult<T> = Result<T, StoreError>;
