//! Domain error types.

use thiserror::Error;

use crate::order::OrderStatus;
use crate::ports::RepositoryError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced resource does not exist (or is not visible to the caller).
    #[error("{entity} not found")]
    NotFound { entity: &'static str, key: String },

    /// Malformed or out-of-range input.
    #[error("{0}")]
    InvalidInput(String),

    /// Order placement was attempted without cart lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A concurrent write or a uniqueness constraint prevented the operation.
    #[error("{0}")]
    Conflict(String),

    /// The requested order status is not reachable from the current one.
    #[error("Invalid status transition: cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Credentials were missing, wrong, expired or revoked.
    #[error("{0}")]
    Unauthorized(String),

    /// The storage backend failed.
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        DomainError::InvalidInput(message.into())
    }
}

impl From<RepositoryError> for DomainError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::VersionConflict { .. }
            | RepositoryError::StateConflict { .. }
            | RepositoryError::Duplicate { .. } => DomainError::Conflict(err.to_string()),
            other => DomainError::Repository(other),
        }
    }
}
