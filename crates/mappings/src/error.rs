/// Crate-wide result type for mapping operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed mapping errors. Validation/conflict/not-found propagate to the
/// administrative caller; store errors wrap the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl Error {
    #[must_use]
    pub fn validation(message: impl std::fmt::Display) -> Self {
        Self::Validation {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl std::fmt::Display) -> Self {
        Self::Conflict {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what: what.to_string(),
        }
    }
}
