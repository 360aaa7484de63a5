use std::error::Error as StdError;

use crate::types::PlatformType;

/// Crate-wide result type for platform client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors shared across platform clients.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The instance's credentials are incomplete; the client is degraded to
    /// a disabled state and every call short-circuits with this error.
    #[error("{platform} is not configured: {message}")]
    NotConfigured {
        platform: PlatformType,
        message: String,
    },

    /// Input payload or parameter is invalid.
    #[error("invalid platform input: {message}")]
    InvalidInput { message: String },

    /// The remote API answered with a non-success status.
    #[error("{platform} api error ({status}): {body}")]
    Api {
        platform: PlatformType,
        status: u16,
        body: String,
    },

    /// The request never produced a usable response (network, timeout, TLS).
    #[error("{platform} request failed: {context}: {source}")]
    Transport {
        platform: PlatformType,
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn not_configured(platform: PlatformType, message: impl std::fmt::Display) -> Self {
        Self::NotConfigured {
            platform,
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn api(platform: PlatformType, status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            platform,
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn transport(
        platform: PlatformType,
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            platform,
            context: context.into(),
            source: Box::new(source),
        }
    }
}
