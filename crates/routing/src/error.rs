use switchboard_platforms::PlatformType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The payload could not be parsed as this platform's webhook format.
    /// The only broker error that maps to a 4xx at the HTTP boundary.
    #[error("invalid {origin} payload: {source}")]
    InvalidPayload {
        origin: PlatformType,
        #[source]
        source: serde_json::Error,
    },

    /// The platform does not deliver webhooks (Dify answers arrive
    /// synchronously inside the forward call).
    #[error("{0} does not deliver webhooks")]
    UnsupportedOrigin(PlatformType),

    /// Mapping or link persistence failed mid-route.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
