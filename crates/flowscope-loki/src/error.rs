use thiserror::Error;

/// Errors raised while building or using the Loki transport
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid tenant id '{0}': not a valid header value")]
    InvalidTenant(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Failure reported by another `HttpClient` implementation
    #[error("{0}")]
    Transport(String),
}
