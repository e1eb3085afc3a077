use thiserror::Error;

/// Errors surfaced by the flow query pipeline, each mapped to an HTTP status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Malformed filter, time range or value; the caller must fix the request
    #[error("{0}")]
    UserInput(String),

    /// Loki could not be reached
    #[error("{0}")]
    BackendUnavailable(String),

    /// Loki rejected the query
    #[error("{0}")]
    BackendError(String),

    /// Loki answered with something this crate cannot handle
    #[error("{0}")]
    Internal(String),
}

impl FlowError {
    /// HTTP status matching this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UserInput(_) | Self::BackendError(_) => 400,
            Self::BackendUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Message without the variant
    pub fn message(&self) -> &str {
        match self {
            Self::UserInput(m) | Self::BackendUnavailable(m) | Self::BackendError(m) | Self::Internal(m) => m,
        }
    }

    /// Same error kind with `prefix` prepended to the message
    pub fn with_prefix(self, prefix: &str) -> Self {
        match self {
            Self::UserInput(m) => Self::UserInput(format!("{prefix}{m}")),
            Self::BackendUnavailable(m) => Self::BackendUnavailable(format!("{prefix}{m}")),
            Self::BackendError(m) => Self::BackendError(format!("{prefix}{m}")),
            Self::Internal(m) => Self::Internal(format!("{prefix}{m}")),
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}
