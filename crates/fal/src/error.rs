use thiserror::Error;

/// Errors from the upstream inference and storage APIs.
#[derive(Debug, Error)]
pub enum FalError {
    /// No API key is configured; checked before any I/O happens.
    #[error("FAL_KEY is not configured")]
    MissingCredentials,

    /// The request never produced an upstream response.
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("Upstream API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Every upload in a batch failed.
    #[error("All uploads failed: {0}")]
    BatchFailed(String),
}

impl FalError {
    /// Upstream HTTP status, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::MissingCredentials | Self::Request(_) | Self::BatchFailed(_) => None,
        }
    }

    /// Authentication / authorization / unknown-endpoint failures.
    pub fn is_auth(&self) -> bool {
        matches!(self.status(), Some(401 | 403 | 404))
    }

    /// The upstream rejected the payload itself.
    pub fn is_validation(&self) -> bool {
        matches!(self.status(), Some(422))
    }

    /// Upstream body for statuses whose detail is forwarded verbatim.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => Some(body),
            Self::MissingCredentials | Self::Request(_) | Self::BatchFailed(_) => None,
        }
    }
}
