use thiserror::Error;

/// Failure of a single backend call.
///
/// The sync layer treats every variant the same way: the cycle failed and the
/// next poll retries.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("{message}")]
    Backend { message: String },
    #[error("response carried no payload")]
    MissingPayload,
}

impl ApiError {
    pub fn backend(message: impl Into<String>) -> Self {
        ApiError::Backend {
            message: message.into(),
        }
    }
}
