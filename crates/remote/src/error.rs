use thiserror::Error;

/// Errors surfaced by the remote quiz service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("quiz service unavailable: {0}")]
    Unavailable(String),

    #[error("quiz service returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("quiz service rejected the request: {0}")]
    Rejected(String),

    #[error("quiz service response carried no data")]
    MissingData,

    #[error("could not decode quiz service response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error(transparent)]
    Invalid(#[from] quiz_core::Error),
}

impl ApiError {
    /// A short, candidate-presentable message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected(message) => message.clone(),
            ApiError::Http(_) | ApiError::Unavailable(_) => {
                "Could not reach the quiz service.".to_owned()
            }
            other => other.to_string(),
        }
    }
}
