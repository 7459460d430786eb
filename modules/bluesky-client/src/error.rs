use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlueskyError>;

#[derive(Debug, Error)]
pub enum BlueskyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BlueskyError {
    fn from(err: reqwest::Error) -> Self {
        BlueskyError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for BlueskyError {
    fn from(err: serde_json::Error) -> Self {
        BlueskyError::Parse(err.to_string())
    }
}
