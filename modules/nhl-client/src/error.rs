use thiserror::Error;

pub type Result<T> = std::result::Result<T, NhlError>;

#[derive(Debug, Error)]
pub enum NhlError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for NhlError {
    fn from(err: reqwest::Error) -> Self {
        NhlError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for NhlError {
    fn from(err: serde_json::Error) -> Self {
        NhlError::Parse(err.to_string())
    }
}
