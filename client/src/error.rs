use thiserror::Error;

/// Shown when the server gives no usable message
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// No session, or the session could not be refreshed
    #[error("Please log in to continue")]
    Unauthorized,

    /// The server answered with a non-success status
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Token storage error: {context}")]
    TokenStore {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text to put in front of a user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized | ApiError::Status { .. } => self.to_string(),
            _ => FALLBACK_MESSAGE.to_string(),
        }
    }
}
