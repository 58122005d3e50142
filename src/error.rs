use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-2xx answer from the game service. `message` is the body's `error` field
    /// when the service supplied one.
    #[error("Service rejected request ({status}): {}", .message.as_deref().unwrap_or("no reason given"))]
    Service { status: u16, message: Option<String> },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Reason text supplied by the service, if any.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            AppError::Service { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
