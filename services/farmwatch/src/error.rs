//! Error types for the farmwatch service

/// Errors that can occur in the farmwatch service
#[derive(Debug, thiserror::Error)]
pub enum FarmwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Camera(String),
}

/// Result type alias for farmwatch operations
pub type Result<T> = std::result::Result<T, FarmwatchError>;
