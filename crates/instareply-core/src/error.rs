/// Errors from opening storage or running the server.
#[derive(Debug, thiserror::Error)]
pub enum InstareplyError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to open storage at {path}: {message}")]
    Open { path: String, message: String },

    #[error("Failed to read key {key}: {message}")]
    Read { key: String, message: String },

    #[error("Failed to write key {key}: {message}")]
    Write { key: String, message: String },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Failure to load the persisted profile collection.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Malformed profile data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors surfaced at the relay boundary.
///
/// Each variant carries the message shown to the caller. Provider details
/// are logged where the error is produced and never end up in here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("{0}")]
    Internal(String),
}

impl RelayError {
    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Validation(_) => 400,
            RelayError::Configuration(_) | RelayError::Internal(_) => 500,
            RelayError::Upstream { status, .. } => *status,
        }
    }

    /// Public message for the `{"error": ...}` body.
    pub fn message(&self) -> &str {
        match self {
            RelayError::Validation(m) | RelayError::Configuration(m) | RelayError::Internal(m) => m,
            RelayError::Upstream { message, .. } => message,
        }
    }
}

pub type Result<T> = std::result::Result<T, InstareplyError>;
