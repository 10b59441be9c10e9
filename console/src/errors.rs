//! Error types for the console

use std::time::Duration;

use thiserror::Error;

/// Main error type for the console
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// The backend rejected the session token (HTTP 401)
    #[error("Session expired: {0}")]
    AuthExpired(String),

    /// An authenticated call was attempted without a session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Non-2xx response or transport failure
    #[error("Request failed: {message}")]
    RequestFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// A user-triggered mutation failed
    #[error("{action} failed: {source}")]
    ActionFailed {
        action: String,
        #[source]
        source: Box<ConsoleError>,
    },

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ConsoleError {
    /// Wrap a failure of a user-triggered mutation
    pub fn action(action: impl Into<String>, source: ConsoleError) -> Self {
        ConsoleError::ActionFailed {
            action: action.into(),
            source: Box::new(source),
        }
    }

    /// HTTP status of the failed response, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ConsoleError::AuthExpired(_) => Some(401),
            ConsoleError::RequestFailed { status, .. } => *status,
            ConsoleError::ActionFailed { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Whether the failure was a session expiry, directly or inside an action
    pub fn is_auth_expired(&self) -> bool {
        match self {
            ConsoleError::AuthExpired(_) => true,
            ConsoleError::ActionFailed { source, .. } => source.is_auth_expired(),
            _ => false,
        }
    }
}
