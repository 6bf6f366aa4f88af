use std::io;
use thiserror::Error;

/// Failures of a single list fetch or mutation request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid page")]
    InvalidPage,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    pub const INVALID_PAGE_MARKER: &'static str = "Invalid page";

    /// Builds the error for a rejected request, recognizing the backend's
    /// "Invalid page" signal
    pub fn from_rejection(status: u16, message: String) -> Self {
        if message.contains(Self::INVALID_PAGE_MARKER) {
            FetchError::InvalidPage
        } else {
            FetchError::Http { status, message }
        }
    }

    /// The string handed to the notification layer
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Network(_) => "Network error".to_owned(),
            FetchError::Http { message, .. } => message.clone(),
            FetchError::InvalidPage => Self::INVALID_PAGE_MARKER.to_owned(),
            FetchError::MalformedResponse(_) => "Unexpected response from server".to_owned(),
        }
    }

    /// Errors the container recovers from without telling the user
    pub fn is_locally_recoverable(&self) -> bool {
        matches!(
            self,
            FetchError::InvalidPage | FetchError::MalformedResponse(_)
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum CampusError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] Box<figment::Error>),

    #[error("Logger error: {0}")]
    LoggerError(#[from] flexi_logger::FlexiLoggerError),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("{0}")]
    FetchError(#[from] FetchError),

    #[error("{0}")]
    Reported(String), // Already shown to the user through the notifier

    #[error("Error: {0}")]
    Error(String), // Allows custom application errors
}

impl CampusError {
    /// True when the notifier has already shown this failure to the user
    pub fn already_reported(&self) -> bool {
        matches!(self, CampusError::Reported(_) | CampusError::FetchError(_))
    }
}
