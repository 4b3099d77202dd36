use shared::error::UnknownVariant;
use thiserror::Error;

pub const GENERIC_UPLOAD_ERROR: &str = "An upload error occurred.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown configuration field: {0}")]
    UnknownField(String),
    #[error("{field} expects a whole number, got {raw:?}")]
    NotANumber { field: &'static str, raw: String },
    #[error(transparent)]
    UnknownValue(#[from] UnknownVariant),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Please select a file and wait for server connection.")]
    MissingFileOrConnection,
    #[error("an analysis is in progress; wait for it to finish")]
    Busy,
    #[error("the previous analysis has finished; reset before starting again")]
    NeedsReset,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("analysis service rejected the upload ({status}): {}", message.as_deref().unwrap_or("no details"))]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("upload transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to read selected file: {0}")]
    File(#[from] std::io::Error),
}

impl SubmissionError {
    /// Text shown to the user: the service's own explanation when it sent
    /// one, otherwise a generic upload failure.
    pub fn display_message(&self) -> String {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => GENERIC_UPLOAD_ERROR.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("server_url must start with http:// or https://, got {0}")]
    UnsupportedScheme(String),
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("connection to the analysis service is closed")]
    Closed,
}
