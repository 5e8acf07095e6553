use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Trigger {trigger} has no `{attribute}` attribute")]
    MissingTargetAttribute { trigger: String, attribute: String },

    #[error("Invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("No element matches selector `{selector}`")]
    TargetNotFound { selector: String },

    #[error("Target {target} has no `{attribute}` attribute")]
    MissingSourceUrl { target: String, attribute: String },

    #[error("Invalid source URL `{value}`: {reason}")]
    InvalidSourceUrl { value: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GET {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Fetch task failed: {message}")]
    Task { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error in `{field}`: {message}")]
    Config { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Trigger, selector or source URL could not be resolved; no request was made.
    Resolve,
    Network,
    Config,
    Runtime,
}

impl LoaderError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LoaderError::MissingTargetAttribute { .. }
            | LoaderError::InvalidSelector { .. }
            | LoaderError::TargetNotFound { .. }
            | LoaderError::MissingSourceUrl { .. }
            | LoaderError::InvalidSourceUrl { .. } => ErrorCategory::Resolve,
            LoaderError::Http(_) | LoaderError::HttpStatus { .. } => ErrorCategory::Network,
            LoaderError::Config { .. } => ErrorCategory::Config,
            LoaderError::Task { .. } | LoaderError::Io(_) => ErrorCategory::Runtime,
        }
    }

    pub fn config(field: &str, message: impl Into<String>) -> Self {
        LoaderError::Config {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;
