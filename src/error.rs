use std::fmt;

use thiserror::Error;

/// Error types for the authorization and keyword query flows
#[derive(Error, Debug)]
pub enum KeywordIdeasError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Request ID \"{request_id}\" failed, status \"{code}\"{}", format_details(.details))]
    ExternalService {
        request_id: String,
        code: String,
        details: Vec<FieldError>,
    },

    #[error("HTTP error: {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Callback server error: {0}")]
    CallbackServer(String),

    #[cfg(feature = "browser")]
    #[error("Failed to open browser: {0}")]
    BrowserLaunch(String),
}

/// A single field-level failure reported by the advertising API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub message: String,
    /// Names of the request fields the failure points at, outermost first
    pub field_path: Vec<String>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for field in &self.field_path {
            write!(f, " (on field: {})", field)?;
        }
        Ok(())
    }
}

fn format_details(details: &[FieldError]) -> String {
    if details.is_empty() {
        return String::new();
    }
    let joined = details
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!(": {}", joined)
}

/// Result type alias for keyword-ideas operations
pub type Result<T> = std::result::Result<T, KeywordIdeasError>;
