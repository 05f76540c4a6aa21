use thiserror::Error;

/// Message shown when a scan is requested without a file or a URL.
pub const MISSING_INPUT_MESSAGE: &str = "Please select a file or enter a URL.";

/// Everything that can end a submit/poll session.
///
/// `Display` is what the rendered error state shows after `"Error: "`; the
/// HTTP variant prints only `"<status> <status text>"`.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Neither a file nor a URL was supplied. Raised before any request.
    #[error("{0}")]
    Validation(String),

    /// The backend answered with a non-2xx status.
    ///
    /// `status_text` is the canonical reason phrase for `status`, not the
    /// phrase the server sent.
    #[error("{status} {status_text}")]
    Http {
        endpoint_url: String,
        status: u16,
        status_text: String,
    },

    /// Connection failures, timeouts and other transport problems.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response whose body is not the JSON we expect.
    #[error("unexpected response from {endpoint_url}: {message}")]
    MalformedResponse {
        endpoint_url: String,
        message: String,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid server address: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Bad scheme: {scheme}")]
    BadScheme { scheme: String },
}

impl ScanError {
    pub fn missing_input() -> Self {
        ScanError::Validation(MISSING_INPUT_MESSAGE.to_string())
    }

    /// Builds an HTTP error, filling the status text from the canonical reason
    /// phrase of `status`.
    pub fn http(endpoint_url: impl Into<String>, status: u16) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();
        ScanError::Http {
            endpoint_url: endpoint_url.into(),
            status,
            status_text,
        }
    }

    pub fn malformed(endpoint_url: impl Into<String>, message: impl Into<String>) -> Self {
        ScanError::MalformedResponse {
            endpoint_url: endpoint_url.into(),
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ScanError::Validation(_))
    }
}
