use serde::Deserialize;

/// Result type returned by every upstream call.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status. `message` is the
    /// provider's own error message when the body carried one.
    #[error("{service} responded {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("document not found: {0}")]
    NotFound(String),
}

impl UpstreamError {
    /// The provider's message, verbatim, when the failure came from the provider.
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Google and OpenAI APIs both wrap failures as `{"error": {"message": ...}}`.
pub(crate) fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => String::from_utf8_lossy(body).trim().to_owned(),
    }
}
