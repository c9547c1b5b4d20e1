use explore_domain::ValidationError;
use explore_upstream::UpstreamError;
use salvo::http::{ParseError, StatusCode};
use salvo::prelude::*;
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

/// Body shared by every `{"message": ...}` reply.
#[derive(Debug, Serialize)]
pub struct Message<'a> {
    pub message: &'a str,
}

/// Failures answered to the browser. `Display` is the text it receives.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Email and password are required.")]
    MissingCredentials,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Username is already taken.")]
    UsernameTaken,

    #[error("User is not logged in.")]
    NotLoggedIn,

    #[error("Please log in to continue.")]
    Unauthenticated,

    #[error("You can only change your own {0}.")]
    Forbidden(&'static str),

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to fetch user data")]
    UserData,

    /// Chat relay failure, answered as `{"error": ...}`.
    #[error("{0}")]
    Completion(String),

    #[error("{0}")]
    Upstream(#[from] UpstreamError),

    #[error("Something went wrong on the server.")]
    Internal,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::MissingCredentials
            | Self::UsernameTaken
            | Self::NotLoggedIn
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(UpstreamError::NotFound(_)) => StatusCode::NOT_FOUND,
            // Rejections by a provider (EMAIL_EXISTS, WEAK_PASSWORD, ...) are the caller's fault.
            Self::Upstream(e) if e.status().is_some_and(|s| (400..500).contains(&s)) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::UserData | Self::Completion(_) | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Upstream(e) => e.provider_message().map_or_else(|| e.to_string(), str::to_owned),
            other => other.to_string(),
        }
    }
}

impl From<ParseError> for AppError {
    fn from(e: ParseError) -> Self {
        tracing::debug!(error = ?e, "unreadable request body");
        match e {
            ParseError::PayloadTooLarge => Self::BadRequest("Request body is too large.".to_owned()),
            _ => Self::BadRequest("Request body is malformed.".to_owned()),
        }
    }
}

#[derive(Serialize)]
struct CompletionFailure<'a> {
    error: &'a str,
}

#[async_trait]
impl Writer for AppError {
    async fn write(self, req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, path = %req.uri().path(), "request failed");
        } else {
            tracing::debug!(error = %self, path = %req.uri().path(), "request rejected");
        }
        let message = self.message();
        res.status_code(status);
        match self {
            Self::Completion(_) => res.render(Json(CompletionFailure { error: &message })),
            _ => res.render(Json(Message { message: &message })),
        }
    }
}
