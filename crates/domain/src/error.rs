/// Rejections of user supplied data.
///
/// The `Display` output is what the browser shows, so it is written for people.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required.")]
    Required(&'static str),
    #[error("{field} must be at most {max} characters.")]
    TooLong { field: &'static str, max: usize },
    #[error("Password must be at least {0} characters.")]
    PasswordTooShort(usize),
    #[error("Email address is invalid.")]
    InvalidEmail,
    #[error("You can upload up to {0} images")]
    TooManyImages(usize),
    #[error("Nothing to update.")]
    EmptyPatch,
}
