//! Accounts and the profile document kept for each of them.
use serde::{Deserialize, Serialize};

use crate::{Result, ValidationError, require};

/// Minimum password length accepted by the identity provider.
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Profile stored under `users/{id}` and handed to the browser after login.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub name: String,
}

/// Login form.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    /// Both fields are present and not blank.
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

/// Sign up form.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    /// URL returned by a previous avatar upload.
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Registration {
    pub fn validate(&self) -> Result<()> {
        require("Username", &self.username)?;
        require("E-mail", &self.email)?;
        require("Password", &self.password)?;
        require("Name", &self.name)?;
        if !self.email.contains('@') {
            return Err(ValidationError::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_CHARS));
        }
        Ok(())
    }

    /// Profile for the account the identity provider created.
    pub fn into_user(self, id: impl Into<String>) -> User {
        User {
            id: id.into(),
            username: self.username.trim().to_owned(),
            email: self.email.trim().to_owned(),
            avatar: self.avatar.unwrap_or_default(),
            name: self.name.trim().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            username: "testuser".into(),
            email: "test@example.com".into(),
            password: "password123".into(),
            name: "Test User".into(),
            avatar: Some("/uploaded-avatar.png".into()),
        }
    }

    #[test]
    fn test_registration_valid() {
        assert_eq!(registration().validate(), Ok(()));
    }

    #[test]
    fn test_registration_missing_fields() {
        let mut form = registration();
        form.username = "  ".into();
        assert_eq!(form.validate(), Err(ValidationError::Required("Username")));

        let mut form = registration();
        form.name.clear();
        assert_eq!(form.validate(), Err(ValidationError::Required("Name")));
    }

    #[test]
    fn test_registration_password_and_email() {
        let mut form = registration();
        form.password = "12345".into();
        assert_eq!(form.validate(), Err(ValidationError::PasswordTooShort(6)));

        let mut form = registration();
        form.email = "not-an-email".into();
        assert_eq!(form.validate(), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn test_into_user() {
        let user = registration().into_user("test-user-id");
        assert_eq!(
            user,
            User {
                id: "test-user-id".into(),
                username: "testuser".into(),
                email: "test@example.com".into(),
                avatar: "/uploaded-avatar.png".into(),
                name: "Test User".into(),
            }
        );
    }

    #[test]
    fn test_credentials_complete() {
        let creds: Credentials = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
        assert!(!creds.is_complete());
        let creds: Credentials = serde_json::from_str(r#"{"email":"a@b.c","password":"x"}"#).unwrap();
        assert!(creds.is_complete());
    }
}
