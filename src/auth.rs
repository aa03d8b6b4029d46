use std::fmt;

use crate::error::{JenkinsError, Result};

/// Jenkins user name and API token (or password) sent as HTTP Basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    secret: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: secret.into(),
        }
    }

    /// Parses the `user:password` form accepted by `stop-builds --user`.
    ///
    /// Only the first `:` separates the two parts, so passwords may contain colons.
    pub fn parse(pair: &str) -> Result<Self> {
        let (user, secret) = pair.split_once(':').ok_or_else(|| {
            JenkinsError::Credentials("expected user and password separated by ':'".into())
        })?;

        if user.is_empty() {
            return Err(JenkinsError::Credentials("user name is empty".into()));
        }

        Ok(Self::new(user, secret))
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

// Keep the secret out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_and_password() {
        let creds = Credentials::parse("jenkins:s3cret").unwrap();
        assert_eq!(creds.user(), "jenkins");
        assert_eq!(creds.secret(), "s3cret");
    }

    #[test]
    fn test_parse_password_containing_colon() {
        let creds = Credentials::parse("jenkins:a:b:c").unwrap();
        assert_eq!(creds.user(), "jenkins");
        assert_eq!(creds.secret(), "a:b:c");
    }

    #[test]
    fn test_parse_without_separator() {
        let err = Credentials::parse("jenkins").unwrap_err();
        assert!(err.to_string().contains("separated by ':'"));
    }

    #[test]
    fn test_parse_empty_user() {
        assert!(Credentials::parse(":secret").is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = Credentials::new("jenkins", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("jenkins"));
        assert!(!debug.contains("hunter2"));
    }
}
