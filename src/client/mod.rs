//! Candlepin API collaborator used by the step handlers.
//!
//! Steps only ever see the [`CandlepinApi`] trait so scenarios can run
//! against a live server through [`HttpCandlepin`] or against an in-memory
//! double in tests.

mod error;
mod http;

pub use error::ClientError;
pub use http::{ClientConfig, DEFAULT_BASE_URL, HttpCandlepin};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fmt;
use url::Url;

/// Remote operations the user steps depend on.
pub trait CandlepinApi {
    /// Create `username` with `password` inside the owner `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the server rejects the user (for
    /// example because it already exists) or cannot be reached.
    fn create_user(&self, owner_id: &str, username: &str, password: &str)
    -> Result<(), ClientError>;

    /// Authenticate as `username` and return a session handle.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when authentication fails or the server
    /// cannot be reached.
    fn connect(&self, username: &str, password: &str) -> Result<Session, ClientError>;
}

/// Username and password pair sent with HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Bundle a username and password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Secret half of the pair.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn basic_auth_header(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .finish()
    }
}

/// Authenticated handle returned by [`CandlepinApi::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    credentials: Credentials,
    base_url: Url,
}

impl Session {
    /// Create a session for `credentials` against `base_url`.
    #[must_use]
    pub const fn new(credentials: Credentials, base_url: Url) -> Self {
        Self {
            credentials,
            base_url,
        }
    }

    /// User the session is authenticated as.
    #[must_use]
    pub fn username(&self) -> &str {
        self.credentials.username()
    }

    /// Credentials the session authenticates with.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Server the session talks to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_header_encodes_user_and_password() {
        let credentials = Credentials::new("admin", "admin");
        assert_eq!(credentials.basic_auth_header(), "Basic YWRtaW46YWRtaW4=");
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials::new("alice", "hunter2");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("alice"), "username missing: {rendered}");
        assert!(!rendered.contains("hunter2"), "password leaked: {rendered}");
    }
}
