//! In-memory stand-in for a Candlepin server.
//!
//! [`RecordingApi`] keeps the users it has created and logs every call, so
//! tests can assert on both the outcome of a scenario and the exact calls the
//! steps made. Duplicate users are rejected with `409 Conflict` and bad logins
//! with `401 Unauthorized`, mirroring the live server.

use candlepin_steps::client::{CandlepinApi, ClientError, Credentials, Session};
use std::cell::RefCell;
use std::collections::HashMap;
use url::Url;

/// Base URL reported by sessions from [`RecordingApi`].
pub const FAKE_BASE_URL: &str = "http://candlepin.test/candlepin";

/// A call made against [`RecordingApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    /// `create_user(owner_id, username, password)`.
    CreateUser {
        /// Owner the user was created in.
        owner_id: String,
        /// Requested login.
        username: String,
        /// Requested password.
        password: String,
    },
    /// `connect(username, password)`.
    Connect {
        /// Login used.
        username: String,
        /// Password used.
        password: String,
    },
}

/// Recording [`CandlepinApi`] double.
#[derive(Debug, Default)]
pub struct RecordingApi {
    users: RefCell<HashMap<String, String>>,
    calls: RefCell<Vec<ApiCall>>,
}

impl RecordingApi {
    /// Create a server with no users.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a server that already knows `username`.
    #[must_use]
    pub fn with_existing_user(username: &str, password: &str) -> Self {
        let api = Self::new();
        api.users
            .borrow_mut()
            .insert(username.to_owned(), password.to_owned());
        api
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.borrow().clone()
    }

    /// Usernames passed to `create_user`, in order.
    #[must_use]
    pub fn created_users(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ApiCall::CreateUser { username, .. } => Some(username.clone()),
                ApiCall::Connect { .. } => None,
            })
            .collect()
    }

    /// Returns `true` when `username` exists on the fake server.
    #[must_use]
    pub fn has_user(&self, username: &str) -> bool {
        self.users.borrow().contains_key(username)
    }
}

fn rejection(method: &'static str, path: String, status: u16, reason: &str) -> ClientError {
    ClientError::Status {
        method,
        path,
        status,
        reason: reason.to_owned(),
        body: String::new(),
    }
}

impl CandlepinApi for RecordingApi {
    fn create_user(
        &self,
        owner_id: &str,
        username: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        self.calls.borrow_mut().push(ApiCall::CreateUser {
            owner_id: owner_id.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
        });
        let mut users = self.users.borrow_mut();
        if users.contains_key(username) {
            return Err(rejection(
                "POST",
                format!("/candlepin/owners/{owner_id}/users"),
                409,
                "Conflict",
            ));
        }
        users.insert(username.to_owned(), password.to_owned());
        Ok(())
    }

    fn connect(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        self.calls.borrow_mut().push(ApiCall::Connect {
            username: username.to_owned(),
            password: password.to_owned(),
        });
        let path = format!("/candlepin/users/{username}");
        if self.users.borrow().get(username).map(String::as_str) != Some(password) {
            return Err(rejection("GET", path, 401, "Unauthorized"));
        }
        let base_url = Url::parse(FAKE_BASE_URL).map_err(|err| ClientError::InvalidUrl {
            url: FAKE_BASE_URL.to_owned(),
            reason: err.to_string(),
        })?;
        Ok(Session::new(Credentials::new(username, password), base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn duplicate_user_is_a_conflict() {
        let api = RecordingApi::new();
        api.create_user("admin", "alice", "pw").expect("first create");
        let err = api
            .create_user("admin", "alice", "pw")
            .expect_err("duplicate should fail");
        assert_eq!(err.status(), Some(409));
        assert_eq!(api.created_users(), ["alice", "alice"]);
    }

    #[rstest]
    #[case("alice", "wrong")]
    #[case("nobody", "pw")]
    fn bad_login_is_unauthorised(#[case] username: &str, #[case] password: &str) {
        let api = RecordingApi::with_existing_user("alice", "pw");
        let err = api
            .connect(username, password)
            .expect_err("login should fail");
        assert_eq!(err.status(), Some(401));
    }

    #[rstest]
    fn known_user_gets_a_session() {
        let api = RecordingApi::with_existing_user("alice", "pw");
        let session = api.connect("alice", "pw").expect("login");
        assert_eq!(session.username(), "alice");
        assert_eq!(session.base_url().as_str(), FAKE_BASE_URL);
    }
}
