//! Per-scenario state shared by the step handlers.
//!
//! A fresh [`ScenarioContext`] is built for every scenario and passed by
//! mutable reference to each handler in turn, so steps communicate only
//! through it.

use crate::client::{CandlepinApi, Session};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// State threaded through the steps of one scenario.
pub struct ScenarioContext {
    api: Rc<dyn CandlepinApi>,
    /// Owner that new users are created in.
    pub owner_id: String,
    /// User most recently provisioned by a step.
    pub username: Option<String>,
    /// Password of [`Self::username`].
    pub password: Option<String>,
    sessions: HashMap<String, Session>,
}

impl ScenarioContext {
    /// Start an empty context for `owner_id` backed by `api`.
    #[must_use]
    pub fn new(api: Rc<dyn CandlepinApi>, owner_id: impl Into<String>) -> Self {
        Self {
            api,
            owner_id: owner_id.into(),
            username: None,
            password: None,
            sessions: HashMap::new(),
        }
    }

    /// Collaborator the steps call into.
    #[must_use]
    pub fn api(&self) -> &dyn CandlepinApi {
        self.api.as_ref()
    }

    /// Keep `session`, replacing any earlier one for the same user.
    pub fn store_session(&mut self, session: Session) {
        self.sessions
            .insert(session.username().to_owned(), session);
    }

    /// Session established for `username`, if any.
    #[must_use]
    pub fn session_for(&self, username: &str) -> Option<&Session> {
        self.sessions.get(username)
    }

    /// Number of users with an active session.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("owner_id", &self.owner_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***REDACTED***"))
            .field("sessions", &self.sessions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
