//! Blocking HTTP binding of [`CandlepinApi`].
//!
//! Requests carry JSON bodies and HTTP basic authentication. Only `200 OK`
//! and `204 No Content` count as success; every other status is surfaced as
//! [`ClientError::Status`].

use super::{CandlepinApi, ClientError, Credentials, Session};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Server location used when no URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/candlepin";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for [`HttpCandlepin`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Candlepin API, e.g. `http://localhost:8080/candlepin`.
    pub base_url: String,
    /// Account used for administrative calls such as user creation.
    pub admin: Credentials,
    /// Upper bound on a whole request.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            admin: Credentials::new("admin", "admin"),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Method {
    Get,
    Post,
}

impl Method {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// [`CandlepinApi`] implementation speaking to a live server.
#[derive(Debug)]
pub struct HttpCandlepin {
    agent: ureq::Agent,
    base_url: Url,
    admin: Credentials,
}

impl HttpCandlepin {
    /// Build a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] when the base URL does not parse or
    /// cannot carry path segments.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = parse_base_url(&config.base_url)?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(IO_TIMEOUT)
            .timeout_write(IO_TIMEOUT)
            .timeout(config.timeout)
            .build();
        Ok(Self {
            agent,
            base_url,
            admin: config.admin.clone(),
        })
    }

    /// Base URL every request path is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `segments` below the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn send(
        &self,
        method: Method,
        segments: &[&str],
        credentials: &Credentials,
        body: Option<&Value>,
    ) -> Result<Option<Value>, ClientError> {
        let url = self.endpoint(segments);
        let path = url.path().to_owned();
        debug!(
            method = method.as_str(),
            url = %redacted(&url),
            user = credentials.username(),
            "sending Candlepin request"
        );
        let request = self
            .agent
            .request(method.as_str(), url.as_str())
            .set("Accept", "application/json")
            .set("Authorization", &credentials.basic_auth_header());
        let result = match body {
            Some(value) => {
                let encoded = serde_json::to_string(value)?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&encoded)
            }
            None => request.call(),
        };
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                return Err(status_error(method, path, status, response));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(ClientError::Transport {
                    method: method.as_str(),
                    path,
                    source: Box::new(transport),
                });
            }
        };
        let status = response.status();
        if !matches!(status, 200 | 204) {
            return Err(status_error(method, path, status, response));
        }
        debug!(status, path = %path, "Candlepin request succeeded");
        let text = response
            .into_string()
            .map_err(|source| ClientError::Io {
                path: path.clone(),
                source,
            })?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }
}

impl CandlepinApi for HttpCandlepin {
    fn create_user(
        &self,
        owner_id: &str,
        username: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        let body = json!({ "username": username, "password": password });
        self.send(
            Method::Post,
            &["owners", owner_id, "users"],
            &self.admin,
            Some(&body),
        )?;
        Ok(())
    }

    fn connect(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        let credentials = Credentials::new(username, password);
        self.send(Method::Get, &["users", username], &credentials, None)?;
        Ok(Session::new(credentials, self.base_url.clone()))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|err| ClientError::InvalidUrl {
        url: raw.to_owned(),
        reason: err.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidUrl {
            url: raw.to_owned(),
            reason: String::from("expected an http or https URL"),
        });
    }
    Ok(url)
}

fn status_error(method: Method, path: String, status: u16, response: ureq::Response) -> ClientError {
    let reason = response.status_text().to_owned();
    let body = response.into_string().unwrap_or_default();
    ClientError::Status {
        method: method.as_str(),
        path,
        status,
        reason,
        body,
    }
}

/// `url` without its userinfo password, for logging.
fn redacted(url: &Url) -> Url {
    let mut shown = url.clone();
    match shown.set_password(None) {
        Ok(()) => shown,
        Err(()) => url.clone(),
    }
}
