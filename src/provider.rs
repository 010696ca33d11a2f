//! Search provider trait and boundary types.
//!
//! The provider is the authenticated third-party API that serves search
//! results. Everything the collector and session manager need from it goes
//! through [`SearchProvider`], so the core loop can run against the HTTP
//! adapter in production and against scripted doubles in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{Cursor, Ranking, ResultPage};

/// Whether a provider failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Temporary condition (network, timeout, rate limit, server error).
    Transient,
    /// Retrying cannot help (rejected credentials, revoked session, other 4xx).
    Fatal,
}

/// Errors surfaced by a [`SearchProvider`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// HTTP 429.
    #[error("rate limited (status {status})")]
    RateLimited { status: u16 },

    /// HTTP 401/403: the session or credentials were refused.
    #[error("unauthorized (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Any other non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Classify this error for the retry policy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Fatal,
            Self::Api { status: 408, .. } => ErrorKind::Transient,
            Self::Api { status, .. } if *status >= 400 && *status < 500 => ErrorKind::Fatal,
            Self::Network(_) | Self::RateLimited { .. } | Self::Api { .. } | Self::Decode(_) => {
                ErrorKind::Transient
            }
        }
    }

    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient)
    }

    /// Build an error from a non-success HTTP status and its body.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status, message },
            429 => Self::RateLimited { status },
            _ => Self::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Authentication state bound to one account.
///
/// Persisted as JSON by [`SessionStore`](crate::session::SessionStore) and
/// never modified once a run has acquired it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub cookies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_name: Option<String>,
}

impl Session {
    /// Render the cookies as a `Cookie` header value.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Account returned by a successful session probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Login credentials: account identifier, recovery email and password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated search API.
///
/// Calls are issued one at a time; implementations need not support
/// concurrent requests on the same session.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Log in and return the fresh session state.
    async fn login(&self, credentials: &Credentials) -> ProviderResult<Session>;

    /// Lightweight authenticated call used to validate a loaded session.
    async fn probe(&self, session: &Session) -> ProviderResult<Identity>;

    /// Fetch the first page of results for `term`.
    async fn search(
        &self,
        session: &Session,
        term: &str,
        ranking: Ranking,
    ) -> ProviderResult<ResultPage>;

    /// Fetch the page a previous [`ResultPage::next`] pointed to.
    async fn next_page(&self, session: &Session, cursor: &Cursor) -> ProviderResult<ResultPage>;
}
