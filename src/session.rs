//! Session acquisition and persistence.
//!
//! A run starts by loading the persisted session and validating it with a
//! probe call. Only when that fails does it fall back to a fresh login with
//! credentials from the environment, and only a fresh login writes the
//! session file.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, ResultExt, XhError};
use crate::provider::{Credentials, SearchProvider, Session};

/// Environment variable holding the account identifier.
pub const ENV_USERNAME: &str = "TWITTER_USERNAME";
/// Environment variable holding the recovery email.
pub const ENV_EMAIL: &str = "TWITTER_EMAIL";
/// Environment variable holding the password.
pub const ENV_PASSWORD: &str = "TWITTER_PASSWORD";

/// How the session handed to the collector was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// Loaded from disk and validated.
    Reused,
    /// Produced by a fresh login and saved.
    FreshLogin,
}

/// JSON file holding one account's session state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// session document.
    pub fn load(&self) -> Result<Session> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| XhError::path_error("read session", &self.path, e))?;
        let session: Session =
            serde_json::from_str(&content).map_err(|e| XhError::InvalidSession {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        if session.cookies.is_empty() {
            return Err(XhError::InvalidSession {
                path: self.path.clone(),
                reason: "no cookies stored".to_string(),
            });
        }
        Ok(session)
    }

    /// Persist a session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// file cannot be written.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| XhError::path_error("create directory", parent, e))?;
            }
        }
        let content = serde_json::to_string_pretty(session).context("serializing session")?;
        std::fs::write(&self.path, content)
            .map_err(|e| XhError::path_error("write session", &self.path, e))?;
        info!(path = %self.path.display(), "Saved session");
        Ok(())
    }
}

/// Read the three credential values from the environment.
///
/// # Errors
///
/// Returns [`XhError::MissingCredentials`] naming every unset or empty
/// variable.
pub fn credentials_from_env() -> Result<Credentials> {
    credentials_from(|var| std::env::var(var).ok())
}

/// Build credentials from an arbitrary lookup (env, config, test table).
///
/// # Errors
///
/// Returns [`XhError::MissingCredentials`] naming every missing value.
pub fn credentials_from<F>(lookup: F) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |var: &'static str, missing: &mut Vec<&'static str>| {
        let value = lookup(var).filter(|v| !v.trim().is_empty());
        if value.is_none() {
            missing.push(var);
        }
        value.unwrap_or_default()
    };

    let mut missing = Vec::new();
    let username = get(ENV_USERNAME, &mut missing);
    let email = get(ENV_EMAIL, &mut missing);
    let password = get(ENV_PASSWORD, &mut missing);

    if !missing.is_empty() {
        return Err(XhError::MissingCredentials { vars: missing });
    }
    Ok(Credentials {
        username,
        email,
        password,
    })
}

/// Log in with `credentials` and persist the resulting session.
///
/// # Errors
///
/// Returns [`XhError::AuthFailed`] if the provider rejects the login, or a
/// storage error if the session cannot be saved.
pub async fn login<P>(
    provider: &P,
    store: &SessionStore,
    credentials: &Credentials,
) -> Result<Session>
where
    P: SearchProvider + ?Sized,
{
    info!(user = %credentials.username, "Logging in");
    let session = provider
        .login(credentials)
        .await
        .map_err(|e| XhError::auth_failed(e.to_string()))?;
    store.save(&session)?;
    info!(user = %credentials.username, "Login succeeded");
    Ok(session)
}

/// Obtain a usable session, reusing the stored one when it still works.
///
/// `credentials` is consulted only if no valid stored session exists; it is
/// passed lazily so a reused session never requires credentials to be set.
///
/// # Errors
///
/// Fails with [`XhError::MissingCredentials`] when a login is needed but
/// credentials are absent, or [`XhError::AuthFailed`] when the login is
/// rejected.
pub async fn acquire_session<P, F>(
    provider: &P,
    store: &SessionStore,
    credentials: F,
) -> Result<(Session, SessionSource)>
where
    P: SearchProvider + ?Sized,
    F: FnOnce() -> Result<Credentials>,
{
    if store.exists() {
        info!(path = %store.path().display(), "Found stored session, validating");
        match store.load() {
            Ok(session) => match provider.probe(&session).await {
                Ok(identity) => {
                    info!(user = %identity.screen_name, "Stored session is valid");
                    return Ok((session, SessionSource::Reused));
                }
                Err(e) => warn!(error = %e, "Stored session rejected, a new login is required"),
            },
            Err(e) => warn!(error = %e, "Could not load stored session"),
        }
    } else {
        info!(path = %store.path().display(), "No stored session");
    }

    let credentials = credentials()?;
    let session = login(provider, store, &credentials).await?;
    Ok((session, SessionSource::FreshLogin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn credentials_report_every_missing_var() {
        let env: HashMap<&str, &str> = HashMap::from([(ENV_USERNAME, "user"), (ENV_EMAIL, " ")]);
        let err = credentials_from(|k| env.get(k).map(|v| (*v).to_string())).unwrap_err();
        match err {
            XhError::MissingCredentials { vars } => {
                assert_eq!(vars, vec![ENV_EMAIL, ENV_PASSWORD]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn credentials_complete() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_USERNAME, "user"),
            (ENV_EMAIL, "user@example.com"),
            (ENV_PASSWORD, "secret"),
        ]);
        let creds = credentials_from(|k| env.get(k).map(|v| (*v).to_string())).unwrap();
        assert_eq!(creds.username, "user");
        assert_eq!(creds.password, "secret");
    }

    #[test]
    fn store_round_trip_and_nested_dir() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("state").join("cookies.json"));
        assert!(!store.exists());

        let mut session = Session::default();
        session.cookies.insert("auth_token".into(), "abc".into());
        store.save(&session).unwrap();

        assert!(store.exists());
        assert_eq!(store.load().unwrap(), session);
    }

    #[test]
    fn corrupt_or_empty_store_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");

        std::fs::write(&path, "not json").unwrap();
        let store = SessionStore::new(&path);
        assert!(matches!(store.load(), Err(XhError::InvalidSession { .. })));

        std::fs::write(&path, r#"{"cookies": {}}"#).unwrap();
        assert!(matches!(store.load(), Err(XhError::InvalidSession { .. })));
    }
}
