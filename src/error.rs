//! Errors for the collect and label jobs.
//!
//! Provider and classifier failures keep their own types and are wrapped
//! here once they stop a job.

use std::path::PathBuf;
use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::provider::ProviderError;

/// Everything that can stop a job.
#[derive(Error, Debug)]
pub enum XhError {
    /// No usable session and one or more credentials are not set.
    #[error("Missing credentials: {}", .vars.join(", "))]
    MissingCredentials { vars: Vec<&'static str> },

    /// The provider rejected the login attempt.
    #[error("Login failed: {reason}")]
    AuthFailed { reason: String },

    /// The session file exists but could not be used.
    #[error("Unusable session file '{path}': {reason}")]
    InvalidSession { path: PathBuf, reason: String },

    /// Provider failure outside of the collection loop.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Input dataset not found.
    #[error("Input file not found at '{path}'")]
    InputNotFound { path: PathBuf },

    /// A required column is missing from the input header.
    #[error("Required column '{column}' not found in '{path}'")]
    MissingColumn { column: String, path: PathBuf },

    /// The classifier produced a label outside its declared vocabulary.
    #[error("Unmapped classifier label '{label}' for row {row}")]
    UnmappedLabel { row: usize, label: String },

    /// The classifier returned a different number of predictions than inputs.
    #[error("Classifier returned {got} predictions for {expected} inputs")]
    PredictionCountMismatch { expected: usize, got: usize },

    /// Sentiment classifier failure.
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    /// CSV read/write error.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// File read/write error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file parsing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },

    /// Invalid command-line argument.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Foreign error tagged with what was being attempted.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, XhError>;

impl XhError {
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }

    pub fn input_not_found(path: impl Into<PathBuf>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    pub fn missing_column(column: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingColumn {
            column: column.into(),
            path: path.into(),
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// IO failure on a known file; `operation` reads as "failed to {operation}".
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Wrap a foreign error under a short description of what was being done.
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Session or credential problems; the user must act before rerunning.
    #[must_use]
    pub const fn is_auth_related(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials { .. } | Self::AuthFailed { .. } | Self::InvalidSession { .. }
        )
    }

    /// One-line hint printed under the error, if there is an obvious fix.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::MissingCredentials { .. } => Some(
                "Set TWITTER_USERNAME, TWITTER_EMAIL and TWITTER_PASSWORD in the environment or a .env file.",
            ),
            Self::AuthFailed { .. } => Some(
                "Check the credentials. The provider may require a security check; log in through a browser first.",
            ),
            Self::InputNotFound { .. } => Some("Run 'xharvest collect' first to produce the raw dataset."),
            Self::MissingColumn { .. } => {
                Some("The input must be a file written by 'xharvest collect'.")
            }
            Self::UnmappedLabel { .. } | Self::PredictionCountMismatch { .. } => {
                Some("Check that the classifier serves a POS/NEG/NEU sentiment model.")
            }
            _ => None,
        }
    }
}

/// `.context("...")` for foreign results, producing [`XhError::WithContext`].
pub trait ResultExt<T> {
    /// # Errors
    ///
    /// Returns the original error tagged with `context`.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| XhError::with_context(context, e))
    }
}

/// Render a failed command for stderr: a red title, the error chain, and
/// an optional hint line.
#[must_use]
pub fn format_error(title: &str, explanation: &str, hint: Option<&str>) -> String {
    use colored::Colorize;

    let mut lines = vec![format!("{} {}", "error:".red().bold(), title.bold())];
    if !explanation.is_empty() {
        lines.push(format!("  {explanation}"));
    }
    if let Some(hint) = hint {
        lines.push(format!("  {} {hint}", "hint:".cyan()));
    }
    lines.join("\n")
}
