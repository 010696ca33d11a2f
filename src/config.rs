//! Configuration system for xharvest.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **User config file** - `~/.config/xharvest/config.toml` (or `--config`)
//! 3. **Environment variables** - `XH_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! Credentials never live here; they are read from the environment (and a
//! `.env` file) only when a fresh login is needed.
//!
//! # Example Configuration File
//!
//! ```toml
//! [paths]
//! raw_output = "tweets_raspados.csv"
//! labeled_output = "tweets_para_treinamento.csv"
//! session_file = "cookies.json"
//!
//! [collect]
//! ranking = "Top"
//! max_retries = 30
//! retry_backoff_secs = 60
//!
//! [[collect.queries]]
//! term = "Palmeiras"
//! target = 200
//!
//! [provider]
//! base_url = "http://127.0.0.1:8710"
//! language = "pt-BR"
//!
//! [classifier]
//! backend = "lexicon"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::collector::CollectPolicy;
use crate::error::{Result, XhError};
use crate::http_provider::DEFAULT_BASE_URL;
use crate::model::{Query, Ranking};

/// Main configuration structure for xharvest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File locations.
    pub paths: PathsConfig,
    /// Collector queries, pacing and retry budget.
    pub collect: CollectConfig,
    /// Search provider connection.
    pub provider: ProviderConfig,
    /// Sentiment classifier selection.
    pub classifier: ClassifierConfig,
}

/// Path configuration for the datasets and the session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Collector output.
    /// Environment variable: `XH_RAW_OUTPUT`
    pub raw_output: PathBuf,

    /// Preprocessor output.
    /// Environment variable: `XH_LABELED_OUTPUT`
    pub labeled_output: PathBuf,

    /// Persisted session state.
    /// Environment variable: `XH_SESSION_FILE`
    pub session_file: PathBuf,
}

/// Collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Target used for queries given without one on the command line.
    pub default_target: usize,

    /// Result ordering requested from the provider.
    pub ranking: Ranking,

    /// Consecutive failures before a query is abandoned.
    /// Environment variable: `XH_MAX_RETRIES`
    pub max_retries: u32,

    /// Seconds to wait before retrying a failed fetch.
    pub retry_backoff_secs: u64,

    /// Seconds to wait after each consumed page.
    pub page_pause_secs: u64,

    /// Seconds to wait between queries.
    pub query_pause_secs: u64,

    /// Ordered search terms and their targets.
    pub queries: Vec<Query>,
}

/// Search provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Gateway base URL.
    /// Environment variable: `XH_PROVIDER_URL`
    pub base_url: String,

    /// Value sent as `Accept-Language`.
    pub language: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Classifier backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    #[default]
    Lexicon,
    Http,
}

/// Classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Which backend labels the texts.
    pub backend: ClassifierBackend,

    /// Inference endpoint for the `http` backend.
    /// Environment variable: `XH_CLASSIFIER_URL`
    pub url: Option<String>,

    /// Timeout in seconds for the single batch request.
    pub timeout_secs: u64,
}

/// Search terms used when neither the config file nor the CLI names any.
pub const DEFAULT_QUERIES: &[&str] = &[
    "Palmeiras",
    "Corinthians",
    "São Paulo FC",
    "Gremio",
    "Flamengo",
];

/// Posts collected per query by default.
pub const DEFAULT_TARGET: usize = 200;

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_output: PathBuf::from(crate::DEFAULT_RAW_OUTPUT),
            labeled_output: PathBuf::from(crate::DEFAULT_LABELED_OUTPUT),
            session_file: PathBuf::from(crate::DEFAULT_SESSION_FILE),
        }
    }
}

impl Default for CollectConfig {
    fn default() -> Self {
        let policy = CollectPolicy::default();
        Self {
            queries: DEFAULT_QUERIES
                .iter()
                .map(|term| Query::new(*term, DEFAULT_TARGET))
                .collect(),
            default_target: DEFAULT_TARGET,
            ranking: policy.ranking,
            max_retries: policy.max_retries,
            retry_backoff_secs: policy.retry_backoff.as_secs(),
            page_pause_secs: policy.page_pause.as_secs(),
            query_pause_secs: policy.query_pause.as_secs(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            language: "pt-BR".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Lexicon,
            url: None,
            timeout_secs: 600,
        }
    }
}

impl CollectConfig {
    /// Build the collector policy from these settings.
    #[must_use]
    pub const fn policy(&self) -> CollectPolicy {
        CollectPolicy {
            max_retries: self.max_retries,
            retry_backoff: Duration::from_secs(self.retry_backoff_secs),
            page_pause: Duration::from_secs(self.page_pause_secs),
            query_pause: Duration::from_secs(self.query_pause_secs),
            ranking: self.ranking,
        }
    }
}

impl ProviderConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. `explicit` config file, or the user config file
    /// 3. Compiled defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly requested file is missing or either
    /// file fails to parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(XhError::ConfigError {
                        path: path.to_path_buf(),
                        reason: "file not found".to_string(),
                    });
                }
                Self::load_from_file(path)?
            }
            None => match Self::user_config_path().filter(|p| p.exists()) {
                Some(path) => Self::load_from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env_overrides(|var| std::env::var(var).ok());

        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this schema.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| XhError::path_error("read config", path, e))?;
        let config = toml::from_str(&content).map_err(|e| XhError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("xharvest").join("config.toml"))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Path overrides
        if let Some(path) = var("XH_RAW_OUTPUT") {
            self.paths.raw_output = PathBuf::from(path);
        }
        if let Some(path) = var("XH_LABELED_OUTPUT") {
            self.paths.labeled_output = PathBuf::from(path);
        }
        if let Some(path) = var("XH_SESSION_FILE") {
            self.paths.session_file = PathBuf::from(path);
        }

        // Provider / classifier endpoints
        if let Some(url) = var("XH_PROVIDER_URL") {
            self.provider.base_url = url;
        }
        if let Some(url) = var("XH_CLASSIFIER_URL") {
            self.classifier.url = Some(url);
        }

        // Retry budget
        if let Some(n) = var("XH_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.collect.max_retries = n;
        }
    }

    /// Save the current configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| XhError::path_error("create directory", parent, e))?;
            }
        }
        std::fs::write(path, self.to_toml())
            .map_err(|e| XhError::path_error("write config", path, e))?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Render as TOML.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.collect.queries.len(), 5);
        assert_eq!(config.collect.queries[2], Query::new("São Paulo FC", 200));
        assert_eq!(config.collect.max_retries, 30);
        assert_eq!(config.collect.retry_backoff_secs, 60);
        assert_eq!(config.collect.query_pause_secs, 15);
        assert_eq!(config.classifier.backend, ClassifierBackend::Lexicon);
        assert_eq!(config.paths.raw_output, PathBuf::from("tweets_raspados.csv"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = config.to_toml();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.collect.queries, parsed.collect.queries);
        assert_eq!(config.provider.base_url, parsed.provider.base_url);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[collect]
max_retries = 3

[[collect.queries]]
term = "Internacional"
target = 10
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.collect.max_retries, 3);
        assert_eq!(config.collect.queries, vec![Query::new("Internacional", 10)]);
        assert_eq!(config.collect.retry_backoff_secs, 60);
        assert_eq!(config.provider.language, "pt-BR");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[collect]\nmax_retries = \"many\"\n").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(XhError::ConfigError { .. })
        ));
        assert!(matches!(
            Config::load(Some(&dir.path().join("absent.toml"))),
            Err(XhError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("XH_RAW_OUTPUT", "/data/raw.csv"),
            ("XH_PROVIDER_URL", "http://gateway:9000"),
            ("XH_MAX_RETRIES", "5"),
            ("XH_CLASSIFIER_URL", "http://model:8000/predict"),
        ]);
        let mut config = Config::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.paths.raw_output, PathBuf::from("/data/raw.csv"));
        assert_eq!(config.provider.base_url, "http://gateway:9000");
        assert_eq!(config.collect.max_retries, 5);
        assert_eq!(
            config.classifier.url.as_deref(),
            Some("http://model:8000/predict")
        );
    }

    #[test]
    fn test_policy_from_config() {
        let config = CollectConfig {
            retry_backoff_secs: 2,
            ..CollectConfig::default()
        };
        let policy = config.policy();
        assert_eq!(policy.retry_backoff, Duration::from_secs(2));
        assert_eq!(policy.max_retries, 30);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.collect.default_target = 42;
        config.save(&path).unwrap();
        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.collect.default_target, 42);
    }
}
