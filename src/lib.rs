//! xharvest - Sentiment dataset harvester for X search results
//!
//! This library provides the two batch jobs behind the `xharvest` binary:
//! collecting posts for a list of search terms into a raw CSV dataset, and
//! turning that dataset into a cleaned, sentiment-labeled training set.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`config`] - Layered TOML/env configuration
//! - [`error`] - Custom error types with rich context
//! - [`model`] - Queries, posts, records and sentiment classes
//! - [`provider`] - Search provider trait, sessions and error classification
//! - [`http_provider`] - reqwest adapter for the search gateway
//! - [`session`] - Session persistence and login
//! - [`collector`] - The fetch-retry-paginate loop
//! - [`storage`] - CSV datasets
//! - [`clean`] - Text cleaning
//! - [`classifier`] - Classifier trait and HTTP inference backend
//! - [`lexicon`] - Built-in word-list classifier
//! - [`preprocess`] - Raw dataset to labeled dataset

pub mod classifier;
pub mod clean;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod http_provider;
pub mod lexicon;
pub mod logging;
pub mod model;
pub mod preprocess;
pub mod provider;
pub mod session;
pub mod storage;

pub use cli::*;
pub use collector::{CollectPolicy, CollectReport, Collector, QueryOutcome, QueryReport};
pub use config::Config;
pub use error::{Result, ResultExt, XhError, format_error};
pub use model::*;
pub use preprocess::LabelReport;
pub use provider::{SearchProvider, Session};
pub use storage::RecordWriter;

/// Default raw dataset filename
pub const DEFAULT_RAW_OUTPUT: &str = "tweets_raspados.csv";

/// Default labeled dataset filename
pub const DEFAULT_LABELED_OUTPUT: &str = "tweets_para_treinamento.csv";

/// Default session filename
pub const DEFAULT_SESSION_FILE: &str = "cookies.json";

/// Standard width for content dividers in CLI output
pub const CONTENT_DIVIDER_WIDTH: usize = 60;

/// Format an unsigned integer with thousands separators.
#[must_use]
pub fn format_number_u64(value: u64) -> String {
    let mut out = String::with_capacity(24);

    for (idx, ch) in value.to_string().chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out.chars().rev().collect()
}

/// Format a usize with thousands separators.
#[must_use]
pub fn format_number_usize(value: usize) -> String {
    format_number_u64(u64::try_from(value).unwrap_or(u64::MAX))
}

/// Share of `part` in `whole` as a percentage, 0 when `whole` is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::{format_number_u64, format_number_usize, percent};

    #[test]
    fn format_number_adds_separators() {
        assert_eq!(format_number_u64(0), "0");
        assert_eq!(format_number_u64(999), "999");
        assert_eq!(format_number_u64(1000), "1,000");
        assert_eq!(format_number_usize(12_345_678), "12,345,678");
    }

    #[test]
    fn percent_handles_empty_total() {
        assert!(percent(3, 0).abs() < f64::EPSILON);
        assert!((percent(1, 4) - 25.0).abs() < f64::EPSILON);
    }
}
