//! Data models for collected and labeled posts.
//!
//! These structures are the typed contract between the provider adapter,
//! the collector, the CSV storage layer and the preprocessor. Nothing past
//! the provider boundary sees untyped JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A search term plus the number of posts to collect for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub term: String,
    pub target: usize,
}

impl Query {
    pub fn new(term: impl Into<String>, target: usize) -> Self {
        Self {
            term: term.into(),
            target,
        }
    }
}

/// A query as typed on the command line, before defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub term: String,
    /// `None` when no target was given; an explicit `0` stays `Some(0)`.
    pub target: Option<usize>,
}

impl QuerySpec {
    /// Fill in `default_target` where no target was given.
    #[must_use]
    pub fn resolve(&self, default_target: usize) -> Query {
        Query::new(self.term.clone(), self.target.unwrap_or(default_target))
    }
}

impl std::str::FromStr for QuerySpec {
    type Err = String;

    /// Parse `TERM` or `TERM:TARGET`.
    ///
    /// Only an all-digit suffix after the last `:` is read as the target, so
    /// search operators like `lang:pt` pass through as part of the term. A
    /// trailing `:` with nothing after it ends the term explicitly
    /// (`time:12:` is the term `time:12` with the default target).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (term, target) = match s.rsplit_once(':') {
            Some((term, "")) => (term.trim(), None),
            Some((term, digits)) if digits.bytes().all(|b| b.is_ascii_digit()) => {
                let target = digits
                    .parse()
                    .map_err(|_| format!("invalid target '{digits}' in query '{s}'"))?;
                (term.trim(), Some(target))
            }
            _ => (s, None),
        };
        if term.is_empty() {
            return Err("query term must not be empty".to_string());
        }
        Ok(Self {
            term: term.to_string(),
            target,
        })
    }
}

/// Result ordering requested from the provider's search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ranking {
    #[default]
    Top,
    Latest,
}

impl Ranking {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Latest => "Latest",
        }
    }
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One post as returned by the provider, before it is numbered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_name: String,
    pub text: String,
    pub created_at: String,
    pub retweet_count: u64,
    pub favorite_count: u64,
}

/// Opaque continuation handle for the next page of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub term: String,
    pub ranking: Ranking,
    pub token: String,
}

/// One batch of posts plus the handle for the next batch, if any.
#[derive(Debug, Clone, Default)]
pub struct ResultPage {
    pub posts: Vec<Post>,
    pub next: Option<Cursor>,
    /// Items the provider returned that failed validation and were dropped.
    pub skipped: usize,
}

impl ResultPage {
    #[must_use]
    pub const fn new(posts: Vec<Post>, next: Option<Cursor>) -> Self {
        Self {
            posts,
            next,
            skipped: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// The provider returned no items at all, valid or not.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.posts.is_empty() && self.skipped == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }
}

/// A collected post with its global sequence number, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub index: u64,
    pub query: String,
    pub author_name: String,
    pub text: String,
    pub created_at: String,
    pub retweet_count: u64,
    pub favorite_count: u64,
}

impl Record {
    #[must_use]
    pub fn from_post(index: u64, query: &str, post: Post) -> Self {
        Self {
            index,
            query: query.to_string(),
            author_name: post.author_name,
            text: post.text,
            created_at: post.created_at,
            retweet_count: post.retweet_count,
            favorite_count: post.favorite_count,
        }
    }
}

/// Sentiment class assigned to a cleaned post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Self; 3] = [Self::Positive, Self::Negative, Self::Neutral];

    /// Map a classifier label onto the enumeration.
    ///
    /// Accepts the short model vocabulary (`POS`, `NEG`, `NEU`) and the long
    /// form, case-insensitively. Anything else is `None`.
    #[must_use]
    pub fn from_model_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "POS" | "POSITIVE" => Some(Self::Positive),
            "NEG" | "NEGATIVE" => Some(Self::Negative),
            "NEU" | "NEUTRAL" => Some(Self::Neutral),
            _ => None,
        }
    }

    /// Label string written to the training dataset.
    #[must_use]
    pub const fn dataset_label(self) -> &'static str {
        match self {
            Self::Positive => "Positivo",
            Self::Negative => "Negativo",
            Self::Neutral => "Neutro",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dataset_label())
    }
}

/// A cleaned, sentiment-tagged output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub clean_text: String,
    pub sentiment: Sentiment,
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(s: &str) -> QuerySpec {
        s.parse().unwrap()
    }

    #[test]
    fn query_spec_parses_term_and_target() {
        assert_eq!(spec("Palmeiras:50").resolve(7), Query::new("Palmeiras", 50));
        assert_eq!(spec("São Paulo FC").resolve(7), Query::new("São Paulo FC", 7));
        assert!("  ".parse::<QuerySpec>().is_err());
        assert!(":5".parse::<QuerySpec>().is_err());
        assert!("Gremio:99999999999999999999999".parse::<QuerySpec>().is_err());
    }

    #[test]
    fn explicit_zero_target_is_kept() {
        assert_eq!(spec("Gremio:0").target, Some(0));
        assert_eq!(spec("Gremio:0").resolve(200), Query::new("Gremio", 0));
        assert_eq!(spec("Gremio").target, None);
    }

    #[test]
    fn colons_in_terms_survive() {
        assert_eq!(spec("lang:pt").resolve(5), Query::new("lang:pt", 5));
        assert_eq!(spec("Gremio lang:pt:30").resolve(5), Query::new("Gremio lang:pt", 30));
        assert_eq!(spec("time:12:").resolve(5), Query::new("time:12", 5));
        assert_eq!(spec("time:12").resolve(5), Query::new("time", 12));
    }

    #[test]
    fn page_with_only_dropped_items_is_not_exhausted() {
        let page = ResultPage {
            skipped: 2,
            ..ResultPage::default()
        };
        assert!(page.is_empty());
        assert!(!page.is_exhausted());
        assert!(ResultPage::default().is_exhausted());
    }

    #[test]
    fn sentiment_mapping_is_total_over_model_vocabulary() {
        assert_eq!(Sentiment::from_model_label("POS"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_model_label("neg"), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_model_label("NEU"), Some(Sentiment::Neutral));
        assert_eq!(
            Sentiment::from_model_label("Positive"),
            Some(Sentiment::Positive)
        );
        assert_eq!(Sentiment::from_model_label("MIXED"), None);
        assert_eq!(Sentiment::from_model_label(""), None);
    }

    #[test]
    fn sentiment_dataset_labels() {
        let labels: Vec<_> = Sentiment::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(labels, ["Positivo", "Negativo", "Neutro"]);
    }

    #[test]
    fn record_from_post_keeps_fields() {
        let post = Post {
            id: "1".to_string(),
            author_name: "Ana".to_string(),
            text: "Vamos!".to_string(),
            created_at: "Wed Jan 08 12:00:00 +0000 2025".to_string(),
            retweet_count: 3,
            favorite_count: 9,
        };
        let record = Record::from_post(7, "Flamengo", post);
        assert_eq!(record.index, 7);
        assert_eq!(record.query, "Flamengo");
        assert_eq!(record.author_name, "Ana");
        assert_eq!(record.favorite_count, 9);
    }
}
