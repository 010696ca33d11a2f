//! Sentiment classifier trait and the HTTP inference backend.
//!
//! A classifier takes the whole batch of cleaned texts and returns one
//! [`Prediction`] per input, in the same order. Labels come from the model's
//! own vocabulary (`POS`, `NEG`, `NEU`); mapping them onto
//! [`Sentiment`](crate::model::Sentiment) is the preprocessor's job so that
//! an unexpected label is caught in one place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during classification.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The classifier is not available (endpoint unreachable, model missing).
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    /// The classifier answered with an error or an unreadable body.
    #[error("prediction failed: {0}")]
    PredictionFailed(String),
}

/// Result type for classifier operations.
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// One model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Raw model label, e.g. `POS`.
    pub label: String,
    /// Model confidence for `label`, in `0.0..=1.0`.
    #[serde(default)]
    pub score: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Trait for batch sentiment classifiers.
///
/// # Implementations
///
/// - [`LexiconClassifier`](crate::lexicon::LexiconClassifier): built-in,
///   deterministic word-list scorer. Always available.
/// - [`HttpClassifier`]: forwards the batch to an inference server hosting a
///   pretrained model.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Classify every text in `texts`, preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot produce predictions.
    async fn predict(&self, texts: &[String]) -> ClassifierResult<Vec<Prediction>>;

    /// Identifier shown in logs and reports.
    fn id(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a [String],
}

/// Inference servers return either a flat list or, with `top_k`, a list of
/// candidate lists ordered by score.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceOutput {
    Flat(Vec<Prediction>),
    Ranked(Vec<Vec<Prediction>>),
}

impl InferenceOutput {
    fn into_predictions(self) -> ClassifierResult<Vec<Prediction>> {
        match self {
            Self::Flat(predictions) => Ok(predictions),
            Self::Ranked(candidates) => candidates
                .into_iter()
                .enumerate()
                .map(|(i, mut options)| {
                    options.sort_by(|a, b| b.score.total_cmp(&a.score));
                    options.into_iter().next().ok_or_else(|| {
                        ClassifierError::PredictionFailed(format!("no candidates for input {i}"))
                    })
                })
                .collect(),
        }
    }
}

/// Classifier that posts the batch to a text-classification endpoint.
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
    id: String,
}

impl HttpClassifier {
    /// Create a classifier for the endpoint at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> ClassifierResult<Self> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            id: format!("http:{url}"),
            url,
        })
    }
}

#[async_trait]
impl SentimentClassifier for HttpClassifier {
    async fn predict(&self, texts: &[String]) -> ClassifierResult<Vec<Prediction>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let resp = self
            .client
            .post(&self.url)
            .json(&InferenceRequest { inputs: texts })
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::PredictionFailed(format!(
                "status {}: {body}",
                status.as_u16()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ClassifierError::PredictionFailed(e.to_string()))?;
        let output: InferenceOutput = serde_json::from_str(&body)
            .map_err(|e| ClassifierError::PredictionFailed(e.to_string()))?;
        output.into_predictions()
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_output_is_used_as_is() {
        let output: InferenceOutput = serde_json::from_str(
            r#"[{"label": "POS", "score": 0.9}, {"label": "NEU", "score": 0.6}]"#,
        )
        .unwrap();
        let predictions = output.into_predictions().unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].label, "POS");
        assert_eq!(predictions[1].label, "NEU");
    }

    #[test]
    fn ranked_output_takes_best_candidate() {
        let output: InferenceOutput = serde_json::from_str(
            r#"[
                [{"label": "NEG", "score": 0.2}, {"label": "POS", "score": 0.7}, {"label": "NEU", "score": 0.1}],
                [{"label": "NEG", "score": 0.8}]
            ]"#,
        )
        .unwrap();
        let labels: Vec<_> = output
            .into_predictions()
            .unwrap()
            .into_iter()
            .map(|p| p.label)
            .collect();
        assert_eq!(labels, ["POS", "NEG"]);
    }

    #[test]
    fn ranked_output_with_empty_candidates_fails() {
        let output: InferenceOutput = serde_json::from_str(r"[[]]").unwrap();
        assert!(output.into_predictions().is_err());
    }
}
