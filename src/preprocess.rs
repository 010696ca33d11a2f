//! Raw dataset to labeled training dataset.
//!
//! Rows missing their text or query are dropped, the rest are cleaned and
//! sent to the classifier as one batch. Output order follows input order.
//! Nothing is written unless every row got a mapped label.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::classifier::SentimentClassifier;
use crate::clean::clean_text;
use crate::error::{Result, XhError};
use crate::model::{LabeledRecord, Sentiment};
use crate::storage::{RawRow, read_raw_rows, write_labeled};

/// Summary of a labeling run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelReport {
    /// Rows read from the raw dataset.
    pub loaded: usize,
    /// Rows dropped for a missing text or query.
    pub dropped: usize,
    /// Rows written to the labeled dataset.
    pub labeled: usize,
    /// Count per class, in [`Sentiment::ALL`] order.
    pub distribution: Vec<(Sentiment, usize)>,
}

impl LabelReport {
    /// Count for one class.
    #[must_use]
    pub fn count(&self, sentiment: Sentiment) -> usize {
        self.distribution
            .iter()
            .find(|(s, _)| *s == sentiment)
            .map_or(0, |(_, n)| *n)
    }
}

/// Clean and label `rows` with a single classifier batch.
///
/// # Errors
///
/// Returns [`XhError::Classifier`] if the batch fails,
/// [`XhError::PredictionCountMismatch`] if the classifier answers with the
/// wrong number of predictions, and [`XhError::UnmappedLabel`] for the first
/// label outside the POS/NEG/NEU vocabulary.
pub async fn label(
    rows: Vec<RawRow>,
    classifier: &dyn SentimentClassifier,
) -> Result<(Vec<LabeledRecord>, LabelReport)> {
    let loaded = rows.len();

    let (texts, queries): (Vec<String>, Vec<String>) = rows
        .into_iter()
        .filter_map(|row| match (row.text, row.query) {
            (Some(text), Some(query)) => Some((clean_text(&text), query)),
            _ => None,
        })
        .unzip();
    let dropped = loaded - texts.len();
    if dropped > 0 {
        warn!(dropped, "Dropped rows with a missing text or query");
    }

    info!(
        rows = texts.len(),
        classifier = classifier.id(),
        "Classifying batch"
    );
    let predictions = classifier.predict(&texts).await?;
    if predictions.len() != texts.len() {
        return Err(XhError::PredictionCountMismatch {
            expected: texts.len(),
            got: predictions.len(),
        });
    }

    let mut counts: BTreeMap<Sentiment, usize> = BTreeMap::new();
    let mut records = Vec::with_capacity(texts.len());
    for (row, ((clean_text, query), prediction)) in
        texts.into_iter().zip(queries).zip(predictions).enumerate()
    {
        let sentiment =
            Sentiment::from_model_label(&prediction.label).ok_or_else(|| XhError::UnmappedLabel {
                row,
                label: prediction.label.clone(),
            })?;
        *counts.entry(sentiment).or_default() += 1;
        records.push(LabeledRecord {
            clean_text,
            sentiment,
            query,
        });
    }

    let report = LabelReport {
        loaded,
        dropped,
        labeled: records.len(),
        distribution: Sentiment::ALL
            .iter()
            .map(|s| (*s, counts.get(s).copied().unwrap_or(0)))
            .collect(),
    };
    Ok((records, report))
}

/// Read `input`, label it and write the result to `output`.
///
/// `output` is only touched after labeling succeeds for every row.
///
/// # Errors
///
/// Propagates read, classification and write errors.
pub async fn run_label(
    input: &Path,
    output: &Path,
    classifier: &dyn SentimentClassifier,
) -> Result<LabelReport> {
    let rows = read_raw_rows(input)?;
    info!(rows = rows.len(), path = %input.display(), "Loaded raw dataset");

    let (records, report) = label(rows, classifier).await?;
    write_labeled(output, &records)?;

    info!(
        labeled = report.labeled,
        path = %output.display(),
        "Labeled dataset written"
    );
    for (sentiment, count) in &report.distribution {
        info!(sentiment = %sentiment, count, "Class distribution");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassifierResult, Prediction};
    use crate::lexicon::LexiconClassifier;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Returns the configured labels regardless of input.
    struct FixedClassifier(Vec<&'static str>);

    #[async_trait]
    impl SentimentClassifier for FixedClassifier {
        async fn predict(&self, _texts: &[String]) -> ClassifierResult<Vec<Prediction>> {
            Ok(self.0.iter().map(|l| Prediction::new(*l, 0.9)).collect())
        }

        fn id(&self) -> &str {
            "fixed"
        }
    }

    fn row(text: Option<&str>, query: Option<&str>) -> RawRow {
        RawRow {
            text: text.map(String::from),
            query: query.map(String::from),
        }
    }

    #[tokio::test]
    async fn labels_in_input_order_and_drops_incomplete_rows() {
        let rows = vec![
            row(Some("Que golaço! @fulano https://t.co/x"), Some("Palmeiras")),
            row(None, Some("Palmeiras")),
            row(Some("Que vexame"), None),
            row(Some("Jogo hoje às 16h"), Some("Gremio")),
        ];
        let clf = FixedClassifier(vec!["POS", "NEU"]);
        let (records, report) = label(rows, &clf).await.unwrap();

        assert_eq!(report.loaded, 4);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.labeled, 2);
        assert_eq!(records[0].clean_text, "Que golaço!");
        assert_eq!(records[0].sentiment, Sentiment::Positive);
        assert_eq!(records[1].query, "Gremio");
        assert_eq!(records[1].sentiment, Sentiment::Neutral);
        assert_eq!(report.count(Sentiment::Positive), 1);
        assert_eq!(report.count(Sentiment::Negative), 0);
    }

    #[tokio::test]
    async fn distribution_follows_class_order() {
        let rows = vec![row(Some("a"), Some("q")), row(Some("b"), Some("q"))];
        let clf = FixedClassifier(vec!["NEU", "NEG"]);
        let (_, report) = label(rows, &clf).await.unwrap();
        assert_eq!(
            report.distribution,
            vec![
                (Sentiment::Positive, 0),
                (Sentiment::Negative, 1),
                (Sentiment::Neutral, 1)
            ]
        );
    }

    #[tokio::test]
    async fn unmapped_label_names_the_row() {
        let rows = vec![row(Some("a"), Some("q")), row(Some("b"), Some("q"))];
        let clf = FixedClassifier(vec!["POS", "MIXED"]);
        match label(rows, &clf).await {
            Err(XhError::UnmappedLabel { row, label }) => {
                assert_eq!(row, 1);
                assert_eq!(label, "MIXED");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn short_prediction_batch_is_rejected() {
        let rows = vec![row(Some("a"), Some("q")), row(Some("b"), Some("q"))];
        let clf = FixedClassifier(vec!["POS"]);
        assert!(matches!(
            label(rows, &clf).await,
            Err(XhError::PredictionCountMismatch {
                expected: 2,
                got: 1
            })
        ));
    }

    #[tokio::test]
    async fn failed_run_leaves_output_untouched() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("raw.csv");
        let output = dir.path().join("labeled.csv");
        std::fs::write(&input, "Query,Texto\nq,a\nq,b\n").unwrap();

        let clf = FixedClassifier(vec!["???", "POS"]);
        assert!(run_label(&input, &output, &clf).await.is_err());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn run_label_with_lexicon_writes_dataset() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("raw.csv");
        let output = dir.path().join("labeled.csv");
        std::fs::write(
            &input,
            "Nro_Tweet,Query,Usuario,Texto,Data de Criacao,Retweets,Likes\n\
             1,Palmeiras,Ana,Vitória merecida #Verdão,2024-01-01,0,3\n\
             2,Palmeiras,Bia,,2024-01-01,0,0\n",
        )
        .unwrap();

        let report = run_label(&input, &output, &LexiconClassifier::new())
            .await
            .unwrap();
        assert_eq!(report.labeled, 1);
        assert_eq!(report.dropped, 1);

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            written,
            "texto_limpo,sentimento,Query\nVitória merecida Verdão,Positivo,Palmeiras\n"
        );
    }
}
