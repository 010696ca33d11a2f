//! Word-list sentiment classifier.
//!
//! Scores text against a small Portuguese/English polarity lexicon. It is
//! always available, needs no model files or network, and is fully
//! deterministic, which makes it the default backend for offline runs and
//! tests.
//!
//! # Algorithm
//!
//! 1. Tokenize on non-alphanumeric boundaries, lowercased
//! 2. Each lexicon hit adds its polarity (+1 or -1) to the score
//! 3. A negator (`não`, `nunca`, `not`, ...) flips the next hit within
//!    [`NEGATION_WINDOW`] tokens
//! 4. Score > 0 is `POS`, < 0 is `NEG`, otherwise `NEU`
//!
//! Not semantic: sarcasm and context are invisible to it.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::classifier::{ClassifierResult, Prediction, SentimentClassifier};

/// Tokens after a negator that its flip still applies to.
pub const NEGATION_WINDOW: usize = 3;

const POSITIVE_WORDS: &[&str] = &[
    // pt
    "bom", "boa", "bons", "boas", "ótimo", "ótima", "otimo", "otima", "excelente", "incrível",
    "incrivel", "lindo", "linda", "feliz", "alegria", "amo", "amor", "adoro", "gosto", "vitória",
    "vitoria", "vencer", "venceu", "ganhou", "ganhar", "campeão", "campeao", "campeões", "golaço",
    "golaco", "show", "sensacional", "maravilhoso", "maravilhosa", "parabéns", "parabens", "orgulho",
    "melhor", "top", "perfeito", "perfeita", "brilhante", "craque", "classificado", "classificou",
    "vamos", "vai", "demais", "massa", "foda", "merecido", "histórico", "historico",
    // en
    "good", "great", "excellent", "amazing", "awesome", "love", "happy", "win", "won", "best",
    "perfect", "brilliant", "proud", "congrats", "fantastic", "beautiful",
];

const NEGATIVE_WORDS: &[&str] = &[
    // pt
    "ruim", "péssimo", "péssima", "pessimo", "pessima", "horrível", "horrivel", "terrível",
    "terrivel", "triste", "tristeza", "odeio", "ódio", "odio", "raiva", "derrota", "perdeu",
    "perder", "perdemos", "vergonha", "vergonhoso", "vexame", "lixo", "fraco", "fraca", "pior",
    "rebaixado", "rebaixamento", "eliminado", "eliminação", "eliminacao", "decepção", "decepcao",
    "decepcionante", "absurdo", "roubo", "roubado", "fora", "chato", "medo", "crise", "desastre",
    "lamentável", "lamentavel", "merda", "porcaria",
    // en
    "bad", "terrible", "awful", "horrible", "hate", "sad", "lost", "lose", "worst", "shame",
    "disappointing", "disaster", "angry", "trash",
];

const NEGATORS: &[&str] = &["não", "nao", "nunca", "nem", "jamais", "not", "never"];

/// Deterministic lexicon-based classifier.
#[derive(Debug, Clone)]
pub struct LexiconClassifier {
    polarity: HashMap<&'static str, i32>,
    id: String,
}

impl LexiconClassifier {
    #[must_use]
    pub fn new() -> Self {
        let polarity = POSITIVE_WORDS
            .iter()
            .map(|w| (*w, 1))
            .chain(NEGATIVE_WORDS.iter().map(|w| (*w, -1)))
            .collect();
        Self {
            polarity,
            id: "lexicon-pt-en".to_string(),
        }
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Net polarity of `text`.
    #[must_use]
    pub fn score(&self, text: &str) -> i32 {
        let mut score = 0;
        let mut negation_left = 0usize;

        for token in Self::tokenize(text) {
            if NEGATORS.contains(&token.as_str()) {
                negation_left = NEGATION_WINDOW;
                continue;
            }
            if let Some(&polarity) = self.polarity.get(token.as_str()) {
                if negation_left > 0 {
                    score -= polarity;
                    negation_left = 0;
                } else {
                    score += polarity;
                }
                continue;
            }
            negation_left = negation_left.saturating_sub(1);
        }
        score
    }

    /// Classify a single text.
    #[must_use]
    pub fn classify(&self, text: &str) -> Prediction {
        let score = self.score(text);
        let magnitude = f64::from(score.unsigned_abs());
        #[allow(clippy::cast_possible_truncation)]
        let confidence = (magnitude / (magnitude + 1.0)) as f32;
        match score.signum() {
            1 => Prediction::new("POS", confidence),
            -1 => Prediction::new("NEG", confidence),
            _ => Prediction::new("NEU", 1.0),
        }
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentClassifier for LexiconClassifier {
    async fn predict(&self, texts: &[String]) -> ClassifierResult<Vec<Prediction>> {
        Ok(texts.iter().map(|t| self.classify(t)).collect())
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_negative_neutral() {
        let clf = LexiconClassifier::new();
        assert_eq!(clf.classify("Que golaço, vitória merecida!").label, "POS");
        assert_eq!(clf.classify("Que vexame, time horrível").label, "NEG");
        assert_eq!(clf.classify("O jogo começa às 16h").label, "NEU");
        assert_eq!(clf.classify("").label, "NEU");
    }

    #[test]
    fn negation_flips_next_hit() {
        let clf = LexiconClassifier::new();
        assert_eq!(clf.score("o time não jogou bem nem bom"), -1);
        assert_eq!(clf.classify("não foi ruim").label, "POS");
        assert_eq!(clf.classify("this is not good").label, "NEG");
    }

    #[test]
    fn negation_window_expires() {
        let clf = LexiconClassifier::new();
        // four filler tokens push "bom" out of the window
        assert_eq!(clf.score("não a b c d bom"), 1);
        assert_eq!(clf.score("não a b bom"), -1);
    }

    #[test]
    fn case_insensitive() {
        let clf = LexiconClassifier::new();
        assert_eq!(clf.classify("CAMPEÃO").label, "POS");
    }

    #[test]
    fn deterministic_batch() {
        let clf = LexiconClassifier::new();
        let texts = vec!["amo".to_string(), "odeio".to_string(), "ok".to_string()];
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let first = rt.block_on(clf.predict(&texts)).unwrap();
        let second = rt.block_on(clf.predict(&texts)).unwrap();
        assert_eq!(first, second);
        let labels: Vec<_> = first.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["POS", "NEG", "NEU"]);
    }
}
