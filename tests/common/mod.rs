//! Shared helpers for integration tests

use std::sync::Arc;
use trendwatch::{config::EmbeddingConfig, Article, EmbeddingBackend, Vectorizer};

/// Fake model: one dimension per topic word list plus one per distinct token slot,
/// so same-topic texts score high and unrelated texts near zero.
pub struct TopicBackend;

const TOPICS: &[&[&str]] = &[
    &["putin", "russia", "kremlin", "nato", "sanctions", "military", "warning", "warns", "threatens"],
    &["team", "league", "championship", "coach", "match", "wins", "fans"],
    &["apple", "iphone", "chip", "software", "smartphone", "launch"],
    &["storm", "flood", "rain", "coast", "hurricane", "forecasters"],
];

const TOKEN_SLOTS: usize = 97;

impl EmbeddingBackend for TopicBackend {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut v = vec![0.0; self.dimension()];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 3)
            .map(str::to_lowercase)
        {
            for (i, topic) in TOPICS.iter().enumerate() {
                if topic.iter().any(|t| *t == word) {
                    v[i] += 3.0;
                }
            }
            let slot = word.bytes().fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            v[TOPICS.len() + slot % TOKEN_SLOTS] += 1.0;
        }
        Ok(v)
    }

    fn dimension(&self) -> usize {
        TOPICS.len() + TOKEN_SLOTS
    }

    fn model_name(&self) -> &str {
        "topic-test"
    }
}

pub fn vector_vectorizer() -> Arc<Vectorizer> {
    Arc::new(Vectorizer::new(Arc::new(TopicBackend), &EmbeddingConfig::default()))
}

pub fn keyword_vectorizer() -> Arc<Vectorizer> {
    Arc::new(Vectorizer::unavailable())
}

pub fn articles(headings: &[&str]) -> Vec<Article> {
    headings
        .iter()
        .enumerate()
        .map(|(i, h)| Article::new(*h, "").with_id(format!("a{}", i)).with_source(format!("Source {}", i % 2)))
        .collect()
}
