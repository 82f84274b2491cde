//! Deterministic stand-in for the embedding model used by unit tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::embedding::{Embedding, EmbeddingBackend};
use crate::models::Article;

const HASH_BUCKETS: usize = 64;
const TOPIC_WEIGHT: f32 = 3.0;

/// Embeds text as topic-lexicon hits plus hashed token counts, so texts about the
/// same topic land close together and unrelated texts are nearly orthogonal.
pub struct LexiconBackend {
    topics: Vec<Vec<&'static str>>,
    calls: AtomicUsize,
    fail_marker: Option<String>,
}

impl LexiconBackend {
    pub fn news() -> Self {
        Self {
            topics: vec![
                vec![
                    "putin", "russia", "russian", "kremlin", "moscow", "nato", "sanctions",
                    "military", "warning", "warns", "threatens",
                ],
                vec!["championship", "team", "league", "coach", "fans", "victory", "wins"],
                vec!["iphone", "apple", "smartphone", "features", "software", "chip"],
                vec!["storm", "rain", "flood", "hurricane", "weather", "coast"],
                vec!["gdp", "economy", "economic", "growth", "markets", "inflation"],
            ],
            calls: AtomicUsize::new(0),
            fail_marker: None,
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingBackend for LexiconBackend {
    fn encode(&self, text: &str) -> anyhow::Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                anyhow::bail!("simulated backend failure");
            }
        }

        let mut v = vec![0.0; self.dimension()];
        for token in crate::text::content_tokens(text) {
            for (topic, words) in self.topics.iter().enumerate() {
                if words.iter().any(|w| *w == token) {
                    v[topic] += TOPIC_WEIGHT;
                }
            }
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            v[self.topics.len() + (hasher.finish() as usize % HASH_BUCKETS)] += 1.0;
        }
        Ok(v)
    }

    fn dimension(&self) -> usize {
        self.topics.len() + HASH_BUCKETS
    }

    fn model_name(&self) -> &str {
        "lexicon-test"
    }
}

pub fn headlines(headings: &[&str]) -> Vec<Article> {
    headings
        .iter()
        .enumerate()
        .map(|(i, h)| Article::new(*h, "").with_source(format!("Outlet {}", i)))
        .collect()
}
