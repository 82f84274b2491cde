//! Near-duplicate detection against recently stored articles
//!
//! A candidate text is embedded once and compared with the vectors stored for
//! articles scraped inside a trailing time window. Stored vectors are the ones
//! computed at scrape time; they are never recomputed here.
//!
//! Without an embedding backend the check is skipped (never a duplicate).
//! Keyword overlap misfires too often on short articles to be trusted for
//! suppressing content.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::embedding::{cosine_similarity, Embedding, Vectorizer};
use crate::models::Article;
use crate::text::char_prefix;

/// A previously embedded article in the comparison window
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusEntry {
    pub article_id: Option<String>,
    pub heading: String,
    pub embedding: Embedding,
    pub scraped_at: DateTime<Utc>,
}

/// Source of the windowed corpus. Filtering by time is the reader's job.
#[async_trait]
pub trait CorpusReader: Send + Sync {
    async fn fetch_recent_vectors(&self, window_hours: u32) -> anyhow::Result<Vec<CorpusEntry>>;
}

/// Corpus held in memory, e.g. articles accepted earlier in the same batch
#[derive(Default)]
pub struct InMemoryCorpus {
    entries: RwLock<Vec<CorpusEntry>>,
    now: Option<DateTime<Utc>>,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the window against a fixed clock instead of `Utc::now()`
    pub fn with_clock(now: DateTime<Utc>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            now: Some(now),
        }
    }

    /// Corpus for comparing the articles of one batch with each other.
    ///
    /// The clock is the batch's latest scrape time, so an old batch still has its
    /// members compared. Articles without `scraped_at` count as scraped now.
    pub fn for_batch(articles: &[Article]) -> Self {
        let latest = articles
            .iter()
            .map(|a| a.scraped_at.unwrap_or_else(Utc::now))
            .max()
            .unwrap_or_else(Utc::now);
        Self::with_clock(latest)
    }

    pub fn push(&self, entry: CorpusEntry) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries scraped within `window_hours` of the clock
    pub fn recent(&self, window_hours: u32) -> Vec<CorpusEntry> {
        let now = self.now.unwrap_or_else(Utc::now);
        let cutoff = now - Duration::hours(i64::from(window_hours));
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| e.scraped_at >= cutoff)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CorpusReader for InMemoryCorpus {
    async fn fetch_recent_vectors(&self, window_hours: u32) -> anyhow::Result<Vec<CorpusEntry>> {
        Ok(self.recent(window_hours))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DedupParams {
    /// Minimum cosine similarity to count as a duplicate
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Texts shorter than this (after trimming) are never duplicates
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,

    #[serde(default = "default_window_hours")]
    pub window_hours: u32,
}

fn default_similarity_threshold() -> f32 {
    0.85
}

fn default_min_text_chars() -> usize {
    50
}

fn default_window_hours() -> u32 {
    48
}

impl Default for DedupParams {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            min_text_chars: default_min_text_chars(),
            window_hours: default_window_hours(),
        }
    }
}

/// The stored article a candidate duplicates
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch {
    pub article_id: Option<String>,
    pub heading: String,
    pub similarity: f32,
}

pub struct DuplicateDetector {
    vectorizer: Arc<Vectorizer>,
    params: DedupParams,
}

impl DuplicateDetector {
    pub fn new(vectorizer: Arc<Vectorizer>, params: DedupParams) -> Self {
        Self { vectorizer, params }
    }

    pub fn params(&self) -> &DedupParams {
        &self.params
    }

    pub fn is_enabled(&self) -> bool {
        self.vectorizer.is_available()
    }

    /// First corpus entry at or above `threshold`, scanning in corpus order.
    pub fn find_duplicate(
        &self,
        text: &str,
        corpus: &[CorpusEntry],
        threshold: f32,
    ) -> Option<DuplicateMatch> {
        let candidate = self.candidate_embedding(text)?;

        corpus.iter().find_map(|entry| {
            if entry.embedding.is_empty() {
                return None;
            }
            let similarity = cosine_similarity(&candidate, &entry.embedding);
            (similarity >= threshold).then(|| {
                tracing::debug!(
                    "Duplicate detected (similarity: {:.2}): {}...",
                    similarity,
                    char_prefix(&entry.heading, 50)
                );
                DuplicateMatch {
                    article_id: entry.article_id.clone(),
                    heading: entry.heading.clone(),
                    similarity,
                }
            })
        })
    }

    pub fn is_duplicate(&self, text: &str, corpus: &[CorpusEntry], threshold: f32) -> bool {
        self.find_duplicate(text, corpus, threshold).is_some()
    }

    /// Check against the configured window of a corpus reader.
    ///
    /// Reader failures are logged and treated as "not a duplicate".
    pub async fn check(&self, text: &str, reader: &dyn CorpusReader, threshold: f32) -> bool {
        self.check_match(text, reader, threshold).await.is_some()
    }

    pub async fn check_match(
        &self,
        text: &str,
        reader: &dyn CorpusReader,
        threshold: f32,
    ) -> Option<DuplicateMatch> {
        if !self.worth_checking(text) {
            return None;
        }

        match reader.fetch_recent_vectors(self.params.window_hours).await {
            Ok(corpus) => self.find_duplicate(text, &corpus, threshold),
            Err(e) => {
                tracing::error!("Error checking duplicate: {:#}", e);
                None
            }
        }
    }

    /// Embed the candidate through the shared cache, if it can be compared at all
    pub fn candidate_embedding(&self, text: &str) -> Option<Embedding> {
        if !self.worth_checking(text) {
            return None;
        }
        match self.vectorizer.vectorize(text) {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                tracing::warn!("Could not embed duplicate candidate: {}", e);
                None
            }
        }
    }

    fn worth_checking(&self, text: &str) -> bool {
        self.vectorizer.is_available() && text.trim().chars().count() >= self.params.min_text_chars
    }
}
