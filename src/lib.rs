//! trendwatch - news trend detection and near-duplicate filtering
//!
//! Turns a batch of scraped news articles into ranked trending topics and decides
//! whether a newly scraped article repeats one already stored.
//!
//! # Architecture
//!
//! - **Vectorizer**: headline and body text to embeddings through a local FastEmbed
//!   model, behind a bounded fingerprint cache. When no model can be loaded every
//!   consumer falls back to keyword overlap.
//! - **Trend detection**: pairwise similarity, clustering, ranking and topic labels
//! - **Duplicate detection**: cosine comparison against vectors stored for a
//!   trailing 48 hour window
//! - **Store**: SQLite persistence of articles, their scrape-time embeddings and
//!   detected trends
//!
//! # Main modules
//!
//! - [`embedding`] - embedding backend, cache and [`Vectorizer`]
//! - [`trends`] - [`TrendDetector`] and related-article lookup
//! - [`dedup`] - [`DuplicateDetector`] and the corpus it reads
//! - [`db`] - [`ArticleStore`]
//! - [`config`] - layered configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trendwatch::{config::AppConfig, Article, TrendDetector, Vectorizer};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = AppConfig::load(None)?;
//! let vectorizer = Arc::new(Vectorizer::from_config(&config.embedding));
//! let detector = TrendDetector::new(vectorizer, config.trends);
//!
//! let articles = vec![
//!     Article::new("Putin warns of military action", ""),
//!     Article::new("Russia threatens new sanctions", ""),
//! ];
//! for trend in detector.detect(&articles) {
//!     println!("{} ({} articles)", trend.topic, trend.article_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod config;
pub mod db;
pub mod dedup;
pub mod embedding;
pub mod logging;
pub mod models;
pub mod similarity;
pub mod text;
pub mod trends;

#[cfg(test)]
mod test_support;

pub use db::{ArticleStore, StoreError};
pub use dedup::{CorpusEntry, CorpusReader, DedupParams, DuplicateDetector, InMemoryCorpus};
pub use embedding::{EmbeddingBackend, Vectorizer};
pub use models::{Article, Trend};
pub use similarity::SimilarityMode;
pub use trends::{detect_trends, find_related, TrendDetector, TrendParams};
