//! Trend detection
//!
//! Groups a batch of scraped articles into trends:
//! 1. Compare headlines (embeddings, or keyword overlap without a model)
//! 2. Cluster similar headlines
//! 3. Rank clusters by size and keep the top N
//! 4. Label each cluster with a topic and keywords

pub mod topic;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cluster::{cluster, target_cluster_count, Cluster, ClusterParams};
use crate::embedding::Vectorizer;
use crate::models::{Article, Trend};
use crate::similarity::{similarities_to, similarity_matrix_with_mode, SimilarityMatrix, SimilarityMode};

pub use topic::{extract_keywords, topic_name};

const UNKNOWN_SOURCE: &str = "Unknown";

/// Tuning for [`detect_trends`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendParams {
    /// Number of trends to return
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Minimum articles to form a trend
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,

    /// Minimum cosine similarity for articles to be grouped
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Minimum Jaccard similarity used instead when no embedding model is loaded
    #[serde(default = "default_keyword_similarity_threshold")]
    pub keyword_similarity_threshold: f32,

    #[serde(default = "default_top_n_keywords")]
    pub top_n_keywords: usize,
}

fn default_top_n() -> usize {
    5
}

fn default_min_cluster_size() -> usize {
    1
}

fn default_similarity_threshold() -> f32 {
    0.6
}

fn default_keyword_similarity_threshold() -> f32 {
    0.3
}

fn default_top_n_keywords() -> usize {
    10
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            min_cluster_size: default_min_cluster_size(),
            similarity_threshold: default_similarity_threshold(),
            keyword_similarity_threshold: default_keyword_similarity_threshold(),
            top_n_keywords: default_top_n_keywords(),
        }
    }
}

impl TrendParams {
    /// Jaccard scores run lower than cosine scores for same-topic text
    pub fn threshold_for(&self, mode: SimilarityMode) -> f32 {
        match mode {
            SimilarityMode::Vector => self.similarity_threshold,
            SimilarityMode::Jaccard => self.keyword_similarity_threshold,
        }
    }

    /// Replace the grouping threshold used in `mode`
    pub fn with_threshold_for(mut self, mode: SimilarityMode, threshold: f32) -> Self {
        match mode {
            SimilarityMode::Vector => self.similarity_threshold = threshold,
            SimilarityMode::Jaccard => self.keyword_similarity_threshold = threshold,
        }
        self
    }
}

/// Detect trending topics in a batch of articles.
///
/// Returns at most `top_n` trends, largest first. Too few articles, or too few
/// non-blank headlines, is not an error and yields an empty list.
pub fn detect_trends(articles: &[Article], vectorizer: &Vectorizer, params: &TrendParams) -> Vec<Trend> {
    if articles.is_empty() {
        tracing::warn!("No articles provided for trend detection");
        return Vec::new();
    }

    let min_size = params.min_cluster_size.max(1);
    if articles.len() < min_size {
        tracing::warn!(
            "Not enough articles for trend detection (need {}, got {})",
            min_size,
            articles.len()
        );
        return Vec::new();
    }

    let valid: Vec<&Article> = articles.iter().filter(|a| !a.heading.trim().is_empty()).collect();
    if valid.len() < min_size {
        tracing::warn!("Not enough valid headlines for trend detection");
        return Vec::new();
    }

    let mode = SimilarityMode::for_vectorizer(vectorizer);
    tracing::info!(
        "Analyzing {} articles for trends using {} similarity",
        valid.len(),
        mode
    );

    let headlines: Vec<&str> = valid.iter().map(|a| a.heading.as_str()).collect();
    let matrix = similarity_matrix_with_mode(&headlines, vectorizer, mode);

    let cluster_params = ClusterParams {
        target_clusters: target_cluster_count(params.top_n, valid.len()),
        min_cluster_size: min_size,
        similarity_threshold: params.threshold_for(mode),
    };
    tracing::debug!(
        "Clustering into {} groups (threshold {:.2})",
        cluster_params.target_clusters,
        cluster_params.similarity_threshold
    );

    let detected_at = Utc::now();
    let trends: Vec<Trend> = cluster(&matrix, &cluster_params)
        .iter()
        .take(params.top_n)
        .map(|c| synthesize(c, &valid, &matrix, params.top_n_keywords, detected_at))
        .collect();

    for trend in &trends {
        tracing::info!(
            "Trend: '{}' ({} articles, {} sources, cohesion {:.3})",
            trend.topic,
            trend.article_count,
            trend.sources.len(),
            trend.avg_similarity
        );
    }
    tracing::info!("Detected {} trending topics", trends.len());

    trends
}

/// Build the trend record for one cluster of `articles`.
pub fn synthesize(
    cluster: &Cluster,
    articles: &[&Article],
    matrix: &SimilarityMatrix,
    top_n_keywords: usize,
    detected_at: DateTime<Utc>,
) -> Trend {
    let members: Vec<&Article> = cluster.members.iter().map(|&i| articles[i]).collect();
    let headlines: Vec<&str> = members.iter().map(|a| a.heading.as_str()).collect();

    let sources: BTreeSet<String> = members
        .iter()
        .map(|a| {
            if a.source_name.trim().is_empty() {
                UNKNOWN_SOURCE.to_string()
            } else {
                a.source_name.clone()
            }
        })
        .collect();

    let first_seen = members
        .iter()
        .filter_map(|a| a.seen_at())
        .min()
        .unwrap_or(detected_at);

    Trend {
        topic: topic_name(&headlines),
        article_count: members.len(),
        keywords: extract_keywords(&members, top_n_keywords),
        article_ids: members.iter().filter_map(|a| a.id.clone()).collect(),
        articles: members.into_iter().cloned().collect(),
        avg_similarity: round3(cluster.cohesion),
        sources,
        first_seen,
        detected_at,
        similarity_mode: matrix.mode(),
    }
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

/// Articles in `pool` whose headline resembles the target's, best first.
pub fn find_related(
    target: &Article,
    pool: &[Article],
    vectorizer: &Vectorizer,
    top_n: usize,
    min_similarity: f32,
) -> Vec<(Article, f32)> {
    if target.heading.trim().is_empty() || pool.is_empty() {
        return Vec::new();
    }

    let mode = SimilarityMode::for_vectorizer(vectorizer);
    let candidates: Vec<&str> = pool.iter().map(|a| a.heading.as_str()).collect();
    let scores = similarities_to(&target.heading, &candidates, vectorizer, mode);

    let mut related: Vec<(Article, f32)> = pool
        .iter()
        .zip(scores)
        .filter(|(_, score)| *score >= min_similarity)
        .map(|(article, score)| (article.clone(), score))
        .collect();

    related.sort_by(|a, b| b.1.total_cmp(&a.1));
    related.truncate(top_n);
    related
}

/// Detector bound to a shared vectorizer and default parameters
pub struct TrendDetector {
    vectorizer: Arc<Vectorizer>,
    params: TrendParams,
}

impl TrendDetector {
    pub fn new(vectorizer: Arc<Vectorizer>, params: TrendParams) -> Self {
        Self { vectorizer, params }
    }

    pub fn params(&self) -> &TrendParams {
        &self.params
    }

    pub fn mode(&self) -> SimilarityMode {
        SimilarityMode::for_vectorizer(&self.vectorizer)
    }

    pub fn detect(&self, articles: &[Article]) -> Vec<Trend> {
        detect_trends(articles, &self.vectorizer, &self.params)
    }

    pub fn detect_with(&self, articles: &[Article], params: &TrendParams) -> Vec<Trend> {
        detect_trends(articles, &self.vectorizer, params)
    }

    pub fn related(&self, target: &Article, pool: &[Article], top_n: usize, min_similarity: f32) -> Vec<(Article, f32)> {
        find_related(target, pool, &self.vectorizer, top_n, min_similarity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::test_support::{headlines, LexiconBackend};
    use chrono::TimeZone;

    fn vector_detector() -> TrendDetector {
        let backend = Arc::new(LexiconBackend::news());
        let vectorizer = Vectorizer::new(backend, &EmbeddingConfig::default());
        TrendDetector::new(Arc::new(vectorizer), TrendParams::default())
    }

    fn scenario_articles() -> Vec<Article> {
        headlines(&[
            "Putin warns of military action",
            "Local team wins league championship",
            "Russia threatens new sanctions",
            "Apple unveils new iPhone features",
            "Putin issues warning to NATO",
            "Storm brings heavy rain to the coast",
        ])
    }

    #[test]
    fn test_russia_headlines_form_one_trend() {
        let detector = vector_detector();
        let params = TrendParams {
            top_n: 3,
            min_cluster_size: 2,
            ..TrendParams::default()
        };

        let trends = detector.detect_with(&scenario_articles(), &params);

        assert_eq!(trends.len(), 1);
        let trend = &trends[0];
        assert_eq!(trend.article_count, 3);
        assert!(trend.topic.contains("Putin") || trend.topic.contains("Russia"));
        assert_eq!(trend.similarity_mode, SimilarityMode::Vector);
        assert_eq!(trend.sources.len(), 3);
        let members: Vec<&str> = trend.articles.iter().map(|a| a.heading.as_str()).collect();
        assert_eq!(
            members,
            vec![
                "Putin warns of military action",
                "Russia threatens new sanctions",
                "Putin issues warning to NATO",
            ]
        );
    }

    #[test]
    fn test_threshold_override_targets_active_mode() {
        let params = TrendParams::default();

        let keyword = params.with_threshold_for(SimilarityMode::Jaccard, 0.5);
        assert_eq!(keyword.threshold_for(SimilarityMode::Jaccard), 0.5);
        assert_eq!(keyword.similarity_threshold, 0.6);

        let vector = params.with_threshold_for(SimilarityMode::Vector, 0.75);
        assert_eq!(vector.threshold_for(SimilarityMode::Vector), 0.75);
        assert_eq!(vector.keyword_similarity_threshold, 0.3);
    }

    #[test]
    fn test_empty_input() {
        let detector = vector_detector();
        assert!(detector.detect(&[]).is_empty());
    }

    #[test]
    fn test_blank_headlines_yield_nothing() {
        let detector = vector_detector();
        let articles = headlines(&["  ", "", "\t"]);
        assert!(detector.detect(&articles).is_empty());
    }

    #[test]
    fn test_fewer_articles_than_min_cluster_size() {
        let detector = vector_detector();
        let params = TrendParams {
            min_cluster_size: 4,
            ..TrendParams::default()
        };
        let articles = headlines(&["Putin warns NATO", "Russia sanctions", "Kremlin warning"]);
        assert!(detector.detect_with(&articles, &params).is_empty());
    }

    #[test]
    fn test_output_respects_size_and_rank_invariants() {
        let detector = vector_detector();
        let params = TrendParams {
            top_n: 5,
            min_cluster_size: 2,
            ..TrendParams::default()
        };
        let articles = headlines(&[
            "Storm floods the coast",
            "Putin warns NATO",
            "Hurricane rain hits coast",
            "Russia threatens sanctions",
            "Kremlin issues warning",
            "Apple chip shortage",
        ]);

        let trends = detector.detect_with(&articles, &params);
        assert!(!trends.is_empty());
        assert!(trends.iter().all(|t| t.article_count >= 2));
        assert!(trends.windows(2).all(|w| w[0].article_count >= w[1].article_count));
    }

    #[test]
    fn test_detection_is_deterministic() {
        let detector = vector_detector();
        let params = TrendParams {
            top_n: 3,
            min_cluster_size: 1,
            ..TrendParams::default()
        };

        let first = detector.detect_with(&scenario_articles(), &params);
        let second = detector.detect_with(&scenario_articles(), &params);

        let summary = |trends: &[Trend]| {
            trends
                .iter()
                .map(|t| (t.topic.clone(), t.keywords.clone(), t.article_count))
                .collect::<Vec<_>>()
        };
        assert_eq!(summary(&first), summary(&second));
    }

    #[test]
    fn test_keyword_fallback_still_clusters() {
        let vectorizer = Arc::new(Vectorizer::unavailable());
        let detector = TrendDetector::new(vectorizer, TrendParams::default());
        let params = TrendParams {
            min_cluster_size: 2,
            ..TrendParams::default()
        };
        let articles = headlines(&[
            "Earthquake strikes Tokyo suburbs",
            "Central bank raises interest rates",
            "Powerful earthquake strikes Tokyo",
        ]);

        let trends = detector.detect_with(&articles, &params);
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].article_count, 2);
        assert_eq!(trends[0].similarity_mode, SimilarityMode::Jaccard);
        assert_eq!(trends[0].topic, "Tokyo Earthquake");
    }

    #[test]
    fn test_trend_metadata() {
        let detector = vector_detector();
        let early = Utc.with_ymd_and_hms(2026, 10, 1, 6, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
        let articles = vec![
            Article::new("Putin warns NATO", "")
                .with_id("a1")
                .with_source("Wire")
                .with_scraped_at(late),
            Article::new("Kremlin warning to NATO", "").with_published_at(early),
            Article::new("Russia threatens sanctions", "")
                .with_id("a3")
                .with_source("Wire"),
            Article::new("Local team wins league championship", ""),
            Article::new("Apple unveils new iPhone features", ""),
            Article::new("Storm brings heavy rain to the coast", ""),
        ];
        let params = TrendParams {
            min_cluster_size: 2,
            ..TrendParams::default()
        };

        let trends = detector.detect_with(&articles, &params);
        assert_eq!(trends.len(), 1);
        let trend = &trends[0];
        assert_eq!(trend.first_seen, early);
        assert_eq!(trend.article_ids, vec!["a1", "a3"]);
        let sources: Vec<&str> = trend.sources.iter().map(String::as_str).collect();
        assert_eq!(sources, vec!["Unknown", "Wire"]);
        assert!(trend.avg_similarity > 0.6 && trend.avg_similarity <= 1.0);
    }

    #[test]
    fn test_find_related() {
        let detector = vector_detector();
        let target = Article::new("Putin warns NATO", "");
        let pool = scenario_articles();

        let related = detector.related(&target, &pool, 2, 0.5);
        assert_eq!(related.len(), 2);
        assert!(related[0].1 >= related[1].1);
        assert!(related
            .iter()
            .all(|(a, _)| a.heading.contains("Putin") || a.heading.contains("Russia")));

        assert!(detector.related(&Article::new(" ", ""), &pool, 2, 0.5).is_empty());
    }
}
