//! End-to-end trend detection with a fake embedding model and in keyword mode

mod common;

use common::{articles, keyword_vectorizer, vector_vectorizer};
use trendwatch::{detect_trends, SimilarityMode, TrendDetector, TrendParams};

fn params(top_n: usize, min_cluster_size: usize) -> TrendParams {
    TrendParams {
        top_n,
        min_cluster_size,
        ..TrendParams::default()
    }
}

#[test]
fn test_russia_headlines_form_one_trend() {
    let batch = articles(&[
        "Putin warns of military action",
        "Local team wins league championship",
        "Russia threatens new sanctions",
        "Apple unveils new iPhone features",
        "Putin issues warning to NATO",
        "Storm brings heavy rain to the coast",
    ]);

    let trends = detect_trends(&batch, &vector_vectorizer(), &params(3, 2));

    assert_eq!(trends.len(), 1);
    let trend = &trends[0];
    assert_eq!(trend.article_count, 3);
    assert_eq!(trend.article_ids, vec!["a0", "a2", "a4"]);
    assert!(trend.topic.contains("Putin") || trend.topic.contains("Russia"));
    assert_eq!(trend.similarity_mode, SimilarityMode::Vector);
    assert!(trend.avg_similarity > 0.6);
    assert!(trend.first_seen <= trend.detected_at);
}

#[test]
fn test_empty_batch_has_no_trends() {
    assert!(detect_trends(&[], &vector_vectorizer(), &params(5, 1)).is_empty());
    assert!(detect_trends(&[], &keyword_vectorizer(), &params(5, 1)).is_empty());
}

#[test]
fn test_keyword_fallback_still_clusters() {
    let batch = articles(&[
        "Earthquake strikes Tokyo suburbs",
        "Local team wins league championship",
        "Powerful earthquake strikes Tokyo",
    ]);

    let detector = TrendDetector::new(keyword_vectorizer(), params(5, 2));
    assert_eq!(detector.mode(), SimilarityMode::Jaccard);

    let trends = detector.detect(&batch);
    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0].article_ids, vec!["a0", "a2"]);
    assert_eq!(trends[0].similarity_mode, SimilarityMode::Jaccard);
    assert_eq!(trends[0].sources.len(), 1);
}

#[test]
fn test_trends_are_ranked_and_capped() {
    let batch = articles(&[
        "Putin warns of military action",
        "Local team wins league championship",
        "Russia threatens new sanctions",
        "Coach praises team after league match",
        "Putin issues warning to NATO",
        "Kremlin rejects NATO sanctions",
        "Apple unveils new iPhone features",
        "Storm brings heavy rain to the coast",
    ]);

    let trends = detect_trends(&batch, &vector_vectorizer(), &params(5, 1));
    assert_eq!(trends.len(), 4);
    for pair in trends.windows(2) {
        assert!(pair[0].article_count >= pair[1].article_count);
    }
    assert_eq!(trends[0].article_count, 4);
    assert_eq!(trends[1].article_count, 2);

    let capped = detect_trends(&batch, &vector_vectorizer(), &params(1, 1));
    assert_eq!(capped.len(), 1);
}

#[test]
fn test_related_articles() {
    let batch = articles(&[
        "Putin warns of military action",
        "Russia threatens new sanctions",
        "Apple unveils new iPhone features",
    ]);
    let detector = TrendDetector::new(vector_vectorizer(), TrendParams::default());

    let related = detector.related(&batch[0], &batch[1..], 5, 0.5);
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].0.heading, "Russia threatens new sanctions");
}
