//! Pairwise similarity between texts
//!
//! Two modes, chosen once per batch from the vectorizer's availability:
//! cosine similarity of embeddings, or Jaccard similarity of stopword-filtered
//! token sets when no embedding backend is loaded.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::embedding::{cosine_similarity, Embedding, Vectorizer};
use crate::text::token_set;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMode {
    /// Cosine similarity of embeddings
    Vector,
    /// Keyword overlap fallback
    Jaccard,
}

impl SimilarityMode {
    pub fn for_vectorizer(vectorizer: &Vectorizer) -> Self {
        if vectorizer.is_available() {
            Self::Vector
        } else {
            Self::Jaccard
        }
    }
}

impl fmt::Display for SimilarityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector => write!(f, "vector"),
            Self::Jaccard => write!(f, "jaccard"),
        }
    }
}

/// Square, symmetric similarity matrix with a unit diagonal and entries in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f32>,
    mode: SimilarityMode,
}

impl SimilarityMatrix {
    /// Fill from a pairwise score function evaluated on the upper triangle.
    pub fn from_fn(n: usize, mode: SimilarityMode, mut score: impl FnMut(usize, usize) -> f32) -> Self {
        let mut values = vec![0.0f32; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let s = clamp_unit(score(i, j));
                values[i * n + j] = s;
                values[j * n + i] = s;
            }
        }
        Self { n, values, mode }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn mode(&self) -> SimilarityMode {
        self.mode
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.n + j]
    }

    /// Mean of the off-diagonal similarities among `members`; 1.0 for fewer than two.
    pub fn cohesion(&self, members: &[usize]) -> f32 {
        if members.len() < 2 {
            return 1.0;
        }

        let mut sum = 0.0f32;
        let mut count = 0usize;
        for &i in members {
            for &j in members {
                if i != j {
                    sum += self.get(i, j);
                    count += 1;
                }
            }
        }
        sum / count as f32
    }
}

/// NaN and out-of-range scores are pulled back into [0, 1].
fn clamp_unit(s: f32) -> f32 {
    if s.is_nan() {
        0.0
    } else {
        s.clamp(0.0, 1.0)
    }
}

/// Jaccard similarity of two token sets; 0.0 if either is empty.
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    intersection / union
}

/// Keyword overlap between two texts
pub fn keyword_similarity(text_a: &str, text_b: &str) -> f32 {
    jaccard_similarity(&token_set(text_a), &token_set(text_b))
}

/// Similarity matrix using the mode the vectorizer supports.
pub fn similarity_matrix(texts: &[&str], vectorizer: &Vectorizer) -> SimilarityMatrix {
    similarity_matrix_with_mode(texts, vectorizer, SimilarityMode::for_vectorizer(vectorizer))
}

/// Similarity matrix in an explicit mode.
///
/// In vector mode a text that cannot be embedded scores 0.0 against every other
/// text and keeps its unit diagonal.
pub fn similarity_matrix_with_mode(
    texts: &[&str],
    vectorizer: &Vectorizer,
    mode: SimilarityMode,
) -> SimilarityMatrix {
    match mode {
        SimilarityMode::Vector => {
            let embeddings = vectorizer.vectorize_batch(texts);
            SimilarityMatrix::from_fn(texts.len(), mode, |i, j| {
                pair_cosine(&embeddings[i], &embeddings[j])
            })
        }
        SimilarityMode::Jaccard => {
            let sets: Vec<HashSet<String>> = texts.iter().map(|t| token_set(t)).collect();
            SimilarityMatrix::from_fn(texts.len(), mode, |i, j| {
                jaccard_similarity(&sets[i], &sets[j])
            })
        }
    }
}

/// Similarity of `query` against each candidate, without building a full matrix.
pub fn similarities_to(
    query: &str,
    candidates: &[&str],
    vectorizer: &Vectorizer,
    mode: SimilarityMode,
) -> Vec<f32> {
    match mode {
        SimilarityMode::Vector => {
            let query_embedding = vectorizer.vectorize(query).ok();
            vectorizer
                .vectorize_batch(candidates)
                .iter()
                .map(|candidate| clamp_unit(pair_cosine(&query_embedding, candidate)))
                .collect()
        }
        SimilarityMode::Jaccard => {
            let query_set = token_set(query);
            candidates
                .iter()
                .map(|c| jaccard_similarity(&query_set, &token_set(c)))
                .collect()
        }
    }
}

fn pair_cosine(a: &Option<Embedding>, b: &Option<Embedding>) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) => cosine_similarity(a, b),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::test_support::LexiconBackend;
    use std::sync::Arc;

    const TEXTS: [&str; 5] = [
        "Putin warns of military action",
        "Russia threatens new sanctions",
        "Local team wins league championship",
        "",
        "Storm brings heavy rain to the coast",
    ];

    fn assert_well_formed(m: &SimilarityMatrix) {
        for i in 0..m.len() {
            assert_eq!(m.get(i, i), 1.0);
            for j in 0..m.len() {
                let s = m.get(i, j);
                assert!((0.0..=1.0).contains(&s), "entry ({}, {}) = {}", i, j, s);
                assert_eq!(s, m.get(j, i));
            }
        }
    }

    #[test]
    fn test_vector_matrix_well_formed() {
        let v = Vectorizer::new(Arc::new(LexiconBackend::news()), &EmbeddingConfig::default());
        let m = similarity_matrix(&TEXTS, &v);

        assert_eq!(m.mode(), SimilarityMode::Vector);
        assert_well_formed(&m);
        assert!(m.get(0, 1) > 0.6);
        assert!(m.get(0, 2) < 0.3);
        // Blank text embeds to the zero placeholder
        assert_eq!(m.get(3, 0), 0.0);
    }

    #[test]
    fn test_jaccard_matrix_well_formed() {
        let v = Vectorizer::unavailable();
        let m = similarity_matrix(&TEXTS, &v);

        assert_eq!(m.mode(), SimilarityMode::Jaccard);
        assert_well_formed(&m);
        assert_eq!(m.get(3, 4), 0.0);
    }

    #[test]
    fn test_unembeddable_item_scores_zero() {
        let backend = Arc::new(LexiconBackend::news().failing_on("military"));
        let v = Vectorizer::new(backend, &EmbeddingConfig::default());
        let m = similarity_matrix(&TEXTS[..2], &v);

        assert_well_formed(&m);
        assert_eq!(m.get(0, 1), 0.0);
    }

    #[test]
    fn test_keyword_similarity() {
        let s = keyword_similarity(
            "Earthquake strikes Tokyo suburbs",
            "Powerful earthquake strikes Tokyo",
        );
        // {earthquake, strikes, tokyo} shared out of {earthquake, strikes, tokyo, suburbs, powerful}
        assert!((s - 0.6).abs() < 1e-6);
        assert_eq!(keyword_similarity("the and of", "Tokyo"), 0.0);
    }

    #[test]
    fn test_cohesion() {
        let m = SimilarityMatrix::from_fn(3, SimilarityMode::Jaccard, |i, j| {
            if i == 0 && j == 1 {
                0.5
            } else {
                0.2
            }
        });

        assert_eq!(m.cohesion(&[0]), 1.0);
        assert!((m.cohesion(&[0, 1]) - 0.5).abs() < 1e-6);
        assert!((m.cohesion(&[0, 1, 2]) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_similarities_to() {
        let v = Vectorizer::new(Arc::new(LexiconBackend::news()), &EmbeddingConfig::default());
        let scores = similarities_to(TEXTS[0], &TEXTS[1..3], &v, SimilarityMode::Vector);

        assert_eq!(scores.len(), 2);
        assert!(scores[0] > scores[1]);
    }
}
