use std::sync::Arc;
use thiserror::Error;

use super::{Embedding, EmbeddingBackend, FastEmbedBackend, VectorCache};
use crate::config::EmbeddingConfig;
use crate::embedding::CacheStats;

#[derive(Error, Debug)]
pub enum VectorizeError {
    #[error("Embedding backend is unavailable")]
    Unavailable,

    #[error("Embedding backend failed: {0}")]
    Backend(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Text-to-vector front end: an optional backend plus the shared cache.
///
/// Availability is fixed at construction. Callers check [`Vectorizer::is_available`]
/// once per batch and pick their similarity mode from it.
pub struct Vectorizer {
    backend: Option<Arc<dyn EmbeddingBackend>>,
    cache: VectorCache,
}

impl Vectorizer {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, config: &EmbeddingConfig) -> Self {
        Self {
            backend: Some(backend),
            cache: VectorCache::new(config.cache_capacity, config.fingerprint_chars),
        }
    }

    /// A vectorizer with no backend; every similarity consumer falls back.
    pub fn unavailable() -> Self {
        let config = EmbeddingConfig::default();
        Self {
            backend: None,
            cache: VectorCache::new(config.cache_capacity, config.fingerprint_chars),
        }
    }

    /// Build from configuration, loading the shared FastEmbed model unless disabled.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        if !config.enabled {
            tracing::info!("Embeddings disabled by configuration, using keyword similarity");
            return Self::unavailable();
        }

        match FastEmbedBackend::shared(&config.model, config.cache_dir.clone()) {
            Some(backend) => Self::new(backend, config),
            None => {
                tracing::warn!("Embedding backend unavailable, using keyword similarity");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.backend.as_ref().map(|b| b.dimension())
    }

    pub fn model_name(&self) -> Option<&str> {
        self.backend.as_ref().map(|b| b.model_name())
    }

    /// Embed one text through the cache.
    ///
    /// Blank text yields an all-zero placeholder, which scores 0.0 against everything.
    pub fn vectorize(&self, text: &str) -> Result<Embedding, VectorizeError> {
        let backend = self.backend.as_ref().ok_or(VectorizeError::Unavailable)?;

        if text.trim().is_empty() {
            return Ok(vec![0.0; backend.dimension()]);
        }

        let key = self.cache.fingerprint(text);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let embedding = backend
            .encode(text)
            .map_err(|e| VectorizeError::Backend(format!("{:#}", e)))?;
        check_dimension(backend.dimension(), &embedding)?;

        self.cache.insert(key, embedding.clone());
        Ok(embedding)
    }

    /// Embed several texts, one backend call for all cache misses.
    ///
    /// A `None` slot is an item that could not be embedded. If the batch call
    /// fails, misses are retried one at a time so a single bad item only loses itself.
    pub fn vectorize_batch(&self, texts: &[&str]) -> Vec<Option<Embedding>> {
        let Some(backend) = self.backend.as_ref() else {
            return vec![None; texts.len()];
        };

        let mut results: Vec<Option<Embedding>> = Vec::with_capacity(texts.len());
        let mut misses = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                results.push(Some(vec![0.0; backend.dimension()]));
                continue;
            }
            let key = self.cache.fingerprint(text);
            match self.cache.get(&key) {
                Some(cached) => results.push(Some(cached)),
                None => {
                    results.push(None);
                    misses.push((i, key));
                }
            }
        }

        if misses.is_empty() {
            return results;
        }

        let miss_texts: Vec<&str> = misses.iter().map(|(i, _)| texts[*i]).collect();
        match backend.encode_batch(&miss_texts) {
            Ok(embeddings) if embeddings.len() == misses.len() => {
                for ((i, key), embedding) in misses.into_iter().zip(embeddings) {
                    if let Err(e) = check_dimension(backend.dimension(), &embedding) {
                        tracing::warn!("Skipping article {}: {}", i, e);
                        continue;
                    }
                    self.cache.insert(key, embedding.clone());
                    results[i] = Some(embedding);
                }
            }
            outcome => {
                if let Err(e) = outcome {
                    tracing::warn!("Batch embedding failed, retrying items one by one: {:#}", e);
                }
                for (i, _) in misses {
                    match self.vectorize(texts[i]) {
                        Ok(embedding) => results[i] = Some(embedding),
                        Err(e) => tracing::warn!("Could not embed article {}: {}", i, e),
                    }
                }
            }
        }

        results
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn check_dimension(expected: usize, embedding: &[f32]) -> Result<(), VectorizeError> {
    if embedding.len() != expected {
        return Err(VectorizeError::DimensionMismatch {
            expected,
            got: embedding.len(),
        });
    }
    Ok(())
}
