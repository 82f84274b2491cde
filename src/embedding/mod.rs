//! Embedding Module
//!
//! Turns article text into fixed-length vectors. The model itself sits behind
//! [`EmbeddingBackend`] so the engine can run against FastEmbed (ONNX-based, local
//! inference), a test double, or nothing at all when the model cannot be loaded.

mod cache;
mod vectorizer;

pub use cache::{evict_oldest_half, CacheStats, Fingerprint, VectorCache};
pub use vectorizer::{VectorizeError, Vectorizer};

use anyhow::{Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

/// A dense text embedding
pub type Embedding = Vec<f32>;

/// Default embedding model name
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Embedding dimension for AllMiniLML6V2
pub const EMBEDDING_DIMENSION: usize = 384;

/// Capability that turns text into an embedding.
pub trait EmbeddingBackend: Send + Sync {
    fn encode(&self, text: &str) -> Result<Embedding>;

    /// Embed several texts in one call. Backends with real batching override this.
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }

    /// Length of every vector this backend produces
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Map a configured model name onto a FastEmbed model.
pub fn parse_model_name(name: &str) -> Option<EmbeddingModel> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" | "allminilml6v2" => Some(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" | "allminilml12v2" => Some(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" | "bgesmallenv15" => Some(EmbeddingModel::BGESmallENV15),
        _ => None,
    }
}

/// FastEmbed sentence-transformer backend.
pub struct FastEmbedBackend {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

static SHARED_BACKEND: OnceLock<Option<Arc<FastEmbedBackend>>> = OnceLock::new();

impl FastEmbedBackend {
    /// Load a model, downloading it into `cache_dir` on first use.
    pub fn load(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self> {
        let embedding_model = parse_model_name(model_name)
            .with_context(|| format!("Unknown embedding model: {}", model_name))?;

        let mut init_options = InitOptions::new(embedding_model);
        if let Some(dir) = cache_dir {
            init_options = init_options.with_cache_dir(dir);
        }

        let model =
            TextEmbedding::try_new(init_options).context("Failed to initialize embedding model")?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimension: EMBEDDING_DIMENSION,
        })
    }

    /// Process-wide backend, loaded once.
    ///
    /// Concurrent first callers block on the same initialization and all observe
    /// the same instance. A failed load is also remembered, so `None` is returned
    /// without retrying.
    pub fn shared(model_name: &str, cache_dir: Option<PathBuf>) -> Option<Arc<Self>> {
        let backend = SHARED_BACKEND.get_or_init(|| {
            tracing::info!("Loading sentence embedding model {}...", model_name);
            match Self::load(model_name, cache_dir) {
                Ok(backend) => {
                    tracing::info!("Embedding model loaded successfully");
                    Some(Arc::new(backend))
                }
                Err(e) => {
                    tracing::warn!("Embedding model unavailable: {:#}", e);
                    None
                }
            }
        });

        if let Some(loaded) = backend {
            if loaded.model_name != model_name {
                tracing::warn!(
                    "Embedding model {} requested but {} is already loaded",
                    model_name,
                    loaded.model_name
                );
            }
        }

        backend.clone()
    }
}

impl EmbeddingBackend for FastEmbedBackend {
    fn encode(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.encode_batch(&[text])?;
        embeddings.pop().context("No embedding generated")
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let model = self
            .model
            .lock()
            .map_err(|_| anyhow::anyhow!("Embedding model lock poisoned"))?;
        let embeddings = model
            .embed(texts.to_vec(), None)
            .context("Failed to generate embeddings")?;

        if embeddings.len() != texts.len() {
            anyhow::bail!(
                "Expected {} embeddings, model returned {}",
                texts.len(),
                embeddings.len()
            );
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Calculate cosine similarity between two embeddings.
///
/// Mismatched lengths and zero-norm vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Normalize an embedding vector to unit length
pub fn normalize(embedding: &mut [f32]) {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in embedding.iter_mut() {
            *val /= norm;
        }
    }
}

/// Helper to convert embedding to blob for SQLite storage
pub fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Helper to convert blob from SQLite to embedding
pub fn blob_to_embedding(blob: &[u8]) -> Result<Embedding> {
    if blob.len() % 4 != 0 {
        anyhow::bail!("Invalid blob size for f32 array");
    }

    let mut embedding = Vec::with_capacity(blob.len() / 4);
    for chunk in blob.chunks_exact(4) {
        let bytes: [u8; 4] = chunk.try_into().context("Invalid chunk size")?;
        embedding.push(f32::from_le_bytes(bytes));
    }

    Ok(embedding)
}
