use std::path::PathBuf;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::embed::{Embedder, Embedding};
use crate::{Error, Result};

/// Documents embedded per ONNX batch.
const BATCH_SIZE: usize = 64;

/// Sentence embedder using sentence-transformers/all-MiniLM-L6-v2.
///
/// Uses fastembed for ONNX-based inference. This model produces
/// 384-dimensional embeddings.
pub struct MiniLmEmbedder {
    model: TextEmbedding,
}

impl MiniLmEmbedder {
    pub const MODEL_NAME: &'static str = "sentence-transformers/all-MiniLM-L6-v2";
    pub const DIMENSION: usize = 384;

    /// Create a new MiniLM embedder using fastembed's default model cache.
    ///
    /// Downloads the model on first use (~90MB).
    pub fn new() -> Result<Self> {
        Self::with_options(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
    }

    /// Create an embedder whose model files live under `cache_dir`.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_options(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_cache_dir(cache_dir.into()),
        )
    }

    fn with_options(opts: InitOptions) -> Result<Self> {
        tracing::debug!(model = Self::MODEL_NAME, "loading embedding model");
        TextEmbedding::try_new(opts.with_show_download_progress(true))
            .map(|model| Self { model })
            .map_err(|e| Error::Embedding(e.to_string()))
    }
}

impl Embedder for MiniLmEmbedder {
    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }

    fn dimension(&self) -> usize {
        Self::DIMENSION
    }

    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.model
            .embed(texts, Some(BATCH_SIZE))
            .map_err(|e| Error::Embedding(e.to_string()))
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        self.model
            .embed(vec![text], None)
            .map_err(|e| Error::Embedding(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("model returned no embeddings".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires model download, run with: cargo test -- --ignored
    fn test_dimension_matches_model_output() {
        let mut embedder = MiniLmEmbedder::new().unwrap();
        let embedding = embedder.embed_query("What is the refund policy?").unwrap();
        assert_eq!(embedding.len(), embedder.dimension());
    }

    #[test]
    #[ignore] // Requires model download
    fn test_related_text_scores_higher() {
        let mut embedder = MiniLmEmbedder::new().unwrap();
        let docs = embedder
            .embed_documents(&[
                "Customers may request a refund within 30 days of purchase.",
                "The office is closed on public holidays.",
            ])
            .unwrap();
        let query = embedder.embed_query("How do refunds work?").unwrap();

        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        assert!(dot(&query, &docs[0]) > dot(&query, &docs[1]));
    }
}
