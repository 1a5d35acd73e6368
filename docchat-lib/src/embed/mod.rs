//! Text embedding using local models
//!
//! Uses sentence-transformers/all-MiniLM-L6-v2 via the fastembed crate
//! (ONNX runtime).
//!
//! # Model Details
//!
//! - Dimensions: 384
//! - Max tokens: 256
//! - Same model for documents and queries, no prompt prefix
//!
//! Whatever model built an index must also embed the queries against it;
//! the persisted index records the model name and dimension to enforce this.
//!
//! # Usage
//!
//! ```ignore
//! use docchat_lib::embed::{Embedder, MiniLmEmbedder};
//!
//! let mut embedder = MiniLmEmbedder::new()?;
//!
//! // Embed documents (for indexing)
//! let doc_embeddings = embedder.embed_documents(&["Refund policy...", "Shipping times..."])?;
//!
//! // Embed query (for searching)
//! let query_embedding = embedder.embed_query("What is the refund policy?")?;
//! ```

use crate::Result;

/// A vector embedding - fixed size array of floats
pub type Embedding = Vec<f32>;

/// Trait for text embedding models
pub trait Embedder: Send + Sync {
    /// Embed multiple documents for indexing
    ///
    /// Documents may be batched for efficiency.
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single query for searching
    ///
    /// Note: Some models use different prompts for queries vs documents.
    /// This method handles that distinction.
    fn embed_query(&mut self, text: &str) -> Result<Embedding>;

    /// Returns the embedding dimension
    fn dimension(&self) -> usize;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

mod minilm;
pub use minilm::*;

impl<T: Embedder + ?Sized> Embedder for &mut T {
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        (**self).embed_documents(texts)
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        (**self).embed_query(text)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        (**self).embed_documents(texts)
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        (**self).embed_query(text)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
