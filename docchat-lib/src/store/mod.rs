//! Vector storage backends
//!
//! [`MemoryStore`] holds entries in memory for tests and as the working set
//! of [`VectorIndex`], which persists every entry under a storage directory.
//!
//! # Storage Model
//!
//! Each stored item consists of:
//! - Fragment: the original text and provenance
//! - Embedding: the vector representation
//!
//! Entries are keyed by fragment id. Inserting an id that is already
//! present is a no-op, so re-ingesting an unchanged document does not
//! duplicate its fragments.
//!
//! # Usage
//!
//! ```ignore
//! use docchat_lib::store::{VectorStore, MemoryStore};
//!
//! let mut store = MemoryStore::new();
//!
//! // Insert fragments with their embeddings
//! store.insert(&fragments, &embeddings)?;
//!
//! // Search by vector similarity
//! let results = store.search(&query_embedding, 4)?;
//! ```

use crate::chunk::Fragment;
use crate::embed::Embedding;
use crate::Result;

/// A search result with similarity score
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched fragment
    pub fragment: Fragment,
    /// Cosine similarity to the query, -1.0 to 1.0 (higher is closer)
    pub score: f32,
}

/// Trait for vector storage backends
pub trait VectorStore: Send + Sync {
    /// Insert fragments with their embeddings
    ///
    /// # Arguments
    /// * `fragments` - The fragments to store
    /// * `embeddings` - Corresponding embeddings (must be same length)
    ///
    /// # Returns
    /// Number of fragments that were not already stored
    fn insert(&mut self, fragments: &[Fragment], embeddings: &[Embedding]) -> Result<usize>;

    /// Search for similar fragments
    ///
    /// # Arguments
    /// * `query_embedding` - The query vector
    /// * `k` - Maximum number of results, at least 1
    ///
    /// # Returns
    /// Up to k results sorted by similarity (highest first); equal scores
    /// keep insertion order
    fn search(&self, query_embedding: &Embedding, k: usize) -> Result<Vec<SearchResult>>;

    /// Whether a fragment with this id is stored
    fn contains(&self, id: &str) -> bool;

    /// Get total number of stored fragments
    fn len(&self) -> usize;

    /// Check if store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all stored data
    fn clear(&mut self) -> Result<()>;
}

impl<T: VectorStore + ?Sized> VectorStore for &mut T {
    fn insert(&mut self, fragments: &[Fragment], embeddings: &[Embedding]) -> Result<usize> {
        (**self).insert(fragments, embeddings)
    }

    fn search(&self, query_embedding: &Embedding, k: usize) -> Result<Vec<SearchResult>> {
        (**self).search(query_embedding, k)
    }

    fn contains(&self, id: &str) -> bool {
        (**self).contains(id)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }
}

mod disk;
mod memory;

pub use disk::*;
pub use memory::*;
