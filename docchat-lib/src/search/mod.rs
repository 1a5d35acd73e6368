//! High-level search interface
//!
//! Combines embedder and store into a unified search API.
//!
//! # Usage
//!
//! ```ignore
//! use docchat_lib::search::SearchEngine;
//!
//! let mut engine = SearchEngine::new(embedder, store);
//! engine.index(&fragments)?;
//! let results = engine.search("What is the refund policy?", 4)?;
//! ```

use std::collections::HashSet;

use crate::chunk::Fragment;
use crate::embed::{Embedder, Embedding};
use crate::store::{SearchResult, VectorStore};
use crate::Result;

/// Search engine combining an embedding model and a vector store.
pub struct SearchEngine<E: Embedder, S: VectorStore> {
    embedder: E,
    store: S,
}

impl<E: Embedder, S: VectorStore> SearchEngine<E, S> {
    /// Create a new search engine.
    #[must_use]
    pub fn new(embedder: E, store: S) -> Self {
        Self { embedder, store }
    }

    /// Index fragments by computing embeddings and storing them.
    ///
    /// Fragments already in the store, and repeats within `fragments`, are
    /// not embedded again. Returns the number of fragments added.
    pub fn index(&mut self, fragments: &[Fragment]) -> Result<usize> {
        let mut seen = HashSet::new();
        let fresh: Vec<Fragment> = fragments
            .iter()
            .filter(|f| !self.store.contains(&f.id) && seen.insert(f.id.as_str()))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        tracing::debug!(
            fragments = fresh.len(),
            skipped = fragments.len() - fresh.len(),
            model = self.embedder.model_name(),
            "embedding fragments"
        );
        let texts: Vec<&str> = fresh.iter().map(|f| f.content.as_str()).collect();
        let embeddings = self.embedder.embed_documents(&texts)?;
        self.store.insert(&fresh, &embeddings)
    }

    /// Embed a question the same way the index was built.
    pub fn embed_query(&mut self, query: &str) -> Result<Embedding> {
        self.embedder.embed_query(query)
    }

    /// Search for fragments similar to the query using bi-encoder similarity.
    pub fn search(&mut self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embed_query(query)?;
        self.store.search(&query_embedding, k)
    }

    /// Search with an already computed query embedding.
    pub fn search_embedding(&self, query_embedding: &Embedding, k: usize) -> Result<Vec<SearchResult>> {
        self.store.search(query_embedding, k)
    }

    /// Returns the number of indexed fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no fragments are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns a reference to the embedder.
    #[must_use]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Returns a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}
