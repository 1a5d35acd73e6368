use std::collections::HashMap;

use crate::chunk::Fragment;
use crate::embed::Embedding;
use crate::store::{SearchResult, VectorStore};
use crate::{Error, Result};

/// In-memory vector store.
///
/// Uses brute-force cosine similarity search over entries kept in insertion
/// order, which makes tie-breaking deterministic for a fixed store state.
/// Suitable for the document collections of a single user (tens of
/// thousands of fragments).
#[derive(Default)]
pub struct MemoryStore {
    fragments: Vec<Fragment>,
    embeddings: Vec<Embedding>,
    ids: HashMap<String, usize>,
    dimension: Option<usize>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimension of the stored embeddings, once anything was inserted.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Iterate over stored entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&Fragment, &Embedding)> {
        self.fragments.iter().zip(&self.embeddings)
    }

    /// Check that a batch can be inserted without changing the dimension.
    pub(crate) fn validate(&self, fragments: &[Fragment], embeddings: &[Embedding]) -> Result<()> {
        if fragments.len() != embeddings.len() {
            return Err(Error::InvalidInput(format!(
                "{} fragments but {} embeddings",
                fragments.len(),
                embeddings.len()
            )));
        }
        let mut dimension = self.dimension;
        for embedding in embeddings {
            match dimension {
                Some(d) if d != embedding.len() => {
                    return Err(Error::InvalidInput(format!(
                        "embedding dimension {} does not match index dimension {d}",
                        embedding.len()
                    )));
                }
                Some(_) => {}
                None => dimension = Some(embedding.len()),
            }
        }
        Ok(())
    }
}

impl VectorStore for MemoryStore {
    fn insert(&mut self, fragments: &[Fragment], embeddings: &[Embedding]) -> Result<usize> {
        self.validate(fragments, embeddings)?;

        let mut inserted = 0;
        for (fragment, embedding) in fragments.iter().zip(embeddings) {
            if self.ids.contains_key(&fragment.id) {
                continue;
            }
            self.dimension.get_or_insert(embedding.len());
            self.ids.insert(fragment.id.clone(), self.fragments.len());
            self.fragments.push(fragment.clone());
            self.embeddings.push(embedding.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(Error::InvalidInput("k must be at least 1".to_string()));
        }
        if let Some(d) = self.dimension {
            if query.len() != d {
                return Err(Error::InvalidInput(format!(
                    "query dimension {} does not match index dimension {d}",
                    query.len()
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .map(|embedding| cosine_similarity(query, embedding))
            .enumerate()
            .collect();

        // stable sort: equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| SearchResult {
                fragment: self.fragments[i].clone(),
                score,
            })
            .collect())
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    fn len(&self) -> usize {
        self.fragments.len()
    }

    fn clear(&mut self) -> Result<()> {
        self.fragments.clear();
        self.embeddings.clear();
        self.ids.clear();
        self.dimension = None;
        Ok(())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 means identical direction.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
