//! Document chunking strategies
//!
//! Parsed pages are split into [`Fragment`]s, the unit of retrieval:
//! - Prose (text, Markdown, Word): paragraph boundaries
//! - Oversized paragraphs: fixed windows with overlap
//!
//! # Implementing a Chunker
//!
//! ```ignore
//! use docchat_lib::chunk::{Chunker, Fragment, FragmentMetadata};
//!
//! struct MyChunker { /* ... */ }
//!
//! impl Chunker for MyChunker {
//!     fn chunk(&self, content: &str, metadata: FragmentMetadata) -> Vec<Fragment> {
//!         // Your chunking logic here
//!         todo!()
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// A fragment of document text with its provenance
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Fragment {
    /// Stable identifier derived from source, page and content
    pub id: String,
    /// The text content of this fragment
    pub content: String,
    /// Where the fragment came from
    pub metadata: FragmentMetadata,
}

/// Provenance attached to a fragment
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct FragmentMetadata {
    /// Path of the source document
    pub source_path: String,
    /// 1-based page number, for paged formats such as PDF
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Byte offset within the page text
    #[serde(default)]
    pub position: usize,
    /// Total number of fragments cut from the same page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
}

impl FragmentMetadata {
    pub fn new(source_path: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            source_path: source_path.into(),
            page,
            ..Self::default()
        }
    }

    /// Human readable page label, `n/a` for unpaged sources.
    #[must_use]
    pub fn page_label(&self) -> String {
        self.page.map_or_else(|| "n/a".to_string(), |p| p.to_string())
    }
}

impl Fragment {
    /// Build a fragment, deriving its id from provenance and content.
    pub fn new(content: impl Into<String>, metadata: FragmentMetadata) -> Self {
        let content = content.into();
        Self {
            id: fragment_id(&metadata, &content),
            content,
            metadata,
        }
    }
}

/// Trait for document chunking strategies
///
/// Implement this trait to create custom chunking logic for different
/// content types.
pub trait Chunker: Send + Sync {
    /// Split content into fragments
    ///
    /// # Arguments
    /// * `content` - The text content to chunk
    /// * `metadata` - Base metadata to attach to each fragment
    ///
    /// # Returns
    /// Fragments in document order, each with a stable id and position
    fn chunk(&self, content: &str, metadata: FragmentMetadata) -> Vec<Fragment>;

    /// Returns the name of this chunking strategy
    fn name(&self) -> &str;
}

/// Content hash used as the fragment id.
///
/// Stable across runs and toolchains, so re-ingesting an unchanged file
/// yields the same ids.
fn fragment_id(metadata: &FragmentMetadata, content: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(metadata.source_path.as_bytes());
    hasher.update(&[0]);
    if let Some(page) = metadata.page {
        hasher.update(&page.to_le_bytes());
    }
    hasher.update(&[0]);
    hasher.update(&(metadata.position as u64).to_le_bytes());
    hasher.update(content.as_bytes());
    hasher.finalize().to_hex()[..16].to_string()
}

/// Largest char boundary `<= index`.
pub(crate) fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary `>= index`.
pub(crate) fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

mod fixed;
mod paragraph;

pub use fixed::*;
pub use paragraph::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_depends_on_source() {
        let a = Fragment::new("same text", FragmentMetadata::new("a.txt", None));
        let b = Fragment::new("same text", FragmentMetadata::new("b.txt", None));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_id_depends_on_page() {
        let a = Fragment::new("same text", FragmentMetadata::new("a.pdf", Some(1)));
        let b = Fragment::new("same text", FragmentMetadata::new("a.pdf", Some(2)));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_id_is_stable() {
        let a = Fragment::new("refunds within 30 days", FragmentMetadata::new("policy.md", None));
        let b = Fragment::new("refunds within 30 days", FragmentMetadata::new("policy.md", None));
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 16);
    }

    #[test]
    fn test_page_label() {
        assert_eq!(FragmentMetadata::new("a.pdf", Some(3)).page_label(), "3");
        assert_eq!(FragmentMetadata::new("a.txt", None).page_label(), "n/a");
    }

    #[test]
    fn test_char_boundaries() {
        let s = "a👋b"; // emoji occupies bytes 1..5
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(ceil_char_boundary(s, 2), 5);
        assert_eq!(floor_char_boundary(s, 100), s.len());
    }
}
