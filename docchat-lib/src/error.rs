//! Error types for docchat

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for docchat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docchat operations
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load or run the embedding model
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Failed to chunk a document
    #[error("chunking error: {0}")]
    Chunking(String),

    /// Failed to store or retrieve from the vector index
    #[error("store error: {0}")]
    Store(String),

    /// Document or fragment not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input provided
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Missing or malformed configuration, e.g. credentials
    #[error("configuration error: {0}")]
    Config(String),

    /// No persisted index at the storage location
    #[error("no index found at {}; run ingestion first", .0.display())]
    IndexNotFound(PathBuf),

    /// The document directory does not exist
    #[error("no data directory found at {}", .0.display())]
    DataDirMissing(PathBuf),

    /// The document directory holds nothing that could be loaded
    #[error("no documents found in {}; add .txt, .md, .pdf or .docx files and re-run", .0.display())]
    NoDocuments(PathBuf),

    /// File extension has no parser
    #[error("unsupported document format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A parser failed on a single file
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The language model provider failed
    #[error("llm error: {0}")]
    Llm(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
