//! docchat - chat with your own documents
//!
//! # Architecture
//!
//! ```text
//! data/ -> Loader -> Chunker -> Embedder -> VectorIndex (storage/index/)
//!                                               |
//! Question -> Embedder -> Search <--------------+
//!                           |
//!               Prompt (context + memory) -> LLM -> Answer + sources
//!                                                     |
//!                                            Memory summary update
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docchat_lib::config::ChainConfig;
//! use docchat_lib::embed::MiniLmEmbedder;
//! use docchat_lib::llm::GeminiProvider;
//! use docchat_lib::session::Session;
//! use docchat_lib::store::VectorIndex;
//!
//! let index = VectorIndex::load("storage/index")?;
//! let embedder = MiniLmEmbedder::new()?;
//! let llm = GeminiProvider::new(api_key)?;
//!
//! let mut session = Session::new(ChainConfig::default(), index, embedder, llm);
//! let result = session.ask("What is the refund policy?")?;
//! println!("{}", result.answer);
//! for (i, source) in result.sources.iter().enumerate() {
//!     println!("[{}] {}", i + 1, source.metadata.source_path);
//! }
//! ```

pub mod chain;
pub mod chunk;
pub mod config;
pub mod embed;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod load;
pub mod memory;
pub mod search;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Error, Result};
