//! Answer chain
//!
//! One question goes through five steps, fresh for every query:
//!
//! ```text
//! question -> embed -> retrieve top-k -> render prompt -> generate -> update memory
//! ```
//!
//! Retrieval runs before rendering so the context blocks can be numbered in
//! the order of the returned sources; a citation `[n]` in the answer refers
//! to `sources[n - 1]`. Memory is updated after generation so the summary
//! includes the answer just given. A failed generation fails the query; a
//! failed memory update only degrades it.

use crate::chunk::Fragment;
use crate::config::ChainConfig;
use crate::embed::Embedder;
use crate::llm::{CompletionRequest, LlmProvider};
use crate::memory::ConversationMemory;
use crate::search::SearchEngine;
use crate::store::VectorStore;
use crate::{Error, Result};

const SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about the user's documents.
- Use only the numbered context below and cite it inline as [1], [2] by those numbers.
- If the context is insufficient, say so and ask for a relevant file to be added.
- Keep answers concise and factual.";

/// Outcome of the memory step of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryStatus {
    Updated,
    /// The summary was not advanced for this turn.
    Degraded(String),
}

/// Answer to one question.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub answer: String,
    /// Retrieved fragments, nearest first; `[n]` in the answer is `sources[n - 1]`.
    pub sources: Vec<Fragment>,
    pub memory: MemoryStatus,
}

/// Retrieval-augmented question answering over a vector store.
pub struct AnswerChain<E: Embedder, S: VectorStore, L: LlmProvider> {
    engine: SearchEngine<E, S>,
    llm: L,
    config: ChainConfig,
    last_prompt: Option<String>,
}

impl<E: Embedder, S: VectorStore, L: LlmProvider> AnswerChain<E, S, L> {
    #[must_use]
    pub fn new(engine: SearchEngine<E, S>, llm: L, config: ChainConfig) -> Self {
        Self {
            engine,
            llm,
            config,
            last_prompt: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Replace the configuration; applies from the next query on.
    pub fn set_config(&mut self, config: ChainConfig) {
        self.config = config;
    }

    #[must_use]
    pub fn engine(&self) -> &SearchEngine<E, S> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SearchEngine<E, S> {
        &mut self.engine
    }

    /// Prompt sent to the model by the most recent query.
    #[must_use]
    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    /// Answer `question` from the store, using and then updating `memory`.
    pub fn ask(&mut self, question: &str, memory: &mut ConversationMemory) -> Result<QueryResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("question is empty".to_string()));
        }
        // one config snapshot for the whole query
        let config = self.config;

        let query_embedding = self.engine.embed_query(question)?;
        let sources: Vec<Fragment> = self
            .engine
            .search_embedding(&query_embedding, config.top_k.get())?
            .into_iter()
            .map(|r| r.fragment)
            .collect();
        tracing::debug!(retrieved = sources.len(), top_k = %config.top_k, "retrieved context");

        let prompt = render_prompt(question, &sources, memory.read());
        self.last_prompt = Some(prompt.clone());

        let request = CompletionRequest {
            prompt: &prompt,
            model: config.model,
            temperature: config.temperature.get(),
        };
        let answer = match self.llm.complete(&request) {
            Ok(answer) => answer.trim().to_string(),
            Err(Error::Llm(e)) => return Err(Error::Llm(e)),
            Err(e) => return Err(Error::Llm(e.to_string())),
        };

        let memory = match memory.update(&self.llm, &config, question, &answer) {
            Ok(()) => MemoryStatus::Updated,
            Err(e) => {
                tracing::warn!(error = %e, "memory update failed; summary not advanced");
                MemoryStatus::Degraded(e.to_string())
            }
        };

        Ok(QueryResult {
            answer,
            sources,
            memory,
        })
    }
}

/// Render the answering prompt.
///
/// Context blocks are numbered from 1 in the order of `sources`.
#[must_use]
pub fn render_prompt(question: &str, sources: &[Fragment], summary: &str) -> String {
    let context = if sources.is_empty() {
        "(no matching documents)".to_string()
    } else {
        sources
            .iter()
            .enumerate()
            .map(|(i, f)| {
                format!(
                    "[{}] (source: {}, p.{})\n{}",
                    i + 1,
                    f.metadata.source_path,
                    f.metadata.page_label(),
                    f.content.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "{SYSTEM_PROMPT}\n\nContext:\n{context}\n\nConversation so far:\n{summary}\n\nUser question:\n{question}\n\nHelpful answer:"
    )
}
