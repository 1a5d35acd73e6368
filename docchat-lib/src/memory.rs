//! Conversation memory
//!
//! The conversation is remembered as one evolving natural-language summary
//! rather than a transcript. After every exchange the model is asked to fold
//! the new question and answer into the previous summary, which keeps the
//! history part of the prompt bounded no matter how long the session runs.

use crate::config::ChainConfig;
use crate::llm::{CompletionRequest, LlmProvider};
use crate::{Error, Result};

const SUMMARY_PROMPT: &str = "Progressively summarize the lines of conversation provided, \
adding onto the previous summary and returning a new summary. Keep facts the user stated, \
questions asked and what the answers established. Reply with the summary only.";

/// Running summary of the dialogue so far.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    summary: String,
}

impl ConversationMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current summary, empty before the first successful update.
    #[must_use]
    pub fn read(&self) -> &str {
        &self.summary
    }

    /// Fold the latest exchange into the summary.
    ///
    /// On failure the previous summary is kept as is.
    pub fn update<L: LlmProvider + ?Sized>(
        &mut self,
        llm: &L,
        config: &ChainConfig,
        question: &str,
        answer: &str,
    ) -> Result<()> {
        let prompt = render_summary_prompt(&self.summary, question, answer);
        let request = CompletionRequest {
            prompt: &prompt,
            model: config.model,
            temperature: config.temperature.get(),
        };
        let summary = llm.complete(&request)?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(Error::Llm("summarization returned an empty summary".to_string()));
        }

        tracing::debug!(bytes = summary.len(), "conversation summary updated");
        self.summary = summary.to_string();
        Ok(())
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.summary.clear();
    }
}

fn render_summary_prompt(summary: &str, question: &str, answer: &str) -> String {
    format!(
        "{SUMMARY_PROMPT}\n\nCurrent summary:\n{summary}\n\nNew lines of conversation:\nHuman: {question}\nAI: {answer}\n\nNew summary:"
    )
}
