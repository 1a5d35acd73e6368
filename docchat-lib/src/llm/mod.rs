//! Language model providers
//!
//! The answer chain and the conversation memory talk to the model through
//! [`LlmProvider`]: one blocking call per completion, prompt in, text out.
//! Any provider failure (auth, rate limit, network, empty response) is
//! reported as [`Error::Llm`](crate::Error::Llm).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Hosted models selectable for answering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    #[default]
    Gemini25Flash,
    Gemini25Pro,
    GeminiFlashLatest,
    GeminiProLatest,
}

impl Model {
    pub const ALL: [Model; 4] = [
        Model::Gemini25Flash,
        Model::Gemini25Pro,
        Model::GeminiFlashLatest,
        Model::GeminiProLatest,
    ];

    /// Resource name as used by the Gemini API.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Model::Gemini25Flash => "models/gemini-2.5-flash",
            Model::Gemini25Pro => "models/gemini-2.5-pro",
            Model::GeminiFlashLatest => "models/gemini-flash-latest",
            Model::GeminiProLatest => "models/gemini-pro-latest",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Model {
    type Err = Error;

    /// Accepts the resource name with or without the `models/` prefix.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        let wanted = wanted.strip_prefix("models/").unwrap_or(wanted);
        Model::ALL
            .into_iter()
            .find(|m| m.id().trim_start_matches("models/") == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Model::ALL.iter().map(|m| m.id()).collect();
                Error::InvalidInput(format!("unknown model '{s}'; expected one of {}", known.join(", ")))
            })
    }
}

/// Request envelope shared by the providers.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub model: Model,
    pub temperature: f32,
}

/// Trait implemented by concrete LLM providers.
pub trait LlmProvider: Send + Sync {
    /// Run one completion, blocking until the provider answers.
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String>;
}

impl<T: LlmProvider + ?Sized> LlmProvider for Box<T> {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        (**self).complete(request)
    }
}

impl<T: LlmProvider + ?Sized> LlmProvider for &T {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        (**self).complete(request)
    }
}

mod gemini;

pub use gemini::GeminiProvider;
