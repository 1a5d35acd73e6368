//! Deterministic stand-ins for the embedding model and the LLM.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::embed::{Embedder, Embedding};
use crate::llm::{CompletionRequest, LlmProvider};
use crate::{Error, Result};

const DIMENSION: usize = 256;

/// Bag-of-words embedder: each lowercase word adds 1 to a hashed bucket.
pub struct KeywordEmbedder {
    name: String,
    documents_embedded: usize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::named("test/keyword-hash")
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            documents_embedded: 0,
        }
    }

    pub fn documents_embedded(&self) -> usize {
        self.documents_embedded
    }

    fn vectorize(text: &str) -> Embedding {
        let mut v = vec![0.0; DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            v[fnv1a(&word.to_lowercase()) as usize % DIMENSION] += 1.0;
        }
        v
    }
}

impl Embedder for KeywordEmbedder {
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.documents_embedded += texts.len();
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        Ok(Self::vectorize(text))
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in s.bytes() {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// LLM that replays a fixed script of responses and records every prompt.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    /// Every call succeeds with the next response.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_script(responses.into_iter().map(|r| Ok::<_, String>(r.into())))
    }

    /// Calls succeed or fail in script order.
    pub fn from_script<I, S, F>(script: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<S, F>>,
        S: Into<String>,
        F: Into<String>,
    {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(Into::into).map_err(Into::into))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Make the next call fail regardless of the script.
    pub fn fail_next(&self, message: &str) {
        self.script.lock().unwrap().push_front(Err(message.to_string()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LlmProvider for ScriptedLlm {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(Error::Llm(message)),
            None => Err(Error::Llm("script exhausted".to_string())),
        }
    }
}
