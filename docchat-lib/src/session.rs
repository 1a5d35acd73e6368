//! Chat session
//!
//! A [`Session`] owns everything one conversation needs: the answer chain
//! with its index, the memory summary and the visible turn history. The
//! shell passes it to each input handler; nothing is global.

use std::fs;
use std::path::{Path, PathBuf};

use crate::chain::{AnswerChain, QueryResult};
use crate::config::{ChainConfig, Temperature, TopK};
use crate::embed::Embedder;
use crate::llm::{LlmProvider, Model};
use crate::load::{is_supported, DocumentLoader};
use crate::memory::ConversationMemory;
use crate::search::SearchEngine;
use crate::store::VectorStore;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message of the conversation as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Result of [`Session::upload`].
#[derive(Debug)]
pub struct Upload {
    /// Where the file now lives in the data directory.
    pub stored_at: PathBuf,
    /// Fragments the file produced.
    pub fragments: usize,
    /// Fragments that were not indexed before.
    pub added: usize,
}

pub struct Session<E: Embedder, S: VectorStore, L: LlmProvider> {
    chain: AnswerChain<E, S, L>,
    memory: ConversationMemory,
    turns: Vec<Turn>,
}

impl<E: Embedder, S: VectorStore, L: LlmProvider> Session<E, S, L> {
    pub fn new(config: ChainConfig, store: S, embedder: E, llm: L) -> Self {
        Self {
            chain: AnswerChain::new(SearchEngine::new(embedder, store), llm, config),
            memory: ConversationMemory::new(),
            turns: Vec::new(),
        }
    }

    /// Ask a question.
    ///
    /// Both turns are recorded on success. On failure the history is left
    /// as it was before the call.
    pub fn ask(&mut self, question: &str) -> Result<QueryResult> {
        self.turns.push(Turn {
            role: Role::User,
            content: question.to_string(),
        });

        match self.chain.ask(question, &mut self.memory) {
            Ok(result) => {
                self.turns.push(Turn {
                    role: Role::Assistant,
                    content: result.answer.clone(),
                });
                Ok(result)
            }
            Err(e) => {
                self.turns.pop();
                Err(e)
            }
        }
    }

    /// Forget the turn history and the memory summary.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.memory.clear();
        tracing::debug!("session cleared");
    }

    #[must_use]
    pub fn config(&self) -> &ChainConfig {
        self.chain.config()
    }

    pub fn set_model(&mut self, model: Model) {
        let config = ChainConfig {
            model,
            ..*self.chain.config()
        };
        self.chain.set_config(config);
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<()> {
        let config = ChainConfig {
            temperature: Temperature::new(temperature)?,
            ..*self.chain.config()
        };
        self.chain.set_config(config);
        Ok(())
    }

    pub fn set_top_k(&mut self, top_k: usize) -> Result<()> {
        let config = ChainConfig {
            top_k: TopK::new(top_k)?,
            ..*self.chain.config()
        };
        self.chain.set_config(config);
        Ok(())
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        self.memory.read()
    }

    #[must_use]
    pub fn last_prompt(&self) -> Option<&str> {
        self.chain.last_prompt()
    }

    #[must_use]
    pub fn store(&self) -> &S {
        self.chain.engine().store()
    }

    #[must_use]
    pub fn embedder(&self) -> &E {
        self.chain.engine().embedder()
    }

    /// Copy `path` into `data_dir` and add its fragments to the index.
    ///
    /// A different file with the same name is never overwritten; the copy
    /// gets a numbered name instead (`policy (1).txt`). A file whose content
    /// is already in `data_dir` under that name is not copied again, and
    /// fragments already indexed are skipped, so uploading the same file
    /// twice adds nothing. A copy that fails to parse is removed again.
    pub fn upload(&mut self, path: impl AsRef<Path>, data_dir: impl AsRef<Path>) -> Result<Upload> {
        let path = path.as_ref();
        let data_dir = data_dir.as_ref();
        if !is_supported(path) {
            return Err(Error::UnsupportedFormat(path.to_path_buf()));
        }

        fs::create_dir_all(data_dir)?;
        let (stored_at, copied) = upload_target(path, data_dir)?;
        if copied {
            fs::copy(path, &stored_at)?;
        }

        let fragments = match DocumentLoader::new(data_dir).load_file(&stored_at) {
            Ok(fragments) => fragments,
            Err(e) => {
                if copied {
                    if let Err(rm) = fs::remove_file(&stored_at) {
                        tracing::warn!(path = %stored_at.display(), error = %rm, "cannot remove failed upload");
                    }
                }
                return Err(e);
            }
        };
        let added = self.chain.engine_mut().index(&fragments)?;
        tracing::info!(
            path = %stored_at.display(),
            fragments = fragments.len(),
            added,
            "uploaded document"
        );

        Ok(Upload {
            stored_at,
            fragments: fragments.len(),
            added,
        })
    }
}

const MAX_UPLOAD_COPIES: u32 = 999;

/// Where an upload of `path` lands in `data_dir`, and whether it still has
/// to be copied there.
fn upload_target(path: &Path, data_dir: &Path) -> Result<(PathBuf, bool)> {
    let name = path
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("not a file: {}", path.display())))?;
    let stem = path.file_stem().unwrap_or(name).to_string_lossy();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let numbered = (1..=MAX_UPLOAD_COPIES).map(|n| data_dir.join(format!("{stem} ({n}){extension}")));
    for candidate in std::iter::once(data_dir.join(name)).chain(numbered) {
        if !candidate.exists() {
            return Ok((candidate, true));
        }
        if same_file(path, &candidate) || same_content(path, &candidate)? {
            return Ok((candidate, false));
        }
    }
    Err(Error::InvalidInput(format!(
        "too many files named like {} in {}",
        name.to_string_lossy(),
        data_dir.display()
    )))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn same_content(a: &Path, b: &Path) -> Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(fs::read(a)? == fs::read(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Fragment, FragmentMetadata};
    use crate::store::MemoryStore;
    use crate::test_support::{KeywordEmbedder, ScriptedLlm};

    type TestSession = Session<KeywordEmbedder, MemoryStore, ScriptedLlm>;

    fn session(llm: ScriptedLlm) -> TestSession {
        let mut session = Session::new(ChainConfig::default(), MemoryStore::new(), KeywordEmbedder::new(), llm);
        session
            .chain
            .engine_mut()
            .index(&[
                Fragment::new(
                    "Refund policy: refunds are issued within 30 days of purchase.",
                    FragmentMetadata::new("data/policy.pdf", Some(1)),
                ),
                Fragment::new(
                    "Shipping policy: orders ship within five business days.",
                    FragmentMetadata::new("data/shipping.md", None),
                ),
            ])
            .unwrap();
        session
    }

    #[test]
    fn test_ask_records_both_turns() {
        let mut session = session(ScriptedLlm::new(["Within 30 days [1].", "Asked about refunds."]));

        let result = session.ask("What is the refund policy?").unwrap();

        assert_eq!(
            session.turns(),
            [
                Turn {
                    role: Role::User,
                    content: "What is the refund policy?".to_string()
                },
                Turn {
                    role: Role::Assistant,
                    content: result.answer.clone()
                },
            ]
        );
        assert_eq!(session.summary(), "Asked about refunds.");
    }

    #[test]
    fn test_failed_ask_keeps_history() {
        let llm = ScriptedLlm::from_script([Ok("Within 30 days [1]."), Ok("Asked about refunds."), Err("503")]);
        let mut session = session(llm);
        session.ask("refunds?").unwrap();

        assert!(matches!(session.ask("shipping?"), Err(Error::Llm(_))));
        assert_eq!(session.turns().len(), 2);
        assert_eq!(session.turns()[1].content, "Within 30 days [1].");
        assert_eq!(session.summary(), "Asked about refunds.");
    }

    #[test]
    fn test_clear_resets_memory_for_next_prompt() {
        let llm = ScriptedLlm::new(["a1", "User asked about refunds.", "a2", "s2"]);
        let mut session = session(llm);
        session.ask("refunds?").unwrap();

        session.clear();
        assert!(session.turns().is_empty());
        assert_eq!(session.summary(), "");

        session.ask("shipping?").unwrap();
        let prompt = session.last_prompt().unwrap();
        assert!(prompt.contains("Conversation so far:\n\n\nUser question:"));
        assert!(!prompt.contains("User asked about refunds."));
    }

    #[test]
    fn test_setters_validate_and_apply() {
        let mut session = session(ScriptedLlm::new(["a", "s"]));

        assert!(session.set_temperature(1.5).is_err());
        assert!(session.set_top_k(0).is_err());
        assert_eq!(*session.config(), ChainConfig::default());

        session.set_model(Model::Gemini25Pro);
        session.set_temperature(0.7).unwrap();
        session.set_top_k(1).unwrap();
        assert_eq!(session.config().model, Model::Gemini25Pro);
        assert_eq!(session.config().temperature.get(), 0.7);

        assert_eq!(session.ask("refund policy").unwrap().sources.len(), 1);
    }

    #[test]
    fn test_upload_indexes_file_once() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().join("support.txt");
        fs::write(&outside, "Support is reachable by email at any hour.").unwrap();
        let data_dir = tmp.path().join("data");

        let mut session = session(ScriptedLlm::new(["You can email support [1].", "s"]));
        let upload = session.upload(&outside, &data_dir).unwrap();

        assert_eq!(upload.stored_at, data_dir.join("support.txt"));
        assert!(upload.stored_at.is_file());
        assert_eq!(upload.added, 1);
        assert_eq!(session.store().len(), 3);

        let result = session.ask("how do I reach support by email").unwrap();
        assert!(result.sources[0].content.starts_with("Support is reachable"));

        // uploading again, even from inside the data dir, adds nothing
        assert_eq!(session.upload(&outside, &data_dir).unwrap().added, 0);
        assert_eq!(session.upload(data_dir.join("support.txt"), &data_dir).unwrap().added, 0);
        assert_eq!(session.store().len(), 3);
    }

    #[test]
    fn test_upload_never_overwrites_another_document() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(data_dir.join("policy.txt"), "Refunds are issued within 30 days.").unwrap();
        let elsewhere = tmp.path().join("elsewhere");
        fs::create_dir_all(&elsewhere).unwrap();
        fs::write(elsewhere.join("policy.txt"), "Parking is free on weekends.").unwrap();

        let mut session = session(ScriptedLlm::new(["unused"]));
        let upload = session.upload(elsewhere.join("policy.txt"), &data_dir).unwrap();

        assert_eq!(upload.stored_at, data_dir.join("policy (1).txt"));
        assert_eq!(
            fs::read_to_string(data_dir.join("policy.txt")).unwrap(),
            "Refunds are issued within 30 days."
        );
        assert_eq!(fs::read_to_string(&upload.stored_at).unwrap(), "Parking is free on weekends.");
        assert_eq!(upload.added, 1);

        // the same upload again finds its earlier copy
        let again = session.upload(elsewhere.join("policy.txt"), &data_dir).unwrap();
        assert_eq!(again.stored_at, data_dir.join("policy (1).txt"));
        assert_eq!(again.added, 0);
        assert!(!data_dir.join("policy (2).txt").exists());
    }

    #[test]
    fn test_failed_upload_leaves_no_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let broken = tmp.path().join("broken.docx");
        fs::write(&broken, "not a zip").unwrap();
        let data_dir = tmp.path().join("data");

        let mut session = session(ScriptedLlm::new(["unused"]));
        let err = session.upload(&broken, &data_dir).unwrap_err();

        assert!(matches!(err, Error::Parse { .. }));
        assert!(!data_dir.join("broken.docx").exists());
        assert_eq!(session.store().len(), 2);
    }

    #[test]
    fn test_upload_rejects_unsupported() {
        let tmp = tempfile::tempdir().unwrap();
        let image = tmp.path().join("scan.png");
        fs::write(&image, b"png").unwrap();

        let mut session = session(ScriptedLlm::new(["unused"]));
        let err = session.upload(&image, tmp.path().join("data")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert!(!tmp.path().join("data").exists());
    }
}
