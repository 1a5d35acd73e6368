//! Persistent vector index
//!
//! Layout of the storage directory:
//!
//! ```text
//! storage/index/
//!   manifest.json    model name, embedding dimension, creation time
//!   entries.jsonl    one {"fragment": .., "embedding": [..]} per line
//! ```
//!
//! Entries are only ever appended. A crash while appending can leave a
//! truncated last line, which is skipped on load and cut off before the
//! next append. Complete lines are never removed, including lines another
//! handle appended after this one loaded; those are read in first.
//!
//! A rebuild writes `manifest.json.rebuild` / `entries.jsonl.rebuild` and
//! only replaces the live files in [`VectorIndex::commit`].

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::chunk::Fragment;
use crate::embed::{Embedder, Embedding};
use crate::search::SearchEngine;
use crate::store::{MemoryStore, SearchResult, VectorStore};
use crate::{Error, Result};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const ENTRIES_FILE: &str = "entries.jsonl";
const STAGING_SUFFIX: &str = ".rebuild";

/// Describes the embedding space an index was built in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    pub model: String,
    pub dimension: usize,
    pub created_at_ms: u64,
}

/// One persisted `(Fragment, Embedding)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub fragment: Fragment,
    pub embedding: Embedding,
}

/// What `build` does with entries already on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    /// Keep existing entries and add fragments not yet indexed.
    #[default]
    Append,
    /// Replace existing entries once the new ones are committed.
    Rebuild,
}

/// A vector index persisted under a storage directory.
///
/// All entries are loaded into a [`MemoryStore`] for searching; inserts go
/// to disk first and then to memory.
pub struct VectorIndex {
    dir: PathBuf,
    manifest: IndexManifest,
    store: MemoryStore,
    /// Bytes of the entries file already read into `store`.
    valid_len: u64,
    /// Writing to the staging files of a rebuild.
    staged: bool,
}

impl VectorIndex {
    /// Whether `dir` exists and holds anything.
    #[must_use]
    pub fn exists(dir: impl AsRef<Path>) -> bool {
        fs::read_dir(dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }

    /// Open a persisted index without re-embedding anything.
    ///
    /// Returns [`Error::IndexNotFound`] when the directory is missing or
    /// empty, or has no manifest.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let manifest_path = dir.join(MANIFEST_FILE);
        if !Self::exists(&dir) || !manifest_path.is_file() {
            return Err(Error::IndexNotFound(dir));
        }

        let manifest = read_manifest(&manifest_path)?;
        let mut index = Self {
            dir,
            manifest,
            store: MemoryStore::new(),
            valid_len: 0,
            staged: false,
        };
        index.sync_entries(false)?;

        tracing::info!(
            dir = %index.dir.display(),
            entries = index.len(),
            model = %index.manifest.model,
            "loaded vector index"
        );
        Ok(index)
    }

    /// Open the index in `dir` for writing, creating it if needed.
    ///
    /// Fails if an existing index was built with a different model or
    /// dimension than `embedder`. With [`BuildMode::Rebuild`] the live
    /// index stays untouched until [`commit`](Self::commit).
    pub fn open_or_create<E: Embedder>(
        dir: impl AsRef<Path>,
        embedder: &E,
        mode: BuildMode,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let staged = mode == BuildMode::Rebuild;
        if !staged && dir.join(MANIFEST_FILE).is_file() {
            let index = Self::load(&dir)?;
            index.check_embedder(embedder)?;
            return Ok(index);
        }

        let mut index = Self {
            dir,
            manifest: IndexManifest {
                model: embedder.model_name().to_string(),
                dimension: embedder.dimension(),
                created_at_ms: now_ms(),
            },
            store: MemoryStore::new(),
            valid_len: 0,
            staged,
        };
        if staged {
            // leftovers of a rebuild that never committed
            remove_if_exists(&index.entries_path())?;
            tracing::info!(dir = %index.dir.display(), "staging index rebuild");
        }
        let json = serde_json::to_string_pretty(&index.manifest).map_err(store_err)?;
        fs::write(index.manifest_path(), json)?;
        Ok(index)
    }

    /// Publish a staged rebuild, replacing the previous entries.
    ///
    /// Does nothing for an index opened in [`BuildMode::Append`].
    pub fn commit(&mut self) -> Result<()> {
        if !self.staged {
            return Ok(());
        }
        let staged_entries = self.entries_path();
        let staged_manifest = self.manifest_path();
        let entries = self.dir.join(ENTRIES_FILE);
        if staged_entries.is_file() {
            fs::rename(&staged_entries, &entries)?;
        } else {
            remove_if_exists(&entries)?;
        }
        fs::rename(&staged_manifest, self.dir.join(MANIFEST_FILE))?;
        self.staged = false;

        tracing::info!(dir = %self.dir.display(), entries = self.len(), "replaced index");
        Ok(())
    }

    /// Embed `fragments` and persist them, returning a queryable handle.
    ///
    /// With [`BuildMode::Append`] earlier entries are kept and fragments
    /// whose id is already indexed are skipped.
    pub fn build<E: Embedder>(
        dir: impl AsRef<Path>,
        embedder: &mut E,
        fragments: &[Fragment],
        mode: BuildMode,
    ) -> Result<Self> {
        let mut index = Self::open_or_create(dir, embedder, mode)?;
        let added = index.extend(embedder, fragments)?;
        index.commit()?;
        tracing::info!(
            added,
            total = index.len(),
            dir = %index.dir.display(),
            "vector index built"
        );
        Ok(index)
    }

    /// Embed and append fragments not yet indexed. Returns how many were added.
    pub fn extend<E: Embedder>(&mut self, embedder: &mut E, fragments: &[Fragment]) -> Result<usize> {
        self.check_embedder(embedder)?;
        SearchEngine::new(embedder, self).index(fragments)
    }

    /// Storage directory of this index.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Fail unless `embedder` matches the model this index was built with.
    pub fn check_embedder<E: Embedder>(&self, embedder: &E) -> Result<()> {
        if embedder.model_name() != self.manifest.model
            || embedder.dimension() != self.manifest.dimension
        {
            return Err(Error::InvalidInput(format!(
                "index at {} was built with {} ({} dims), not {} ({} dims); rebuild it",
                self.dir.display(),
                self.manifest.model,
                self.manifest.dimension,
                embedder.model_name(),
                embedder.dimension()
            )));
        }
        Ok(())
    }

    fn staging_path(&self, file: &str) -> PathBuf {
        if self.staged {
            self.dir.join(format!("{file}{STAGING_SUFFIX}"))
        } else {
            self.dir.join(file)
        }
    }

    fn entries_path(&self) -> PathBuf {
        self.staging_path(ENTRIES_FILE)
    }

    fn manifest_path(&self) -> PathBuf {
        self.staging_path(MANIFEST_FILE)
    }

    /// Read complete entries past `valid_len` into memory.
    ///
    /// With `repair`, an unterminated last line is cut off the file so the
    /// next append starts on a line of its own.
    fn sync_entries(&mut self, repair: bool) -> Result<()> {
        let path = self.entries_path();
        let mut file = match OpenOptions::new().read(true).write(repair).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if file.metadata()?.len() < self.valid_len {
            // rewritten underneath us, start over
            tracing::warn!(path = %path.display(), "index entries shrank, reloading");
            self.store.clear()?;
            self.valid_len = 0;
        }
        file.seek(SeekFrom::Start(self.valid_len))?;
        let mut tail = Vec::new();
        file.read_to_end(&mut tail)?;

        let complete = tail.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        if complete < tail.len() {
            tracing::warn!(
                path = %path.display(),
                bytes = tail.len() - complete,
                "skipping truncated index entry"
            );
            if repair {
                file.set_len(self.valid_len + complete as u64)?;
            }
        }

        let mut fragments = Vec::new();
        let mut embeddings = Vec::new();
        for (n, line) in tail[..complete].split(|&b| b == b'\n').enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let entry: IndexEntry = serde_json::from_slice(line).map_err(|e| {
                Error::Store(format!("{} entry {}: {e}", path.display(), n + 1))
            })?;
            if entry.embedding.len() != self.manifest.dimension {
                return Err(Error::Store(format!(
                    "entry dimension {} does not match manifest dimension {}",
                    entry.embedding.len(),
                    self.manifest.dimension
                )));
            }
            fragments.push(entry.fragment);
            embeddings.push(entry.embedding);
        }

        let picked_up = self.store.insert(&fragments, &embeddings)?;
        if self.valid_len > 0 && picked_up > 0 {
            tracing::info!(entries = picked_up, "picked up entries written by another process");
        }
        self.valid_len += complete as u64;
        Ok(())
    }

    fn append_entries(&self, entries: &[(&Fragment, &Embedding)]) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.entries_path())?;

        let mut buf = Vec::new();
        for (fragment, embedding) in entries {
            let entry = IndexEntryRef {
                fragment,
                embedding,
            };
            serde_json::to_writer(&mut buf, &entry).map_err(store_err)?;
            buf.push(b'\n');
        }

        let mut writer = BufWriter::new(file);
        writer.write_all(&buf)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        // anything another writer appended meanwhile is read on the next sync
        Ok(())
    }
}

impl VectorStore for VectorIndex {
    fn insert(&mut self, fragments: &[Fragment], embeddings: &[Embedding]) -> Result<usize> {
        self.store.validate(fragments, embeddings)?;
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.manifest.dimension) {
            return Err(Error::InvalidInput(format!(
                "embedding dimension {} does not match index dimension {}",
                bad.len(),
                self.manifest.dimension
            )));
        }

        self.sync_entries(true)?;

        let mut seen = std::collections::HashSet::new();
        let new: Vec<(&Fragment, &Embedding)> = fragments
            .iter()
            .zip(embeddings)
            .filter(|(f, _)| !self.store.contains(&f.id) && seen.insert(f.id.as_str()))
            .collect();
        if new.is_empty() {
            return Ok(0);
        }

        let (fragments, embeddings): (Vec<Fragment>, Vec<Embedding>) = new
            .into_iter()
            .map(|(f, e)| (f.clone(), e.clone()))
            .unzip();
        let pairs: Vec<_> = fragments.iter().zip(&embeddings).collect();
        self.append_entries(&pairs)?;
        let added = self.store.insert(&fragments, &embeddings)?;
        self.sync_entries(false)?;
        Ok(added)
    }

    fn search(&self, query_embedding: &Embedding, k: usize) -> Result<Vec<SearchResult>> {
        self.store.search(query_embedding, k)
    }

    fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    /// Drop every entry. The manifest stays, so the index remains usable
    /// with the same embedder.
    fn clear(&mut self) -> Result<()> {
        remove_if_exists(&self.entries_path())?;
        self.valid_len = 0;
        self.store.clear()
    }
}

#[derive(Serialize)]
struct IndexEntryRef<'a> {
    fragment: &'a Fragment,
    embedding: &'a Embedding,
}

fn read_manifest(path: &Path) -> Result<IndexManifest> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Store(format!("unreadable manifest {}: {e}", path.display())))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

fn store_err(e: serde_json::Error) -> Error {
    Error::Store(e.to_string())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
