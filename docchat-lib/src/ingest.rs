//! Ingestion pipeline
//!
//! ```text
//! data dir -> DocumentLoader -> fragments -> Embedder -> VectorIndex
//! ```
//!
//! Documents are loaded before the embedding model is created, so a missing
//! or empty data directory is reported without downloading or starting the
//! model.

use std::path::PathBuf;

use crate::config::Settings;
use crate::embed::Embedder;
use crate::load::DocumentLoader;
use crate::store::{BuildMode, VectorIndex, VectorStore};
use crate::{Error, Result};

/// Summary of an ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    pub files_loaded: usize,
    /// Fragments produced by the loader.
    pub fragments: usize,
    /// Fragments newly written to the index.
    pub added: usize,
    /// Entries in the index after the run.
    pub total: usize,
    pub failures: Vec<(PathBuf, String)>,
    pub index_dir: PathBuf,
}

/// Load everything under `settings.data_dir` and persist it to
/// `settings.storage_dir`.
///
/// `make_embedder` is only called once documents were found. Fails with
/// [`Error::DataDirMissing`] or [`Error::NoDocuments`] before that.
pub fn ingest<E, F>(settings: &Settings, mode: BuildMode, make_embedder: F) -> Result<IngestReport>
where
    E: Embedder,
    F: FnOnce() -> Result<E>,
{
    let loaded = DocumentLoader::new(&settings.data_dir).load()?;
    if loaded.is_empty() {
        return Err(Error::NoDocuments(settings.data_dir.clone()));
    }

    let mut embedder = make_embedder()?;
    let mut index = VectorIndex::open_or_create(&settings.storage_dir, &embedder, mode)?;
    let added = index.extend(&mut embedder, &loaded.fragments)?;
    index.commit()?;
    tracing::info!(
        added,
        total = index.len(),
        dir = %index.dir().display(),
        "ingestion complete"
    );

    Ok(IngestReport {
        files_loaded: loaded.files_loaded,
        fragments: loaded.fragments.len(),
        added,
        total: index.len(),
        failures: loaded.failures,
        index_dir: index.dir().to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;

    use super::*;
    use crate::test_support::KeywordEmbedder;

    fn settings(tmp: &tempfile::TempDir) -> Settings {
        Settings {
            data_dir: tmp.path().join("data"),
            storage_dir: tmp.path().join("storage/index"),
        }
    }

    #[test]
    fn test_missing_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ingest(&settings(&tmp), BuildMode::Append, || Ok(KeywordEmbedder::new())).unwrap_err();
        assert!(matches!(err, Error::DataDirMissing(_)));
    }

    #[test]
    fn test_empty_data_dir_does_not_load_model() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings(&tmp);
        fs::create_dir_all(&settings.data_dir).unwrap();
        fs::write(settings.data_dir.join("picture.png"), b"png").unwrap();

        let called = Cell::new(false);
        let err = ingest(&settings, BuildMode::Append, || {
            called.set(true);
            Ok(KeywordEmbedder::new())
        })
        .unwrap_err();

        assert!(matches!(err, Error::NoDocuments(_)));
        assert!(!called.get());
        assert!(!VectorIndex::exists(&settings.storage_dir));
    }

    #[test]
    fn test_ingest_then_reingest_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings(&tmp);
        fs::create_dir_all(&settings.data_dir).unwrap();
        fs::write(settings.data_dir.join("policy.txt"), "Refunds are issued within 30 days.").unwrap();
        fs::write(settings.data_dir.join("shipping.md"), "# Shipping\n\nOrders ship in 5 days.").unwrap();

        let first = ingest(&settings, BuildMode::Append, || Ok(KeywordEmbedder::new())).unwrap();
        assert_eq!(first.files_loaded, 2);
        assert_eq!(first.added, 2);
        assert_eq!(first.total, 2);
        assert!(VectorIndex::exists(&settings.storage_dir));

        let second = ingest(&settings, BuildMode::Append, || Ok(KeywordEmbedder::new())).unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.total, 2);

        // a new document is appended next to the old ones
        fs::write(settings.data_dir.join("support.txt"), "Support answers by email.").unwrap();
        let third = ingest(&settings, BuildMode::Append, || Ok(KeywordEmbedder::new())).unwrap();
        assert_eq!(third.added, 1);
        assert_eq!(VectorIndex::load(&settings.storage_dir).unwrap().len(), 3);
    }

    #[test]
    fn test_rebuild_drops_removed_documents() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings(&tmp);
        fs::create_dir_all(&settings.data_dir).unwrap();
        fs::write(settings.data_dir.join("a.txt"), "first document").unwrap();
        fs::write(settings.data_dir.join("b.txt"), "second document").unwrap();
        ingest(&settings, BuildMode::Append, || Ok(KeywordEmbedder::new())).unwrap();

        fs::remove_file(settings.data_dir.join("b.txt")).unwrap();
        let report = ingest(&settings, BuildMode::Rebuild, || Ok(KeywordEmbedder::new())).unwrap();

        assert_eq!(report.total, 1);
        assert_eq!(report.added, 1);
    }

    #[test]
    fn test_failures_reported_alongside_success() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings(&tmp);
        fs::create_dir_all(&settings.data_dir).unwrap();
        fs::write(settings.data_dir.join("broken.docx"), "not a zip").unwrap();
        fs::write(settings.data_dir.join("ok.txt"), "fine").unwrap();

        let report = ingest(&settings, BuildMode::Append, || Ok(KeywordEmbedder::new())).unwrap();
        assert_eq!(report.files_loaded, 1);
        assert_eq!(report.failures.len(), 1);
    }
}
