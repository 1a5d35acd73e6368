//! Document loading
//!
//! Walks a data directory, parses every supported file and chunks the
//! parsed pages into [`Fragment`]s tagged with their source path and page.
//!
//! | Extension | Parser             | Pages                 |
//! |-----------|--------------------|-----------------------|
//! | `txt`     | [`TextParser`]     | one, unnumbered       |
//! | `md`      | [`MarkdownParser`] | one, unnumbered       |
//! | `pdf`     | [`PdfParser`]      | one per page, 1-based |
//! | `docx`    | [`DocxParser`]     | one, unnumbered       |
//!
//! Anything else is skipped. A file that fails to parse is reported in
//! [`LoadReport::failures`] and does not stop the walk.
//!
//! # Usage
//!
//! ```ignore
//! use docchat_lib::load::DocumentLoader;
//!
//! let report = DocumentLoader::new("data").load()?;
//! println!("{} fragments from {} files", report.fragments.len(), report.files_loaded);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::chunk::{Chunker, Fragment, FragmentMetadata, ParagraphChunker};
use crate::{Error, Result};

mod docx;
mod markdown;
mod pdf;
mod text;

pub use docx::DocxParser;
pub use markdown::MarkdownParser;
pub use pdf::PdfParser;
pub use text::TextParser;

/// Parsed text of one page of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number for paged formats
    pub number: Option<u32>,
    pub text: String,
}

impl Page {
    pub fn unnumbered(text: impl Into<String>) -> Self {
        Self {
            number: None,
            text: text.into(),
        }
    }
}

/// Turns the raw bytes of one file into pages of plain text.
pub trait Parser: Send + Sync {
    /// Parse `bytes` read from `path`.
    ///
    /// Failures are reported as [`Error::Parse`].
    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<Vec<Page>>;

    /// Returns the name of this parser
    fn name(&self) -> &str;
}

/// Parser for `path`, chosen by its extension (case-insensitive).
#[must_use]
pub fn parser_for(path: &Path) -> Option<&'static dyn Parser> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" => Some(&TextParser),
        "md" => Some(&MarkdownParser),
        "pdf" => Some(&PdfParser),
        "docx" => Some(&DocxParser),
        _ => None,
    }
}

/// Whether any parser handles `path`.
#[must_use]
pub fn is_supported(path: &Path) -> bool {
    parser_for(path).is_some()
}

/// Outcome of loading a directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Fragments of every file that parsed, in walk order.
    pub fragments: Vec<Fragment>,
    /// Number of files that parsed.
    pub files_loaded: usize,
    /// Files that could not be read or parsed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl LoadReport {
    /// No fragments were produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Loads documents below a root directory.
pub struct DocumentLoader {
    root: PathBuf,
    chunker: ParagraphChunker,
}

impl DocumentLoader {
    /// Loader over `root` with the default [`ParagraphChunker`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunker: ParagraphChunker::default(),
        }
    }

    /// Load every supported file below the root, recursively.
    ///
    /// Files are visited in sorted name order. Returns
    /// [`Error::DataDirMissing`] if the root is not a directory; an empty
    /// report is not an error.
    pub fn load(&self) -> Result<LoadReport> {
        if !self.root.is_dir() {
            return Err(Error::DataDirMissing(self.root.clone()));
        }

        let mut report = LoadReport::default();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                    tracing::warn!(path = %path.display(), error = %e, "cannot read directory entry");
                    report.failures.push((path, e.to_string()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(parser) = parser_for(path) else {
                tracing::trace!(path = %path.display(), "skipping unsupported file");
                continue;
            };

            match self.load_with(path, parser) {
                Ok(fragments) => {
                    tracing::debug!(
                        path = %path.display(),
                        parser = parser.name(),
                        fragments = fragments.len(),
                        "loaded document"
                    );
                    report.files_loaded += 1;
                    report.fragments.extend(fragments);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to load document");
                    report.failures.push((path.to_path_buf(), e.to_string()));
                }
            }
        }

        tracing::info!(
            root = %self.root.display(),
            files = report.files_loaded,
            fragments = report.fragments.len(),
            failures = report.failures.len(),
            "loaded documents"
        );
        Ok(report)
    }

    /// Load a single file.
    ///
    /// Returns [`Error::UnsupportedFormat`] when no parser handles its
    /// extension.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Vec<Fragment>> {
        let path = path.as_ref();
        let parser = parser_for(path).ok_or_else(|| Error::UnsupportedFormat(path.to_path_buf()))?;
        self.load_with(path, parser)
    }

    fn load_with(&self, path: &Path, parser: &dyn Parser) -> Result<Vec<Fragment>> {
        let bytes = fs::read(path)?;
        let pages = parser.parse(path, &bytes)?;
        let source = path.display().to_string();

        Ok(pages
            .iter()
            .flat_map(|page| {
                self.chunker
                    .chunk(&page.text, FragmentMetadata::new(source.clone(), page.number))
            })
            .collect())
    }
}
