use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::load::{Page, Parser};
use crate::{Error, Result};

/// PDF text extraction, one [`Page`] per PDF page numbered from 1.
///
/// Image-only pages come back with empty text and produce no fragments.
pub struct PdfParser;

impl Parser for PdfParser {
    fn name(&self) -> &str {
        "pdf"
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<Vec<Page>> {
        let parse_err = |message: String| Error::Parse {
            path: path.to_path_buf(),
            message,
        };

        // pdf-extract panics on some malformed documents
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }))
        .map_err(|_| parse_err("PDF extractor panicked".to_string()))?
        .map_err(|e| parse_err(e.to_string()))?;

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page {
                number: Some(i as u32 + 1),
                text,
            })
            .collect())
    }
}
