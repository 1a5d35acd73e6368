use std::io::{Cursor, Read};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use zip::ZipArchive;

use crate::load::{Page, Parser};
use crate::{Error, Result};

const DOCUMENT_XML: &str = "word/document.xml";

/// Word (`.docx`) documents.
///
/// Reads the main document part out of the zip container and keeps its text
/// runs. Headers, footers and comments live in other parts and are ignored.
pub struct DocxParser;

/// Elements that carry text or layout, in document order.
static TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab\s*/>|<w:(?:br|cr)(?:\s[^>]*)?/>|</w:p>")
        .expect("static regex")
});

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|[A-Za-z]+);").expect("static regex"));

impl Parser for DocxParser {
    fn name(&self) -> &str {
        "docx"
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<Vec<Page>> {
        let parse_err = |message: String| Error::Parse {
            path: path.to_path_buf(),
            message,
        };

        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| parse_err(format!("not a docx archive: {e}")))?;
        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_XML)
            .map_err(|e| parse_err(format!("missing {DOCUMENT_XML}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| parse_err(format!("unreadable {DOCUMENT_XML}: {e}")))?;

        Ok(vec![Page::unnumbered(document_text(&xml))])
    }
}

/// Plain text of a WordprocessingML body.
fn document_text(xml: &str) -> String {
    let mut text = String::new();
    for token in TOKENS.captures_iter(xml) {
        match token.get(1) {
            Some(run) => text.push_str(&decode_entities(run.as_str())),
            None if token[0].starts_with("<w:tab") => text.push('\t'),
            None => text.push('\n'),
        }
    }
    text.trim().to_string()
}

fn decode_entities(s: &str) -> String {
    ENTITY
        .replace_all(s, |caps: &Captures<'_>| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => name
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| name.strip_prefix('#').map(str::parse))
                    .and_then(std::result::Result::ok)
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
