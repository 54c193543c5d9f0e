use crate::error::FillError;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::{Cursor, Read, Write};
use std::path::Path;

lazy_static! {
    static ref PARA_START_REGEX: Regex = Regex::new(r"<w:p[ >]").unwrap();
    static ref RUN_TEXT_REGEX: Regex = Regex::new(r"<w:t(?: [^>]*)?>([^<]*)</w:t>").unwrap();
}

const PARA_END: &str = "</w:p>";

/// A Word document package: the zip entries in their original order.
///
/// The package is read fully into memory, the main document part is edited as
/// text, and everything is written back out. Untouched entries round-trip
/// byte for byte.
pub struct DocxPackage {
    entries: Vec<(String, Vec<u8>)>,
}

pub const DOCUMENT_PART: &str = "word/document.xml";

impl DocxPackage {
    /// Open a package from uploaded bytes.
    pub fn read_bytes(bytes: &[u8]) -> Result<Self, FillError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| FillError::BadDocument(format!("not a valid docx archive: {}", e)))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| FillError::BadDocument(e.to_string()))?;
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| FillError::BadDocument(e.to_string()))?;
            entries.push((name, data));
        }

        let package = DocxPackage { entries };
        if package.entry(DOCUMENT_PART).is_none() {
            return Err(FillError::BadDocument(format!(
                "package has no {}",
                DOCUMENT_PART
            )));
        }
        Ok(package)
    }

    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, FillError> {
        let bytes = std::fs::read(path)?;
        DocxPackage::read_bytes(&bytes)
    }

    /// Serialize the package back to docx bytes. Media entries are stored
    /// uncompressed and everything else deflated, matching the typical layout
    /// Word produces.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FillError> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let deflated = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            let stored = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);

            for (name, data) in &self.entries {
                let opts = if name.starts_with("word/media/") {
                    stored
                } else {
                    deflated
                };
                writer.start_file(name.as_str(), opts)?;
                writer.write_all(data)?;
            }
            writer.finish()?;
        }
        Ok(buffer.into_inner())
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), FillError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn entry(&self, name: &str) -> Option<&Vec<u8>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data)
    }

    /// The main document part as text.
    pub fn document_xml(&self) -> Result<String, FillError> {
        let data = self
            .entry(DOCUMENT_PART)
            .ok_or_else(|| FillError::BadDocument(format!("package has no {}", DOCUMENT_PART)))?;
        String::from_utf8(data.clone())
            .map_err(|e| FillError::BadDocument(format!("{} is not valid UTF-8: {}", DOCUMENT_PART, e)))
    }

    pub fn set_document_xml(&mut self, xml: String) {
        if let Some((_, data)) = self.entries.iter_mut().find(|(n, _)| n == DOCUMENT_PART) {
            *data = xml.into_bytes();
        }
    }

    pub fn entry_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// Byte span of one text run's content inside a paragraph, plus the raw
/// (still XML-escaped) text it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Find all `<w:p ...>...</w:p>` paragraph byte ranges in the document XML.
///
/// Paragraphs do not nest in WordprocessingML, so a forward walk pairing each
/// start with the first end after it yields non-overlapping spans in document
/// order. Paragraphs inside table cells are ordinary `<w:p>` elements and are
/// picked up by the same scan. Self-closing empty paragraphs
/// (`<w:p/>`, `<w:p w:rsidR="..."/>`) carry no runs and have no end tag, so
/// they are skipped; pairing one with a later `</w:p>` would swallow the
/// following paragraph.
pub fn find_paragraphs(xml: &str) -> Vec<(usize, usize)> {
    let mut paragraphs = Vec::new();
    let mut cursor = 0usize;

    for m in PARA_START_REGEX.find_iter(xml) {
        let ps = m.start();
        if ps < cursor {
            continue;
        }
        let Some(tag_len) = xml[ps..].find('>') else {
            continue; // truncated tag at end of input
        };
        if xml[ps..ps + tag_len].ends_with('/') {
            continue; // self-closing, no content
        }
        if let Some(rel) = xml[ps..].find(PARA_END) {
            let pe = ps + rel + PARA_END.len();
            paragraphs.push((ps, pe));
            cursor = pe;
        }
    }
    paragraphs
}

/// Find the content spans of all `<w:t>` elements within one paragraph's XML.
/// Offsets are relative to the paragraph slice.
pub fn find_runs(paragraph_xml: &str) -> Vec<RunSpan> {
    RUN_TEXT_REGEX
        .captures_iter(paragraph_xml)
        .map(|caps| {
            let content = caps.get(1).expect("run regex has one capture group");
            RunSpan {
                start: content.start(),
                end: content.end(),
                text: content.as_str().to_string(),
            }
        })
        .collect()
}

/// Decode the predefined XML entities in run text.
pub fn xml_unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Encode text for use as XML element content.
pub fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
