//! Text Extractor — turns an uploaded PDF / Word document into plain text.
//!
//! Policy:
//! - Wrong MIME type → `UnsupportedFileType`.
//! - Bytes that are not the declared container at all (no `%PDF-` header,
//!   not a zip for DOCX) → `UnsupportedDocument`.
//! - Encrypted documents that cannot be read → `PasswordProtected`.
//! - Anything else (corrupt streams, parser panics, image-only scans) degrades:
//!   primary parse → lenient parse → metadata placeholder. Extraction never
//!   blocks a submission for generic corruption.

use std::io::{Cursor, Read};
use std::sync::OnceLock;

use bytes::Bytes;
use chrono::Utc;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// Extracted text shorter than this (in chars, after trimming) counts as a failed attempt.
pub const MIN_TEXT_LENGTH: usize = 10;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
/// PDF allows leading junk before the header; readers scan the first KiB.
const PDF_HEADER_WINDOW: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Unsupported file type '{0}'. Upload a PDF, DOC or DOCX file.")]
    UnsupportedFileType(String),

    #[error("The document structure is invalid: {0}")]
    UnsupportedDocument(String),

    #[error("The document is password protected")]
    PasswordProtected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Doc,
}

impl DocumentKind {
    /// Maps a declared MIME type (parameters ignored) onto a supported kind.
    pub fn from_mime(mime: &str) -> Result<Self, ExtractionError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            MIME_PDF => Ok(DocumentKind::Pdf),
            MIME_DOCX => Ok(DocumentKind::Docx),
            MIME_DOC => Ok(DocumentKind::Doc),
            _ => Err(ExtractionError::UnsupportedFileType(mime.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    /// True when `text` is the metadata placeholder rather than document content.
    pub degraded: bool,
}

/// Extracts plain text from `bytes`. Parsing runs on the blocking pool.
pub async fn extract_text(
    bytes: Bytes,
    mime: &str,
    file_name: &str,
) -> Result<ExtractedText, ExtractionError> {
    let kind = DocumentKind::from_mime(mime)?;
    let file_name = file_name.to_string();

    match tokio::task::spawn_blocking(move || extract_blocking(kind, &bytes, &file_name)).await {
        Ok(result) => result,
        Err(e) => {
            // Only reachable if the blocking task itself was cancelled.
            warn!("Extraction task aborted: {e}");
            Err(ExtractionError::UnsupportedDocument(
                "document could not be processed".to_string(),
            ))
        }
    }
}

fn extract_blocking(
    kind: DocumentKind,
    bytes: &[u8],
    file_name: &str,
) -> Result<ExtractedText, ExtractionError> {
    let kind = check_structure(kind, bytes)?;

    match primary_extract(kind, bytes) {
        Ok(text) if is_meaningful(&text) => {
            return Ok(ExtractedText {
                text,
                degraded: false,
            })
        }
        Ok(text) => debug!(
            "Primary {kind:?} extraction of '{file_name}' yielded {} chars, retrying leniently",
            text.trim().chars().count()
        ),
        Err(ExtractAttempt::Encrypted) => return Err(ExtractionError::PasswordProtected),
        Err(ExtractAttempt::Failed(reason)) => warn!(
            "Primary {kind:?} extraction of '{file_name}' failed: {reason}; retrying leniently"
        ),
    }

    let lenient = normalize_text(&lenient_extract(kind, bytes));
    if is_meaningful(&lenient) {
        return Ok(ExtractedText {
            text: lenient,
            degraded: false,
        });
    }

    if kind == DocumentKind::Pdf && pdf_declares_encryption(bytes) {
        return Err(ExtractionError::PasswordProtected);
    }

    warn!("No usable text in '{file_name}' ({} bytes); using metadata placeholder", bytes.len());
    Ok(ExtractedText {
        text: fallback_text(file_name, bytes.len()),
        degraded: true,
    })
}

enum ExtractAttempt {
    Encrypted,
    Failed(String),
}

/// Rejects bytes that are not the declared container, and resolves `.doc`
/// uploads that are actually DOCX archives.
fn check_structure(kind: DocumentKind, bytes: &[u8]) -> Result<DocumentKind, ExtractionError> {
    match kind {
        DocumentKind::Pdf => {
            let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
            if find_subslice(window, PDF_MAGIC).is_none() {
                return Err(ExtractionError::UnsupportedDocument(
                    "missing PDF header".to_string(),
                ));
            }
            Ok(kind)
        }
        DocumentKind::Docx => {
            if bytes.starts_with(OLE_MAGIC) {
                // Encrypted OOXML is wrapped in an OLE compound file.
                return Err(ExtractionError::PasswordProtected);
            }
            if !bytes.starts_with(ZIP_MAGIC) {
                return Err(ExtractionError::UnsupportedDocument(
                    "not a Word (DOCX) archive".to_string(),
                ));
            }
            Ok(kind)
        }
        DocumentKind::Doc => {
            if bytes.starts_with(ZIP_MAGIC) {
                return Ok(DocumentKind::Docx);
            }
            if !bytes.starts_with(OLE_MAGIC) {
                return Err(ExtractionError::UnsupportedDocument(
                    "not a Word (DOC) document".to_string(),
                ));
            }
            Ok(kind)
        }
    }
}

fn primary_extract(kind: DocumentKind, bytes: &[u8]) -> Result<String, ExtractAttempt> {
    match kind {
        DocumentKind::Pdf => {
            // pdf-extract panics on some malformed inputs; treat that as a failed attempt.
            let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));
            match result {
                Ok(Ok(text)) => Ok(normalize_text(&text)),
                Ok(Err(e)) => Err(ExtractAttempt::Failed(e.to_string())),
                Err(_) => Err(ExtractAttempt::Failed("PDF parser panicked".to_string())),
            }
        }
        DocumentKind::Docx => read_docx_part(bytes, "word/document.xml")
            .map(|xml| normalize_text(&docx_xml_to_text(&xml))),
        // Binary Word has no structured parser here; the lenient scan handles it.
        DocumentKind::Doc => Err(ExtractAttempt::Failed(
            "binary Word documents use the lenient scan".to_string(),
        )),
    }
}

fn read_docx_part(bytes: &[u8], part: &str) -> Result<String, ExtractAttempt> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractAttempt::Failed(format!("invalid archive: {e}")))?;
    let mut file = archive.by_name(part).map_err(|e| match e {
        zip::result::ZipError::UnsupportedArchive(msg) if msg.contains("Password") => {
            ExtractAttempt::Encrypted
        }
        other => ExtractAttempt::Failed(format!("{part}: {other}")),
    })?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| ExtractAttempt::Failed(format!("{part}: {e}")))?;
    Ok(xml)
}

fn lenient_extract(kind: DocumentKind, bytes: &[u8]) -> String {
    match kind {
        DocumentKind::Pdf => scan_pdf_text_operators(bytes),
        DocumentKind::Docx => scan_docx_parts(bytes),
        DocumentKind::Doc => scan_utf16_runs(bytes),
    }
}

/// Reads every readable `word/*.xml` part (body, headers, footers, text boxes),
/// skipping damaged entries instead of failing.
fn scan_docx_parts(bytes: &[u8]) -> String {
    let Ok(mut archive) = zip::ZipArchive::new(Cursor::new(bytes)) else {
        return String::new();
    };
    let mut out = String::new();
    for i in 0..archive.len() {
        let Ok(mut file) = archive.by_index(i) else {
            continue;
        };
        let name = file.name().to_string();
        if !(name.starts_with("word/") && name.ends_with(".xml")) {
            continue;
        }
        let mut xml = String::new();
        if file.read_to_string(&mut xml).is_ok() {
            out.push_str(&docx_xml_to_text(&xml));
            out.push('\n');
        }
    }
    out
}

/// Converts WordprocessingML to text: `<w:t>` runs, paragraph breaks, tabs.
fn docx_xml_to_text(xml: &str) -> String {
    static TOKENS: OnceLock<Regex> = OnceLock::new();
    let re = TOKENS.get_or_init(|| {
        Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|</w:p>|<w:tab/>|<w:br/>|<w:cr/>")
            .expect("valid docx token regex")
    });

    let mut out = String::new();
    for caps in re.captures_iter(xml) {
        match caps.get(1) {
            Some(text) => out.push_str(&decode_xml_entities(text.as_str())),
            None => match &caps[0] {
                "<w:tab/>" => out.push('\t'),
                _ => out.push('\n'),
            },
        }
    }
    out
}

fn decode_xml_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Lenient PDF pass: collects literal strings shown inside uncompressed
/// `BT … ET` text objects. Catches simple generator output that the
/// structured parser rejects because of a broken xref table.
fn scan_pdf_text_operators(bytes: &[u8]) -> String {
    static BLOCKS: OnceLock<BytesRegex> = OnceLock::new();
    static LITERALS: OnceLock<BytesRegex> = OnceLock::new();
    let blocks = BLOCKS.get_or_init(|| {
        BytesRegex::new(r"(?s)\bBT\b(.*?)\bET\b").expect("valid text object regex")
    });
    let literals = LITERALS.get_or_init(|| {
        BytesRegex::new(r"\(((?:\\.|[^\\()])*)\)").expect("valid string literal regex")
    });

    let mut lines = Vec::new();
    for block in blocks.captures_iter(bytes) {
        let parts: Vec<String> = literals
            .captures_iter(&block[1])
            .map(|lit| unescape_pdf_literal(&lit[1]))
            .filter(|s| !s.trim().is_empty())
            .collect();
        if !parts.is_empty() {
            lines.push(parts.join(" "));
        }
    }
    lines.join("\n")
}

fn unescape_pdf_literal(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut iter = raw.iter().copied();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            out.push(b as char);
            continue;
        }
        match iter.next() {
            Some(b'n') => out.push('\n'),
            Some(b'r') => out.push('\r'),
            Some(b't') => out.push('\t'),
            Some(other) => out.push(other as char),
            None => {}
        }
    }
    out.chars().filter(|c| !c.is_control() || c.is_whitespace()).collect()
}

/// Lenient binary-Word pass: Word 97+ stores body text as UTF-16LE.
/// Keeps runs of at least four printable characters.
fn scan_utf16_runs(bytes: &[u8]) -> String {
    const MIN_RUN: usize = 4;
    let mut out = String::new();
    let mut run = String::new();

    let flush = |run: &mut String, out: &mut String| {
        if run.trim().chars().count() >= MIN_RUN {
            out.push_str(run.trim());
            out.push('\n');
        }
        run.clear();
    };

    for pair in bytes.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        match char::from_u32(unit as u32) {
            Some('\r') => flush(&mut run, &mut out),
            Some(c) if unit < 0x2000 && (c.is_alphanumeric() || c.is_ascii_punctuation() || c == ' ') => {
                run.push(c)
            }
            _ => flush(&mut run, &mut out),
        }
    }
    flush(&mut run, &mut out);
    out
}

fn pdf_declares_encryption(bytes: &[u8]) -> bool {
    find_subslice(bytes, b"/Encrypt").is_some()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Trims lines, drops NULs, and collapses runs of blank lines.
fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        let line = line.replace('\0', "");
        let line = line.trim();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn is_meaningful(text: &str) -> bool {
    text.trim().chars().count() >= MIN_TEXT_LENGTH
}

/// Placeholder used when no document text can be recovered. Carries only metadata.
pub fn fallback_text(file_name: &str, size: usize) -> String {
    format!(
        "Resume file: {file_name}\n\
         File size: {size} bytes\n\
         Uploaded at: {}\n\
         Text could not be extracted from this document automatically.",
        Utc::now().to_rfc3339()
    )
}
