//! Minimal PDF file writer.
//!
//! Objects are numbered on [`PdfWriter::reserve`] or [`PdfWriter::add`] and
//! serialized in id order with a classic cross-reference table, so forward
//! references (a page pointing at its parent) are cheap.

use std::fmt;
use std::io::Write;

use chrono::NaiveDateTime;
use flate2::Compression;
use flate2::write::ZlibEncoder;

/// Indirect object number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn number(self) -> usize {
        self.0
    }
}

/// Formats as an indirect reference: `12 0 R`.
impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 0 R", self.0)
    }
}

#[derive(Debug, Default)]
pub struct PdfWriter {
    objects: Vec<Option<Vec<u8>>>,
}

impl PdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id whose body is supplied later with [`PdfWriter::set`].
    pub fn reserve(&mut self) -> ObjectId {
        self.objects.push(None);
        ObjectId(self.objects.len())
    }

    pub fn set(&mut self, id: ObjectId, body: impl Into<Vec<u8>>) {
        if let Some(slot) = self.objects.get_mut(id.0 - 1) {
            *slot = Some(body.into());
        }
    }

    pub fn add(&mut self, body: impl Into<Vec<u8>>) -> ObjectId {
        let id = self.reserve();
        self.set(id, body);
        id
    }

    /// Add a stream object. `extra` holds additional dictionary entries.
    pub fn add_stream(&mut self, extra: &str, data: &[u8]) -> ObjectId {
        self.add(stream_body(extra, data))
    }

    /// Add a stream object compressed with FlateDecode.
    pub fn add_compressed_stream(&mut self, extra: &str, data: &[u8]) -> ObjectId {
        let compressed = deflate(data);
        let extra = if extra.is_empty() {
            "/Filter /FlateDecode".to_string()
        } else {
            format!("/Filter /FlateDecode {extra}")
        };
        self.add(stream_body(&extra, &compressed))
    }

    /// Serialize the file. Reserved ids that were never set become `null`.
    pub fn finish(self, root: ObjectId, info: ObjectId) -> Vec<u8> {
        let mut pdf: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = Vec::with_capacity(self.objects.len());

        // Header, plus a comment with high bytes so tools treat it as binary.
        pdf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        for (index, body) in self.objects.into_iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            pdf.extend_from_slice(body.as_deref().unwrap_or(b"null"));
            pdf.extend_from_slice(b"\nendobj\n");
        }

        // Cross-reference table
        let xref_offset = pdf.len();
        let num_objects = offsets.len() + 1; // +1 for free entry
        pdf.extend_from_slice(format!("xref\n0 {num_objects}\n").as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }

        // Trailer
        pdf.extend_from_slice(
            format!("trailer\n<< /Size {num_objects} /Root {root} /Info {info} >>\n").as_bytes(),
        );
        pdf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());

        pdf
    }
}

fn stream_body(extra: &str, data: &[u8]) -> Vec<u8> {
    let mut body = if extra.is_empty() {
        format!("<< /Length {} >>\nstream\n", data.len())
    } else {
        format!("<< /Length {} {extra} >>\nstream\n", data.len())
    }
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

pub(crate) fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

/// Escape special characters for PDF string literals.
pub fn pdf_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

/// A text string for the document information dictionary. ASCII goes out as
/// a literal; anything else as UTF-16BE hex with a byte-order mark.
pub fn pdf_text_string(s: &str) -> String {
    if s.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return format!("({})", pdf_escape(s));
    }
    let mut hex = String::from("<FEFF");
    for unit in s.encode_utf16() {
        hex.push_str(&format!("{unit:04X}"));
    }
    hex.push('>');
    hex
}

/// `D:YYYYMMDDHHmmSS`, the PDF date format.
pub fn pdf_date(at: &NaiveDateTime) -> String {
    at.format("D:%Y%m%d%H%M%S").to_string()
}
