//! Format readers: CSV, JSON, XLSX, DOCX and plain text, each normalized
//! into a [`TabularRecord`].

pub mod csv;
pub mod docx;
pub mod json;
mod ooxml;
pub mod text;
pub mod xlsx;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use dataforge_core::{ReadError, TabularRecord};
use tracing::{debug, info};

pub use text::DEFAULT_SEPARATOR;

// ---------------------------------------------------------------------------
// Source formats
// ---------------------------------------------------------------------------

/// The kinds of input file the readers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    DelimitedText,
    StructuredMarkup,
    Spreadsheet,
    WordDocument,
    PlainText,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 5] = [
        Self::DelimitedText,
        Self::StructuredMarkup,
        Self::Spreadsheet,
        Self::WordDocument,
        Self::PlainText,
    ];

    /// Map a file extension (without the dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::DelimitedText),
            "json" => Some(Self::StructuredMarkup),
            "xlsx" | "xls" => Some(Self::Spreadsheet),
            "docx" | "doc" => Some(Self::WordDocument),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Detect the format of `path` from its extension.
    pub fn from_path(path: &Path) -> Result<Self, ReadError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| ReadError::UnknownFormat(path.to_path_buf()))
    }

    /// Short tag used on the command line.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::DelimitedText => "csv",
            Self::StructuredMarkup => "json",
            Self::Spreadsheet => "xlsx",
            Self::WordDocument => "docx",
            Self::PlainText => "txt",
        }
    }

    /// Human-readable description of the file kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DelimitedText => "CSV file",
            Self::StructuredMarkup => "JSON file",
            Self::Spreadsheet => "Excel file",
            Self::WordDocument => "Word file",
            Self::PlainText => "Text file",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SourceFormat {
    type Err = ReadError;

    /// Accepts either a tag (`csv`) or an extension-style name (`xls`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| ReadError::UnknownFormat(PathBuf::from(s)))
    }
}

// ---------------------------------------------------------------------------
// Reader dispatch
// ---------------------------------------------------------------------------

/// One reader per source format. Plain text carries its column separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatReader {
    DelimitedText,
    StructuredMarkup,
    Spreadsheet,
    WordDocument,
    PlainText { separator: String },
}

impl FormatReader {
    /// Reader for `format`. `separator` only matters for plain text.
    pub fn for_format(format: SourceFormat, separator: &str) -> Self {
        match format {
            SourceFormat::DelimitedText => Self::DelimitedText,
            SourceFormat::StructuredMarkup => Self::StructuredMarkup,
            SourceFormat::Spreadsheet => Self::Spreadsheet,
            SourceFormat::WordDocument => Self::WordDocument,
            SourceFormat::PlainText => Self::PlainText {
                separator: separator.to_string(),
            },
        }
    }

    pub fn format(&self) -> SourceFormat {
        match self {
            Self::DelimitedText => SourceFormat::DelimitedText,
            Self::StructuredMarkup => SourceFormat::StructuredMarkup,
            Self::Spreadsheet => SourceFormat::Spreadsheet,
            Self::WordDocument => SourceFormat::WordDocument,
            Self::PlainText { .. } => SourceFormat::PlainText,
        }
    }

    /// Read and normalize the file at `path`.
    pub fn read(&self, path: &Path) -> Result<TabularRecord, ReadError> {
        let bytes = std::fs::read(path).map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), format = %self.format(), "read source");

        let record = self.parse(&bytes)?;
        info!(
            "Read {} rows with {} columns from {}",
            record.row_count(),
            record.column_count(),
            path.display()
        );
        Ok(record)
    }

    /// Normalize already-loaded file contents.
    pub fn parse(&self, bytes: &[u8]) -> Result<TabularRecord, ReadError> {
        match self {
            Self::DelimitedText => crate::csv::parse_csv(decode_utf8(bytes)?),
            Self::StructuredMarkup => crate::json::parse_json(decode_utf8(bytes)?),
            Self::Spreadsheet => crate::xlsx::parse_xlsx(bytes),
            Self::WordDocument => crate::docx::parse_docx(bytes),
            Self::PlainText { separator } => {
                crate::text::parse_text(decode_utf8(bytes)?, separator)
            }
        }
    }
}

/// Cell text for a boolean, shared by every reader so the same value looks
/// the same whichever format it came from.
pub(crate) fn bool_text(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Decode UTF-8 text, dropping a leading byte-order mark.
pub(crate) fn decode_utf8(bytes: &[u8]) -> Result<&str, ReadError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ReadError::Encoding {
        valid_up_to: e.valid_up_to(),
    })?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}
