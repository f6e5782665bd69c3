use std::path::Path;

use chrono::{Local, NaiveDateTime};
use dataforge_core::{BackendKind, TabularRecord};

/// Timestamp format shown in rendered documents.
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Everything a backend needs to render one document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub record: TabularRecord,
    /// Display name of the source file, e.g. `people.csv`.
    pub filename: String,
    pub generated_at: NaiveDateTime,
}

impl RenderRequest {
    /// A request stamped with the current local time.
    pub fn new(record: TabularRecord, filename: impl Into<String>) -> Self {
        Self::with_timestamp(record, filename, Local::now().naive_local())
    }

    /// A request with a fixed timestamp, for reproducible output.
    pub fn with_timestamp(
        record: TabularRecord,
        filename: impl Into<String>,
        generated_at: NaiveDateTime,
    ) -> Self {
        Self {
            record,
            filename: filename.into(),
            generated_at,
        }
    }

    pub fn timestamp_label(&self) -> String {
        self.generated_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Base name for the output file: the display name without directory or
    /// extension.
    pub fn document_stem(&self) -> String {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("document")
            .to_string()
    }
}

/// Which font the direct layout used, and how well it covered the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontReport {
    pub font_name: String,
    /// A higher-priority font candidate was unavailable.
    pub degraded: bool,
    /// Characters the chosen font had no glyph for.
    pub missing_glyphs: usize,
}

/// The output of one backend.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub backend: BackendKind,
    /// Set by backends that choose their own font.
    pub font: Option<FontReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_timestamp_label_format() {
        let request = RenderRequest::with_timestamp(TabularRecord::empty(), "a.csv", at(9, 7, 3));
        assert_eq!(request.timestamp_label(), "05.03.2024 09:07:03");
    }

    #[test]
    fn test_document_stem() {
        let stem = |name: &str| {
            RenderRequest::with_timestamp(TabularRecord::empty(), name, at(0, 0, 0)).document_stem()
        };
        assert_eq!(stem("people.csv"), "people");
        assert_eq!(stem("data/report.v2.xlsx"), "report.v2");
        assert_eq!(stem("notes"), "notes");
        assert_eq!(stem(""), "document");
    }

    #[test]
    fn test_new_uses_current_time() {
        let before = Local::now().naive_local();
        let request = RenderRequest::new(TabularRecord::empty(), "a.csv");
        assert!(request.generated_at >= before - chrono::TimeDelta::seconds(1));
    }
}
