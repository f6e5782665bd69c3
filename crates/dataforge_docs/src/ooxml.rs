//! Shared plumbing for the Office Open XML readers (DOCX, XLSX): the zip
//! container and its XML parts.

use std::io::{Cursor, Read};

use dataforge_core::ReadError;
use zip::ZipArchive;
use zip::result::ZipError;

pub(crate) const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// An opened OOXML package.
pub(crate) struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    format: &'static str,
}

impl<'a> Package<'a> {
    /// Open `bytes` as a zip container. `format` names the document kind in
    /// error messages.
    pub(crate) fn open(bytes: &'a [u8], format: &'static str) -> Result<Self, ReadError> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ReadError::malformed(format, format!("not a valid archive: {e}")))?;
        Ok(Self { archive, format })
    }

    /// Read a required part as text.
    pub(crate) fn read_part(&mut self, name: &str) -> Result<String, ReadError> {
        self.read_optional_part(name)?.ok_or_else(|| {
            ReadError::malformed(self.format, format!("missing part {name}"))
        })
    }

    /// Read a part as text, or `None` when the package does not contain it.
    pub(crate) fn read_optional_part(&mut self, name: &str) -> Result<Option<String>, ReadError> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(ReadError::malformed(self.format, format!("{name}: {e}"))),
        };
        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|e| ReadError::malformed(self.format, format!("{name}: {e}")))?;
        Ok(Some(text))
    }
}

/// Parse an XML part, tolerating a leading byte-order mark.
pub(crate) fn parse_xml<'t>(
    text: &'t str,
    format: &'static str,
    part: &str,
) -> Result<roxmltree::Document<'t>, ReadError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    roxmltree::Document::parse(text).map_err(|e| ReadError::malformed(format, format!("{part}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_non_zip() {
        let err = Package::open(b"plain text, not a zip", "XLSX").err().unwrap();
        match err {
            ReadError::Malformed { format, reason } => {
                assert_eq!(format, "XLSX");
                assert!(reason.contains("not a valid archive"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_xml_strips_bom() {
        let doc = parse_xml("\u{feff}<root a=\"1\"/>", "DOCX", "test.xml").unwrap();
        assert_eq!(doc.root_element().attribute("a"), Some("1"));
    }

    #[test]
    fn test_parse_xml_reports_part() {
        let err = parse_xml("<unclosed>", "DOCX", "word/document.xml").unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }
}
