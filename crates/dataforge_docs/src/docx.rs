use dataforge_core::{ReadError, TabularRecord};
use roxmltree::Node;
use tracing::debug;

use crate::ooxml::{self, Package, WORD_NS};

const FORMAT: &str = "DOCX";
const DOCUMENT_PART: &str = "word/document.xml";

/// Parse a Word document into a record.
///
/// Every non-blank body paragraph becomes one row, split into cells at tab
/// characters. Tables, headers and footers are not read. Columns are labeled
/// `Column_1..Column_N`.
pub fn parse_docx(bytes: &[u8]) -> Result<TabularRecord, ReadError> {
    let mut package = Package::open(bytes, FORMAT)?;
    let xml = package.read_part(DOCUMENT_PART)?;
    let doc = ooxml::parse_xml(&xml, FORMAT, DOCUMENT_PART)?;

    let body = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name((WORD_NS, "body")))
        .ok_or_else(|| ReadError::malformed(FORMAT, "document has no body"))?;

    let paragraphs: Vec<String> = body
        .children()
        .filter(|n| n.has_tag_name((WORD_NS, "p")))
        .map(paragraph_text)
        .collect();
    debug!(paragraphs = paragraphs.len(), "read docx body");

    let rows = paragraphs
        .iter()
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .map(|text| text.split('\t').map(|cell| cell.trim().to_string()).collect())
        .collect();

    Ok(TabularRecord::with_synthetic_headers(rows))
}

/// Visible text of a paragraph. Only run content counts, so tab stop
/// definitions in the paragraph properties are ignored.
fn paragraph_text(paragraph: Node<'_, '_>) -> String {
    let mut text = String::new();
    for run in paragraph
        .descendants()
        .filter(|n| n.has_tag_name((WORD_NS, "r")))
    {
        for child in run.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "t" => text.push_str(child.text().unwrap_or("")),
                "tab" => text.push('\t'),
                "br" | "cr" => text.push('\n'),
                _ => {}
            }
        }
    }
    text
}
