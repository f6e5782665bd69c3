//! Spreadsheet input. Only the active worksheet is read; its first
//! non-empty row is the header.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use dataforge_core::{ReadError, TabularRecord};
use roxmltree::Node;
use tracing::debug;

use crate::ooxml::{self, Package};

const FORMAT: &str = "XLSX";
const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";

/// Rendering of date-formatted cells.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Rendering of time-only cells that carry no day part.
const TIME_FORMAT: &str = "%H:%M:%S";

/// Worksheets hold at most 16384 columns (`A` to `XFD`).
const MAX_COLUMNS: usize = 16_384;

pub fn parse_xlsx(bytes: &[u8]) -> Result<TabularRecord, ReadError> {
    let mut package = Package::open(bytes, FORMAT)?;

    let workbook_xml = package.read_part(WORKBOOK_PART)?;
    let workbook = WorkbookInfo::parse(&workbook_xml)?;
    let rels_xml = package.read_part(WORKBOOK_RELS_PART)?;
    let sheet_part = resolve_target(&rels_xml, &workbook.active_rel_id)?;
    debug!(sheet = %workbook.active_name, part = %sheet_part, "reading active worksheet");

    let shared_strings = match package.read_optional_part(SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let styles = match package.read_optional_part(STYLES_PART)? {
        Some(xml) => NumberStyles::parse(&xml)?,
        None => NumberStyles::default(),
    };

    let sheet_xml = package.read_part(&sheet_part)?;
    let context = CellContext {
        shared_strings: &shared_strings,
        styles: &styles,
        date1904: workbook.date1904,
    };
    let rows = read_rows(&sheet_xml, &sheet_part, &context)?;
    Ok(build_record(rows))
}

fn is(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

struct WorkbookInfo {
    active_name: String,
    active_rel_id: String,
    date1904: bool,
}

impl WorkbookInfo {
    fn parse(xml: &str) -> Result<Self, ReadError> {
        let doc = ooxml::parse_xml(xml, FORMAT, WORKBOOK_PART)?;
        let root = doc.root_element();

        let active_tab: usize = root
            .descendants()
            .find(|n| is(n, "workbookView"))
            .and_then(|n| n.attribute("activeTab"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let date1904 = root
            .children()
            .find(|n| is(n, "workbookPr"))
            .and_then(|n| n.attribute("date1904"))
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let sheets: Vec<Node<'_, '_>> = root
            .children()
            .filter(|n| is(n, "sheets"))
            .flat_map(|n| n.children().filter(|c| is(c, "sheet")))
            .collect();
        let sheet = sheets
            .get(active_tab)
            .or_else(|| sheets.first())
            .ok_or_else(|| ReadError::malformed(FORMAT, "workbook has no sheets"))?;

        // The relationship id lives in the officeDocument relationships
        // namespace, which differs between transitional and strict files.
        let active_rel_id = sheet
            .attributes()
            .find(|a| a.name() == "id" && a.namespace().is_some())
            .map(|a| a.value().to_string())
            .ok_or_else(|| ReadError::malformed(FORMAT, "sheet has no relationship id"))?;

        Ok(Self {
            active_name: sheet.attribute("name").unwrap_or_default().to_string(),
            active_rel_id,
            date1904,
        })
    }
}

/// Package path of the part that relationship `rel_id` points to.
fn resolve_target(rels_xml: &str, rel_id: &str) -> Result<String, ReadError> {
    let doc = ooxml::parse_xml(rels_xml, FORMAT, WORKBOOK_RELS_PART)?;
    let target = doc
        .root_element()
        .children()
        .filter(|n| is(n, "Relationship"))
        .find(|n| n.attribute("Id") == Some(rel_id))
        .and_then(|n| n.attribute("Target"))
        .ok_or_else(|| ReadError::malformed(FORMAT, format!("no worksheet for relationship {rel_id}")))?;

    Ok(match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    })
}

// ---------------------------------------------------------------------------
// Shared strings and styles
// ---------------------------------------------------------------------------

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, ReadError> {
    let doc = ooxml::parse_xml(xml, FORMAT, SHARED_STRINGS_PART)?;
    Ok(doc
        .root_element()
        .children()
        .filter(|n| is(n, "si"))
        .map(rich_text)
        .collect())
}

/// Text of a string item: plain `<t>` or the concatenated runs of rich text.
/// Phonetic hints (`<rPh>`) are not part of the value.
fn rich_text(item: Node<'_, '_>) -> String {
    item.descendants()
        .filter(|n| is(n, "t"))
        .filter(|n| !n.ancestors().any(|a| is(&a, "rPh")))
        .filter_map(|n| n.text())
        .collect()
}

/// How a number format displays a serial value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum NumberStyle {
    #[default]
    Plain,
    Date,
    Time,
}

/// Number style of each cell format (`cellXfs` entry).
#[derive(Debug, Default)]
struct NumberStyles {
    formats: Vec<NumberStyle>,
}

impl NumberStyles {
    fn parse(xml: &str) -> Result<Self, ReadError> {
        let doc = ooxml::parse_xml(xml, FORMAT, STYLES_PART)?;
        let root = doc.root_element();

        let custom: HashMap<u32, NumberStyle> = root
            .children()
            .filter(|n| is(n, "numFmts"))
            .flat_map(|n| n.children().filter(|c| is(c, "numFmt")))
            .filter_map(|n| {
                let id = n.attribute("numFmtId")?.parse().ok()?;
                Some((id, classify_code(n.attribute("formatCode")?)))
            })
            .collect();

        let formats = root
            .children()
            .filter(|n| is(n, "cellXfs"))
            .flat_map(|n| n.children().filter(|c| is(c, "xf")))
            .map(|xf| {
                let id: u32 = xf
                    .attribute("numFmtId")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                custom.get(&id).copied().unwrap_or_else(|| builtin_style(id))
            })
            .collect();

        Ok(Self { formats })
    }

    fn style(&self, style_index: usize) -> NumberStyle {
        self.formats.get(style_index).copied().unwrap_or_default()
    }
}

fn builtin_style(id: u32) -> NumberStyle {
    match id {
        14..=17 | 22 => NumberStyle::Date,
        18..=21 | 45..=47 => NumberStyle::Time,
        _ => NumberStyle::Plain,
    }
}

/// Number style of a custom format code, judged on its first section.
/// Literal text, colors, locales and escaped characters are ignored.
/// Elapsed-time brackets such as `[h]` count as time. A format with hours
/// or seconds but no day or year is a time, so its `m` means minutes.
fn classify_code(code: &str) -> NumberStyle {
    let mut tokens = String::new();
    let mut chars = code.chars();
    while let Some(c) = chars.next() {
        match c {
            ';' => break,
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '[' => {
                let bracket: String = chars.by_ref().take_while(|&c| c != ']').collect();
                let bracket = bracket.to_ascii_lowercase();
                if !bracket.is_empty() && bracket.chars().all(|c| matches!(c, 'h' | 'm' | 's')) {
                    tokens.push('h');
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            _ => tokens.push(c.to_ascii_lowercase()),
        }
    }

    let has = |set: &[char]| tokens.chars().any(|c| set.contains(&c));
    if has(&['d', 'y']) {
        NumberStyle::Date
    } else if has(&['h', 's']) {
        NumberStyle::Time
    } else if has(&['m']) {
        NumberStyle::Date
    } else {
        NumberStyle::Plain
    }
}

/// Convert a spreadsheet serial date. Day zero is 1899-12-30, or 1904-01-01
/// for workbooks using the 1904 date system.
fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)
    }?
    .and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

// ---------------------------------------------------------------------------
// Worksheet
// ---------------------------------------------------------------------------

struct CellContext<'a> {
    shared_strings: &'a [String],
    styles: &'a NumberStyles,
    date1904: bool,
}

/// Non-empty rows of the sheet, each as `(column index, text)` pairs.
fn read_rows(
    xml: &str,
    part: &str,
    context: &CellContext<'_>,
) -> Result<Vec<Vec<(usize, String)>>, ReadError> {
    let doc = ooxml::parse_xml(xml, FORMAT, part)?;
    let sheet_data = doc
        .root_element()
        .children()
        .find(|n| is(n, "sheetData"))
        .ok_or_else(|| ReadError::malformed(FORMAT, format!("{part}: no sheetData")))?;

    let mut rows = Vec::new();
    for row in sheet_data.children().filter(|n| is(n, "row")) {
        let mut cells = Vec::new();
        let mut next_column = 0;
        for cell in row.children().filter(|n| is(n, "c")) {
            let column = match cell.attribute("r") {
                Some(reference) => column_index(reference)?.unwrap_or(next_column),
                None => next_column,
            };
            if column >= MAX_COLUMNS {
                return Err(ReadError::malformed(
                    FORMAT,
                    format!("{part}: more than {MAX_COLUMNS} columns in a row"),
                ));
            }
            next_column = column + 1;
            if let Some(text) = cell_text(cell, context) {
                cells.push((column, text));
            }
        }
        if !cells.is_empty() {
            rows.push(cells);
        }
    }
    Ok(rows)
}

/// Zero-based column of a cell reference such as `AB12`, or `None` when the
/// reference has no column letters. Columns past `XFD` are malformed.
fn column_index(reference: &str) -> Result<Option<usize>, ReadError> {
    let mut index = 0usize;
    let mut letters = 0;
    for b in reference.bytes().take_while(u8::is_ascii_alphabetic) {
        index = index * 26 + usize::from(b.to_ascii_uppercase() - b'A' + 1);
        letters += 1;
        if index > MAX_COLUMNS {
            return Err(ReadError::malformed(
                FORMAT,
                format!("cell reference {reference} is past column XFD"),
            ));
        }
    }
    Ok((letters > 0).then(|| index - 1))
}

/// Display text of a cell, or `None` when it holds no value.
fn cell_text(cell: Node<'_, '_>, context: &CellContext<'_>) -> Option<String> {
    let value = || {
        cell.children()
            .find(|n| is(n, "v"))
            .and_then(|v| v.text())
    };

    let text = match cell.attribute("t").unwrap_or("n") {
        "s" => value()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .and_then(|i| context.shared_strings.get(i))
            .cloned(),
        "inlineStr" => cell.children().find(|n| is(n, "is")).map(rich_text),
        "b" => value().map(|v| crate::bool_text(v.trim() == "1").to_string()),
        "e" | "str" => value().map(str::to_string),
        _ => value().map(|raw| number_text(raw.trim(), cell.attribute("s"), context)),
    }?;

    (!text.is_empty()).then_some(text)
}

fn number_text(raw: &str, style: Option<&str>, context: &CellContext<'_>) -> String {
    let style = style
        .and_then(|s| s.parse::<usize>().ok())
        .map_or(NumberStyle::Plain, |index| context.styles.style(index));
    if style == NumberStyle::Plain {
        return raw.to_string();
    }
    let Some(serial) = raw.parse::<f64>().ok() else {
        return raw.to_string();
    };
    match serial_to_datetime(serial, context.date1904) {
        Some(time) if style == NumberStyle::Time && serial < 1.0 => {
            time.format(TIME_FORMAT).to_string()
        }
        Some(datetime) => datetime.format(DATE_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

/// Lay the sparse rows out on the used column range. The first row is the
/// header.
fn build_record(rows: Vec<Vec<(usize, String)>>) -> TabularRecord {
    let columns = rows.iter().flatten().map(|(column, _)| *column);
    let (Some(first), Some(last)) = (columns.clone().min(), columns.max()) else {
        return TabularRecord::empty();
    };
    let width = last - first + 1;

    let mut grid = rows.into_iter().map(|cells| {
        let mut line = vec![String::new(); width];
        for (column, text) in cells {
            line[column - first] = text;
        }
        line
    });

    let header = grid.next().unwrap_or_default();
    TabularRecord::new(header, grid.collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, XlsxError};

    fn workbook_bytes(build: impl FnOnce(&mut Workbook) -> Result<(), XlsxError>) -> Vec<u8> {
        let mut workbook = Workbook::new();
        build(&mut workbook).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_header_and_rows() {
        let bytes = workbook_bytes(|wb| {
            let ws = wb.add_worksheet();
            ws.write_string(0, 0, "Name")?;
            ws.write_string(0, 1, "Age")?;
            ws.write_string(1, 0, "Ann")?;
            ws.write_number(1, 1, 30)?;
            ws.write_string(2, 0, "Bob")?;
            ws.write_number(2, 1, 2.5)?;
            Ok(())
        });
        let record = parse_xlsx(&bytes).unwrap();
        assert_eq!(record.columns(), ["Name", "Age"]);
        assert_eq!(record.rows(), [vec!["Ann", "30"], vec!["Bob", "2.5"]]);
    }

    #[test]
    fn test_reads_active_sheet() {
        let bytes = workbook_bytes(|wb| {
            wb.add_worksheet().write_string(0, 0, "first")?;
            let second = wb.add_worksheet();
            second.write_string(0, 0, "second")?;
            second.write_string(1, 0, "value")?;
            second.set_active(true);
            Ok(())
        });
        let record = parse_xlsx(&bytes).unwrap();
        assert_eq!(record.columns(), ["second"]);
        assert_eq!(record.rows(), [vec!["value"]]);
    }

    #[test]
    fn test_blank_rows_skipped_and_cells_padded() {
        let bytes = workbook_bytes(|wb| {
            let ws = wb.add_worksheet();
            ws.write_string(2, 2, "A")?;
            ws.write_string(2, 3, "B")?;
            ws.write_string(2, 4, "C")?;
            ws.write_string(5, 2, "x")?;
            ws.write_string(6, 4, "z")?;
            Ok(())
        });
        let record = parse_xlsx(&bytes).unwrap();
        assert_eq!(record.columns(), ["A", "B", "C"]);
        assert_eq!(record.rows(), [vec!["x", "", ""], vec!["", "", "z"]]);
    }

    #[test]
    fn test_dates_and_booleans() {
        let bytes = workbook_bytes(|wb| {
            let ws = wb.add_worksheet();
            let custom = Format::new().set_num_format("dd/mm/yyyy");
            let builtin = Format::new().set_num_format_index(14);
            let date = ExcelDateTime::from_ymd(2024, 1, 15)?;
            ws.write_string(0, 0, "Custom")?;
            ws.write_string(0, 1, "Builtin")?;
            ws.write_string(0, 2, "Flag")?;
            ws.write_datetime_with_format(1, 0, &date, &custom)?;
            ws.write_datetime_with_format(1, 1, &date, &builtin)?;
            ws.write_boolean(1, 2, true)?;
            Ok(())
        });
        let record = parse_xlsx(&bytes).unwrap();
        assert_eq!(
            record.rows(),
            [vec!["2024-01-15 00:00:00", "2024-01-15 00:00:00", "True"]]
        );
    }

    #[test]
    fn test_unicode_strings() {
        let bytes = workbook_bytes(|wb| {
            let ws = wb.add_worksheet();
            ws.write_string(0, 0, "Город")?;
            ws.write_string(1, 0, "Москва")?;
            Ok(())
        });
        let record = parse_xlsx(&bytes).unwrap();
        assert_eq!(record.columns(), ["Город"]);
        assert_eq!(record.cell(0, 0), "Москва");
    }

    #[test]
    fn test_empty_sheet_is_empty_record() {
        let bytes = workbook_bytes(|wb| {
            wb.add_worksheet();
            Ok(())
        });
        assert_eq!(parse_xlsx(&bytes).unwrap(), TabularRecord::empty());
    }

    #[test]
    fn test_not_an_xlsx() {
        let err = parse_xlsx(b"\x00\x01garbage").unwrap_err();
        assert!(matches!(err, ReadError::Malformed { format: "XLSX", .. }));
    }

    #[test]
    fn test_time_only_cells() {
        let bytes = workbook_bytes(|wb| {
            let ws = wb.add_worksheet();
            let time = Format::new().set_num_format("h:mm");
            let elapsed = Format::new().set_num_format("[h]:mm:ss");
            ws.write_string(0, 0, "Start")?;
            ws.write_string(0, 1, "Elapsed")?;
            ws.write_number_with_format(1, 0, 0.5, &time)?;
            ws.write_number_with_format(1, 1, 1.25, &elapsed)?;
            Ok(())
        });
        let record = parse_xlsx(&bytes).unwrap();
        assert_eq!(record.rows(), [vec!["12:00:00", "1899-12-31 06:00:00"]]);
    }

    /// Zip a one-sheet workbook around the given `sheetData` body.
    fn raw_workbook(sheet_data: &str) -> Vec<u8> {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let parts = [
            (
                WORKBOOK_PART,
                r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="S" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
            ),
            (
                WORKBOOK_RELS_PART,
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
            ),
            (
                "xl/worksheets/sheet1.xml",
                format!(
                    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#
                ),
            ),
        ];
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, xml) in parts {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_references_past_last_column_rejected() {
        let inline = |r: &str| {
            format!(r#"<row r="1"><c r="{r}" t="inlineStr"><is><t>x</t></is></c></row>"#)
        };

        let ok = parse_xlsx(&raw_workbook(&inline("XFD1"))).unwrap();
        assert_eq!(ok.columns(), ["x"]);

        for reference in ["XFE1", "ZZZZZZ1", "ZZZZZZZZZZZZZZZ1"] {
            let err = parse_xlsx(&raw_workbook(&inline(reference))).unwrap_err();
            assert!(
                matches!(err, ReadError::Malformed { format: "XLSX", .. }),
                "{reference}: {err:?}"
            );
        }
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1").unwrap(), Some(0));
        assert_eq!(column_index("Z9").unwrap(), Some(25));
        assert_eq!(column_index("AA10").unwrap(), Some(26));
        assert_eq!(column_index("ab3").unwrap(), Some(27));
        assert_eq!(column_index("XFD1").unwrap(), Some(16_383));
        assert_eq!(column_index("12").unwrap(), None);
        assert!(column_index("XFE1").is_err());
        assert!(column_index("ZZZZZZZZZZZZZZZ1").is_err());
    }

    #[test]
    fn test_format_code_styles() {
        assert_eq!(classify_code("yyyy-mm-dd"), NumberStyle::Date);
        assert_eq!(classify_code("[$-409]d-mmm-yy;@"), NumberStyle::Date);
        assert_eq!(classify_code("mmm"), NumberStyle::Date);
        assert_eq!(classify_code("dd/mm/yyyy hh:mm"), NumberStyle::Date);
        assert_eq!(classify_code("h:mm:ss AM/PM"), NumberStyle::Time);
        assert_eq!(classify_code("mm:ss"), NumberStyle::Time);
        assert_eq!(classify_code("[h]:mm"), NumberStyle::Time);
        assert_eq!(classify_code("[mm]"), NumberStyle::Time);
        assert_eq!(classify_code("General"), NumberStyle::Plain);
        assert_eq!(classify_code("#,##0.00"), NumberStyle::Plain);
        assert_eq!(classify_code("0.00\" days\""), NumberStyle::Plain);
        assert_eq!(classify_code("[Red]0.00"), NumberStyle::Plain);
        assert_eq!(classify_code("0;[Red]hh"), NumberStyle::Plain);
        assert_eq!(builtin_style(14), NumberStyle::Date);
        assert_eq!(builtin_style(20), NumberStyle::Time);
        assert_eq!(builtin_style(46), NumberStyle::Time);
        assert_eq!(builtin_style(2), NumberStyle::Plain);
    }

    #[test]
    fn test_serial_dates() {
        let dt = serial_to_datetime(45306.5, false).unwrap();
        assert_eq!(dt.format(DATE_FORMAT).to_string(), "2024-01-15 12:00:00");
        let dt = serial_to_datetime(0.0, true).unwrap();
        assert_eq!(dt.format(DATE_FORMAT).to_string(), "1904-01-01 00:00:00");
        assert!(serial_to_datetime(f64::NAN, false).is_none());
    }

    #[test]
    fn test_shared_strings_skip_phonetic_runs() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
            <si><t>plain</t></si>
            <si><r><t>ri</t></r><r><t>ch</t></r><rPh sb="0" eb="1"><t>hint</t></rPh></si>
        </sst>"#;
        assert_eq!(parse_shared_strings(xml).unwrap(), ["plain", "rich"]);
    }
}
