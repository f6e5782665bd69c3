//! Direct PDF layout: a title block followed by a paginated grid, written
//! straight to PDF with no external tools.

use dataforge_core::{BackendError, BackendKind, DocumentLabels, TabularRecord};
use tracing::{debug, warn};

use crate::fonts::{FontResolutionPolicy, TextEncoder};
use crate::pdf::{PdfWriter, pdf_date, pdf_text_string};
use crate::request::{FontReport, RenderRequest, RenderedDocument};
use crate::sanitize::sanitize;

// A4, in points.
const A4_SHORT: f64 = 595.28;
const A4_LONG: f64 = 841.89;
const MARGIN: f64 = 40.0;

/// Narrowest column drawn on a portrait page; wider tables turn landscape.
pub const MIN_COLUMN_WIDTH: f64 = 12.0;
/// Columns at least this wide get full-size text. Narrower columns shrink
/// it, down to half size.
const COMFORT_COLUMN_WIDTH: f64 = 40.0;
const MIN_TEXT_SCALE: f64 = 0.5;

const TITLE_SIZE: f64 = 18.0;
const INFO_SIZE: f64 = 10.0;
const CELL_PADDING_X: f64 = 4.0;
const CELL_PADDING_Y: f64 = 3.0;

#[derive(Debug, Clone, Copy)]
struct RowStyle {
    size: f64,
    fill: &'static str,
    text: &'static str,
}

/// Dark blue fill, white text.
const HEADER_ROW: RowStyle = RowStyle {
    size: 10.0,
    fill: "0 0 0.545 rg",
    text: "1 1 1 rg",
};

const BODY_ROW: RowStyle = RowStyle {
    size: 8.0,
    fill: "1 1 1 rg",
    text: "0 0 0 rg",
};

impl RowStyle {
    /// The same style with text scaled, rounded to a tenth of a point.
    fn scaled(self, scale: f64) -> Self {
        Self {
            size: (self.size * scale * 10.0).round() / 10.0,
            ..self
        }
    }
}

fn leading(size: f64) -> f64 {
    size * 1.2
}

/// Page size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const PORTRAIT: Self = Self {
        width: A4_SHORT,
        height: A4_LONG,
    };
    pub const LANDSCAPE: Self = Self {
        width: A4_LONG,
        height: A4_SHORT,
    };

    /// Portrait while every column gets [`MIN_COLUMN_WIDTH`], landscape
    /// otherwise.
    pub fn for_columns(count: usize) -> Self {
        if count <= max_portrait_columns() {
            Self::PORTRAIT
        } else {
            Self::LANDSCAPE
        }
    }

    fn usable_width(&self) -> f64 {
        self.width - 2.0 * MARGIN
    }
}

/// Most columns that fit across a portrait page at [`MIN_COLUMN_WIDTH`].
pub fn max_portrait_columns() -> usize {
    (PageSize::PORTRAIT.usable_width() / MIN_COLUMN_WIDTH).floor() as usize
}

/// The direct layout backend.
#[derive(Debug, Clone, Default)]
pub struct DirectLayout {
    fonts: FontResolutionPolicy,
    labels: DocumentLabels,
}

impl DirectLayout {
    pub fn new(fonts: FontResolutionPolicy, labels: DocumentLabels) -> Self {
        Self { fonts, labels }
    }

    pub fn render(&self, request: &RenderRequest) -> Result<RenderedDocument, BackendError> {
        let record = &request.record;
        let page = PageSize::for_columns(record.column_count());
        if page == PageSize::LANDSCAPE {
            debug!(columns = record.column_count(), "wide table, using landscape pages");
        }

        let resolution = self.fonts.resolve();
        if resolution.degraded {
            warn!(
                font = resolution.font.name(),
                skipped = resolution.skipped.len(),
                "Preferred fonts unavailable, falling back"
            );
        }
        let encoder = resolution
            .font
            .encoder()
            .map_err(|e| BackendError::new(BackendKind::DirectLayout, e))?;

        let mut canvas = Canvas::new(encoder, page);
        self.draw_heading(&mut canvas, request);
        if record.column_count() > 0 {
            draw_table(&mut canvas, record);
        }
        let (pages, encoder) = canvas.finish();
        debug!(pages = pages.len(), "direct layout complete");

        let missing_glyphs = encoder.missing_glyphs();
        if missing_glyphs > 0 {
            warn!(
                font = resolution.font.name(),
                missing_glyphs, "Font has no glyphs for some characters; they will not display"
            );
        }

        let bytes = self.assemble(request, page, &pages, &encoder);
        Ok(RenderedDocument {
            bytes,
            backend: BackendKind::DirectLayout,
            font: Some(FontReport {
                font_name: resolution.font.name().to_string(),
                degraded: resolution.degraded,
                missing_glyphs,
            }),
        })
    }

    /// Title, then file name, counts and timestamp, all centred.
    fn draw_heading(&self, canvas: &mut Canvas<'_>, request: &RenderRequest) {
        let labels = &self.labels;
        let center = canvas.page.width / 2.0;
        let width = canvas.page.usable_width();

        for line in canvas.wrap(&sanitize(&labels.title), TITLE_SIZE, width) {
            canvas.centered_line(&line, TITLE_SIZE, center);
        }
        canvas.y -= TITLE_SIZE;

        let info = [
            format!("{}: {}", labels.file, request.filename),
            format!("{}: {}", labels.records, request.record.row_count()),
            format!("{}: {}", labels.columns, request.record.column_count()),
            format!("{}: {}", labels.generated, request.timestamp_label()),
        ];
        for text in info {
            for line in canvas.wrap(&sanitize(&text), INFO_SIZE, width) {
                canvas.centered_line(&line, INFO_SIZE, center);
            }
        }
        canvas.y -= 2.0 * INFO_SIZE;
    }

    fn assemble(
        &self,
        request: &RenderRequest,
        page_size: PageSize,
        pages: &[String],
        encoder: &TextEncoder<'_>,
    ) -> Vec<u8> {
        let PageSize { width, height } = page_size;
        let mut writer = PdfWriter::new();
        let catalog = writer.reserve();
        let page_tree = writer.reserve();
        let font = encoder.write_resources(&mut writer);

        let mut kids = Vec::with_capacity(pages.len());
        for content in pages {
            let contents = writer.add_stream("", content.as_bytes());
            let page = writer.add(format!(
                "<< /Type /Page /Parent {page_tree} /MediaBox [0 0 {width} {height}] \
                 /Contents {contents} /Resources << /Font << /F1 {font} >> >> >>"
            ));
            kids.push(page.to_string());
        }
        writer.set(
            page_tree,
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), kids.len()),
        );
        writer.set(catalog, format!("<< /Type /Catalog /Pages {page_tree} >>"));

        let title = format!("{}: {}", self.labels.title, request.filename);
        let info = writer.add(format!(
            "<< /Title {} /Producer (DataForge) /CreationDate ({}) >>",
            pdf_text_string(&sanitize(&title)),
            pdf_date(&request.generated_at)
        ));
        writer.finish(catalog, info)
    }
}

/// Column geometry and type sizes of one table.
#[derive(Debug, Clone, Copy)]
struct Grid {
    column_width: f64,
    padding_x: f64,
    header: RowStyle,
    body: RowStyle,
}

impl Grid {
    /// Split the usable width evenly. Narrow columns get smaller text and
    /// padding; text that still overflows is clipped to its cell.
    fn new(page: PageSize, count: usize) -> Self {
        let column_width = page.usable_width() / count.max(1) as f64;
        let scale = (column_width / COMFORT_COLUMN_WIDTH).clamp(MIN_TEXT_SCALE, 1.0);
        Self {
            column_width,
            padding_x: (CELL_PADDING_X * scale).min(column_width / 4.0),
            header: HEADER_ROW.scaled(scale),
            body: BODY_ROW.scaled(scale),
        }
    }

    fn text_width(&self) -> f64 {
        self.column_width - 2.0 * self.padding_x
    }
}

/// Header row, then body rows, breaking pages as needed and repeating the
/// header at the top of each page.
fn draw_table(canvas: &mut Canvas<'_>, record: &TabularRecord) {
    let count = record.column_count();
    let grid = Grid::new(canvas.page, count);
    let text_width = grid.text_width();
    let page_space = canvas.page.height - 2.0 * MARGIN;

    let header: Vec<Vec<String>> = record
        .columns()
        .iter()
        .map(|label| canvas.wrap(&sanitize(label), grid.header.size, text_width))
        .collect();
    let header = truncate_lines(header, max_lines(page_space / 3.0, grid.header.size));
    let header_height = row_height(&header, grid.header.size);

    let body_lines = max_lines(page_space - header_height, grid.body.size);
    let row_cells = |canvas: &Canvas<'_>, row: usize| {
        let cells = (0..count)
            .map(|column| canvas.wrap(&sanitize(record.cell(row, column)), grid.body.size, text_width))
            .collect();
        truncate_lines(cells, body_lines)
    };

    // Keep the header together with the first row.
    let first_height = match record.row_count() {
        0 => 0.0,
        _ => row_height(&row_cells(canvas, 0), grid.body.size),
    };
    if canvas.y - header_height - first_height < MARGIN {
        canvas.new_page();
    }
    canvas.draw_row(&header, &grid.header, &grid, header_height);

    for row in 0..record.row_count() {
        let cells = row_cells(canvas, row);
        let height = row_height(&cells, grid.body.size);
        if canvas.y - height < MARGIN {
            canvas.new_page();
            canvas.draw_row(&header, &grid.header, &grid, header_height);
        }
        canvas.draw_row(&cells, &grid.body, &grid, height);
    }
}

fn row_height(cells: &[Vec<String>], size: f64) -> f64 {
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    lines as f64 * leading(size) + 2.0 * CELL_PADDING_Y
}

/// Lines of `size` text that fit in `space` within a padded cell.
fn max_lines(space: f64, size: f64) -> usize {
    (((space - 2.0 * CELL_PADDING_Y) / leading(size)).floor() as usize).max(1)
}

fn truncate_lines(mut cells: Vec<Vec<String>>, limit: usize) -> Vec<Vec<String>> {
    for lines in &mut cells {
        lines.truncate(limit);
    }
    cells
}

/// Content streams under construction. `y` is the top of the free space on
/// the current page.
struct Canvas<'f> {
    encoder: TextEncoder<'f>,
    page: PageSize,
    pages: Vec<String>,
    content: String,
    y: f64,
}

impl<'f> Canvas<'f> {
    fn new(encoder: TextEncoder<'f>, page: PageSize) -> Self {
        Self {
            encoder,
            page,
            pages: Vec::new(),
            content: String::new(),
            y: page.height - MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.content));
        self.y = self.page.height - MARGIN;
    }

    fn finish(mut self) -> (Vec<String>, TextEncoder<'f>) {
        self.pages.push(self.content);
        (self.pages, self.encoder)
    }

    /// One line of text centred on `center_x`, moving `y` down a line.
    fn centered_line(&mut self, text: &str, size: f64, center_x: f64) {
        let baseline = self.y - size;
        self.show_centered(text, size, center_x, baseline);
        self.y -= leading(size);
    }

    fn show_centered(&mut self, text: &str, size: f64, center_x: f64, baseline: f64) {
        if text.is_empty() {
            return;
        }
        let x = center_x - self.encoder.text_width(text, size) / 2.0;
        let operand = self.encoder.encode(text);
        self.content.push_str(&format!(
            "BT /F1 {size} Tf {x:.2} {baseline:.2} Td {operand} Tj ET\n"
        ));
    }

    /// A full-width table row whose top edge is at `y`. Each cell's text is
    /// clipped to the cell.
    fn draw_row(&mut self, cells: &[Vec<String>], style: &RowStyle, grid: &Grid, height: f64) {
        let top = self.y;
        let bottom = top - height;
        let column_width = grid.column_width;
        let usable = self.page.usable_width();

        self.content.push_str(&format!(
            "{} {MARGIN:.2} {bottom:.2} {usable:.2} {height:.2} re f\n",
            style.fill
        ));
        self.content.push_str("0 0 0 RG 1 w\n");
        for column in 0..cells.len() {
            let x = MARGIN + column as f64 * column_width;
            self.content.push_str(&format!(
                "{x:.2} {bottom:.2} {column_width:.2} {height:.2} re S\n"
            ));
        }

        self.content.push_str(style.text);
        self.content.push('\n');
        let line_height = leading(style.size);
        for (column, lines) in cells.iter().enumerate() {
            if lines.iter().all(String::is_empty) {
                continue;
            }
            let left = MARGIN + column as f64 * column_width;
            let center_x = left + column_width / 2.0;
            let block = lines.len() as f64 * line_height;
            let block_top = top - (height - block) / 2.0;
            self.content.push_str(&format!(
                "q {left:.2} {bottom:.2} {column_width:.2} {height:.2} re W n\n"
            ));
            for (index, line) in lines.iter().enumerate() {
                let baseline = block_top - index as f64 * line_height - style.size;
                self.show_centered(line, style.size, center_x, baseline);
            }
            self.content.push_str("Q\n");
        }

        self.y = bottom;
    }

    /// Break `text` into lines no wider than `max_width` at `size`.
    ///
    /// Lines break at whitespace where possible; a word wider than the line
    /// is split between characters. Embedded newlines start new lines.
    /// Always returns at least one (possibly empty) line.
    fn wrap(&self, text: &str, size: f64, max_width: f64) -> Vec<String> {
        let space = self.encoder.text_width(" ", size);
        let mut lines = Vec::new();

        for paragraph in text.split('\n') {
            let mut line = String::new();
            let mut width = 0.0;

            for word in paragraph.split_whitespace() {
                let word_width = self.encoder.text_width(word, size);
                let gap = if line.is_empty() { 0.0 } else { space };

                if width + gap + word_width <= max_width {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    line.push_str(word);
                    width += gap + word_width;
                    continue;
                }

                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    width = 0.0;
                }
                if word_width <= max_width {
                    line.push_str(word);
                    width = word_width;
                    continue;
                }

                for c in word.chars() {
                    let char_width = self.encoder.char_width(c) * size / 1000.0;
                    if width + char_width > max_width && !line.is_empty() {
                        lines.push(std::mem::take(&mut line));
                        width = 0.0;
                    }
                    line.push(c);
                    width += char_width;
                }
            }
            lines.push(line);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{FontCandidate, PdfFont};
    use chrono::NaiveDate;
    use std::path::Path;

    fn request(record: TabularRecord) -> RenderRequest {
        let at = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(10, 20, 30)
            .unwrap();
        RenderRequest::with_timestamp(record, "people.csv", at)
    }

    fn people() -> TabularRecord {
        TabularRecord::new(
            vec!["Name".into(), "Age".into(), "City".into()],
            vec![vec!["Ann".into(), "30".into(), "Paris".into()]],
        )
    }

    fn wide(columns: usize) -> TabularRecord {
        TabularRecord::new(
            (0..columns).map(|i| format!("C{i}")).collect(),
            vec![(0..columns).map(|i| i.to_string()).collect()],
        )
    }

    fn count(haystack: &[u8], needle: &str) -> usize {
        haystack
            .windows(needle.len())
            .filter(|w| *w == needle.as_bytes())
            .count()
    }

    fn builtin() -> DirectLayout {
        DirectLayout::new(FontResolutionPolicy::builtin_only(), DocumentLabels::default())
    }

    #[test]
    fn test_renders_people_table() {
        let document = builtin().render(&request(people())).unwrap();
        let bytes = &document.bytes;
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert_eq!(document.backend, BackendKind::DirectLayout);
        for cell in ["(Name) Tj", "(Age) Tj", "(City) Tj", "(Ann) Tj", "(30) Tj", "(Paris) Tj"] {
            assert_eq!(count(bytes, cell), 1, "{cell}");
        }
        assert_eq!(count(bytes, "/Type /Pages /Kids [5 0 R] /Count 1"), 1);
        assert_eq!(count(bytes, "0 0 0.545 rg"), 1);
        assert_eq!(count(bytes, "/F1 10 Tf"), 3 + 4);
        assert_eq!(count(bytes, "/F1 8 Tf"), 3);
    }

    #[test]
    fn test_heading_block() {
        let bytes = builtin().render(&request(people())).unwrap().bytes;
        assert_eq!(count(&bytes, "/F1 18 Tf"), 1);
        assert_eq!(count(&bytes, "(Data from file) Tj"), 1);
        assert_eq!(count(&bytes, "(File: people.csv) Tj"), 1);
        assert_eq!(count(&bytes, "(Records: 1) Tj"), 1);
        assert_eq!(count(&bytes, "(Columns: 3) Tj"), 1);
        assert_eq!(count(&bytes, "(Generated: 17.05.2024 10:20:30) Tj"), 1);
        assert_eq!(count(&bytes, "/CreationDate (D:20240517102030)"), 1);
    }

    #[test]
    fn test_output_is_deterministic() {
        let layout = builtin();
        let first = layout.render(&request(people())).unwrap().bytes;
        let second = layout.render(&request(people())).unwrap().bytes;
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_record_renders_heading_only() {
        let document = builtin().render(&request(TabularRecord::empty())).unwrap();
        assert_eq!(count(&document.bytes, "(Records: 0) Tj"), 1);
        assert_eq!(count(&document.bytes, "0 0 0.545 rg"), 0);
        assert_eq!(count(&document.bytes, "/Count 1"), 1);
    }

    #[test]
    fn test_header_only_record_draws_header_row() {
        let record = TabularRecord::new(vec!["Name".into(), "Age".into()], Vec::new());
        let bytes = builtin().render(&request(record)).unwrap().bytes;
        assert_eq!(count(&bytes, "0 0 0.545 rg"), 1);
        assert_eq!(count(&bytes, "(Name) Tj"), 1);
        assert_eq!(count(&bytes, "/F1 8 Tf"), 0);
    }

    #[test]
    fn test_mapping_shape_pads_missing_cells() {
        let record = TabularRecord::from_mapping(vec![
            ("name".into(), "Ann".into()),
            ("age".into(), "30".into()),
        ]);
        let bytes = builtin().render(&request(record)).unwrap().bytes;
        assert_eq!(count(&bytes, "(Ann) Tj"), 1);
        assert_eq!(count(&bytes, "(30) Tj"), 1);
        assert_eq!(count(&bytes, "/F1 8 Tf"), 2);
    }

    const PORTRAIT_BOX: &str = "/MediaBox [0 0 595.28 841.89]";
    const LANDSCAPE_BOX: &str = "/MediaBox [0 0 841.89 595.28]";

    #[test]
    fn test_page_orientation_follows_column_count() {
        assert_eq!(max_portrait_columns(), 42);
        assert_eq!(PageSize::for_columns(0), PageSize::PORTRAIT);
        assert_eq!(PageSize::for_columns(42), PageSize::PORTRAIT);
        assert_eq!(PageSize::for_columns(43), PageSize::LANDSCAPE);

        let bytes = builtin().render(&request(people())).unwrap().bytes;
        assert_eq!(count(&bytes, PORTRAIT_BOX), 1);

        let bytes = builtin().render(&request(wide(42))).unwrap().bytes;
        assert_eq!(count(&bytes, PORTRAIT_BOX), 1);

        let bytes = builtin().render(&request(wide(43))).unwrap().bytes;
        assert_eq!(count(&bytes, LANDSCAPE_BOX), 1);
        assert_eq!(count(&bytes, PORTRAIT_BOX), 0);
        assert_eq!(count(&bytes, "(C42) Tj"), 1);
    }

    #[test]
    fn test_very_wide_table_shrinks_and_clips() {
        let document = builtin().render(&request(wide(300))).unwrap();
        let bytes = &document.bytes;
        assert_eq!(document.backend, BackendKind::DirectLayout);
        assert_eq!(count(bytes, LANDSCAPE_BOX), 1);
        // Text bottoms out at half size.
        assert!(count(bytes, "/F1 5 Tf") >= 300);
        assert!(count(bytes, "/F1 4 Tf") >= 300);
        assert_eq!(count(bytes, "/F1 10 Tf"), 4);
        assert_eq!(count(bytes, " re W n"), 600);
    }

    #[test]
    fn test_text_scale_follows_column_width() {
        let roomy = Grid::new(PageSize::PORTRAIT, 3);
        assert_eq!(roomy.header.size, 10.0);
        assert_eq!(roomy.body.size, 8.0);
        assert_eq!(roomy.padding_x, CELL_PADDING_X);

        // 515.28 / 16 is about 32.2 pt, a 0.805 scale.
        let tight = Grid::new(PageSize::PORTRAIT, 16);
        assert_eq!(tight.header.size, 8.1);
        assert_eq!(tight.body.size, 6.4);

        let cramped = Grid::new(PageSize::LANDSCAPE, 1000);
        assert_eq!(cramped.header.size, 5.0);
        assert_eq!(cramped.body.size, 4.0);
        assert!(cramped.text_width() > 0.0);
    }

    #[test]
    fn test_rows_paginate_with_repeated_header() {
        let rows = (0..200).map(|i| vec![format!("row {i}"), "x".into()]).collect();
        let record = TabularRecord::new(vec!["Name".into(), "Value".into()], rows);
        let bytes = builtin().render(&request(record)).unwrap().bytes;

        let text = String::from_utf8_lossy(&bytes);
        let pages: usize = text
            .split("/Type /Pages /Kids [")
            .nth(1)
            .and_then(|rest| rest.split("/Count ").nth(1))
            .and_then(|rest| rest.split(' ').next())
            .unwrap()
            .parse()
            .unwrap();
        assert!(pages > 1);
        assert_eq!(count(&bytes, "(Name) Tj"), pages);
        assert_eq!(count(&bytes, "(row 0) Tj"), 1);
        assert_eq!(count(&bytes, "(row 199) Tj"), 1);
    }

    #[test]
    fn test_cells_are_sanitized() {
        let record = TabularRecord::new(vec!["Note".into()], vec![vec!["📊 a\u{7}b".into()]]);
        let mut request = request(record);
        request.filename = "📁 data.csv".into();
        let bytes = builtin().render(&request).unwrap().bytes;
        assert_eq!(count(&bytes, "(RECORDS ab) Tj"), 1);
        assert_eq!(count(&bytes, "(File: FILE data.csv) Tj"), 1);
    }

    #[test]
    fn test_custom_labels() {
        let labels = DocumentLabels {
            title: "Report".into(),
            records: "Rows".into(),
            ..DocumentLabels::default()
        };
        let layout = DirectLayout::new(FontResolutionPolicy::builtin_only(), labels);
        let bytes = layout.render(&request(people())).unwrap().bytes;
        assert_eq!(count(&bytes, "(Report) Tj"), 1);
        assert_eq!(count(&bytes, "(Rows: 1) Tj"), 1);
    }

    #[test]
    fn test_builtin_font_reports_missing_glyphs() {
        let record = TabularRecord::new(vec!["Город".into()], vec![vec!["Москва".into()]]);
        let document = builtin().render(&request(record)).unwrap();
        let font = document.font.unwrap();
        assert_eq!(font.font_name, "Helvetica");
        assert!(!font.degraded);
        assert!(font.missing_glyphs > 0);
        assert_eq!(count(&document.bytes, "(??????) Tj"), 1);
    }

    #[test]
    fn test_unavailable_fonts_still_render_degraded() {
        let tmp = tempfile::tempdir().unwrap();
        let policy = FontResolutionPolicy::new(vec![
            FontCandidate::new("DejaVuSans", tmp.path().join("DejaVuSans.ttf")),
            FontCandidate::new("ArialUnicode", tmp.path().join("Arial Unicode.ttf")),
            FontCandidate::new("RobotoBold", tmp.path().join("Roboto-Bold.ttf")),
        ]);
        let layout = DirectLayout::new(policy, DocumentLabels::default());
        let document = layout.render(&request(people())).unwrap();
        let font = document.font.unwrap();
        assert!(font.degraded);
        assert_eq!(font.font_name, "Helvetica");
    }

    #[test]
    fn test_embedded_font_when_available() {
        let candidates = [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        ];
        let Some(path) = candidates.iter().map(Path::new).find(|p| p.is_file()) else {
            // No system copy of DejaVu Sans to embed.
            return;
        };

        let policy = FontResolutionPolicy::new(vec![FontCandidate::new("DejaVuSans", path)]);
        let layout = DirectLayout::new(policy, DocumentLabels::default());
        let record = TabularRecord::new(vec!["Город".into()], vec![vec!["Москва".into()]]);
        let document = layout.render(&request(record)).unwrap();

        let font = document.font.unwrap();
        assert_eq!(font.font_name, "DejaVuSans");
        assert!(!font.degraded);
        assert_eq!(font.missing_glyphs, 0);
        for marker in [
            "/Subtype /Type0",
            "/Encoding /Identity-H",
            "/Subtype /CIDFontType2",
            "/FontFile2",
            "/ToUnicode",
            "/W [",
        ] {
            assert_eq!(count(&document.bytes, marker), 1, "{marker}");
        }
    }

    #[test]
    fn test_wrap_breaks_on_spaces_and_long_words() {
        let font = PdfFont::Builtin;
        let canvas = Canvas::new(font.encoder().unwrap(), PageSize::PORTRAIT);
        // "aaaa" is 4 * 556 = 2224 thousandths, 22.24 pt at 10 pt.
        let lines = canvas.wrap("aaaa aaaa aaaa", 10.0, 50.0);
        assert_eq!(lines, ["aaaa aaaa", "aaaa"]);

        let lines = canvas.wrap("aaaaaaaaaaaa", 10.0, 25.0);
        assert_eq!(lines, ["aaaa", "aaaa", "aaaa"]);

        assert_eq!(canvas.wrap("a\nb", 10.0, 100.0), ["a", "b"]);
        assert_eq!(canvas.wrap("", 10.0, 100.0), [""]);
    }
}
