//! Font selection and text encoding for the direct layout.
//!
//! TrueType candidates are tried in priority order; the first one that loads
//! is embedded in full as a CID font. When none loads, the standard Helvetica
//! font is used with WinAnsi encoding.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use dataforge_core::{ForgeConfig, Skipped, resolve_first};
use thiserror::Error;
use tracing::debug;
use ttf_parser::{Face, GlyphId};

use crate::pdf::{ObjectId, PdfWriter};

/// Name of the font used when no candidate loads.
pub const BUILTIN_FONT: &str = "Helvetica";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontCandidate {
    pub name: String,
    pub path: PathBuf,
}

impl FontCandidate {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum FontLoadError {
    #[error("Failed to read font file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Font {font} could not be parsed: {reason}")]
    Parse { font: String, reason: String },

    #[error("Font {font} has no TrueType outlines")]
    UnsupportedOutlines { font: String },
}

// ---------------------------------------------------------------------------
// Loaded fonts
// ---------------------------------------------------------------------------

/// A TrueType font program with the metrics needed for its descriptor.
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    name: String,
    data: Vec<u8>,
    units_per_em: u16,
    ascent: i16,
    descent: i16,
    cap_height: i16,
    bbox: [i16; 4],
}

impl EmbeddedFont {
    pub fn load(candidate: &FontCandidate) -> Result<Self, FontLoadError> {
        let data = std::fs::read(&candidate.path).map_err(|source| FontLoadError::Io {
            path: candidate.path.clone(),
            source,
        })?;
        Self::from_bytes(&candidate.name, data)
    }

    /// Validate and measure a font program. CFF-flavoured OpenType and font
    /// collections are rejected since they cannot go into a `FontFile2`.
    pub fn from_bytes(name: &str, data: Vec<u8>) -> Result<Self, FontLoadError> {
        if data.starts_with(b"OTTO") || data.starts_with(b"ttcf") {
            return Err(FontLoadError::UnsupportedOutlines { font: name.into() });
        }

        let face = Face::parse(&data, 0).map_err(|e| FontLoadError::Parse {
            font: name.into(),
            reason: e.to_string(),
        })?;
        let bbox = face.global_bounding_box();
        let (units_per_em, ascent, descent) =
            (face.units_per_em(), face.ascender(), face.descender());
        let cap_height = face.capital_height().unwrap_or(ascent);
        let bbox = [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max];
        drop(face);

        Ok(Self {
            name: pdf_font_name(name),
            data,
            units_per_em,
            ascent,
            descent,
            cap_height,
            bbox,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn face(&self) -> Result<Face<'_>, FontLoadError> {
        Face::parse(&self.data, 0).map_err(|e| FontLoadError::Parse {
            font: self.name.clone(),
            reason: e.to_string(),
        })
    }

    /// Font units to PDF glyph space (1000 per em).
    fn scale(&self, value: f64) -> i64 {
        (value * 1000.0 / f64::from(self.units_per_em.max(1))).round() as i64
    }
}

/// Characters allowed in a PDF font name.
fn pdf_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".into()
    } else {
        cleaned
    }
}

/// The font a document is drawn with.
#[derive(Debug, Clone)]
pub enum PdfFont {
    Embedded(EmbeddedFont),
    Builtin,
}

impl PdfFont {
    pub fn name(&self) -> &str {
        match self {
            Self::Embedded(font) => font.name(),
            Self::Builtin => BUILTIN_FONT,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }

    /// A per-document encoder. Parses the embedded font program once.
    pub fn encoder(&self) -> Result<TextEncoder<'_>, FontLoadError> {
        let kind = match self {
            Self::Embedded(font) => EncoderKind::Embedded {
                font,
                face: font.face()?,
            },
            Self::Builtin => EncoderKind::Builtin,
        };
        Ok(TextEncoder {
            kind,
            used: BTreeMap::new(),
            missing: BTreeSet::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

enum FontSource {
    File(FontCandidate),
    Builtin,
}

impl FontSource {
    fn label(&self) -> String {
        match self {
            Self::File(candidate) => candidate.name.clone(),
            Self::Builtin => BUILTIN_FONT.into(),
        }
    }

    fn load(&self) -> Result<PdfFont, FontLoadError> {
        match self {
            Self::File(candidate) => EmbeddedFont::load(candidate).map(PdfFont::Embedded),
            Self::Builtin => Ok(PdfFont::Builtin),
        }
    }
}

#[derive(Debug)]
pub struct FontResolution {
    pub font: PdfFont,
    /// True when at least one candidate was skipped.
    pub degraded: bool,
    pub skipped: Vec<Skipped<FontLoadError>>,
}

/// Ordered font candidates, always backed by the built-in font.
#[derive(Debug, Clone, Default)]
pub struct FontResolutionPolicy {
    candidates: Vec<FontCandidate>,
}

impl FontResolutionPolicy {
    pub fn new(candidates: Vec<FontCandidate>) -> Self {
        Self { candidates }
    }

    pub fn from_config(config: &ForgeConfig) -> Self {
        Self::new(
            config
                .font_paths()
                .into_iter()
                .map(|(name, path)| FontCandidate::new(name, path))
                .collect(),
        )
    }

    /// No candidates: always resolves to the built-in font.
    pub fn builtin_only() -> Self {
        Self::default()
    }

    pub fn candidates(&self) -> &[FontCandidate] {
        &self.candidates
    }

    /// Walk the chain. Never fails: the built-in font is the last link.
    pub fn resolve(&self) -> FontResolution {
        let chain = self
            .candidates
            .iter()
            .cloned()
            .map(FontSource::File)
            .chain([FontSource::Builtin]);
        let resolution = resolve_first("font", chain, FontSource::label, FontSource::load);
        let degraded = resolution.degraded();
        let font = resolution.value.unwrap_or(PdfFont::Builtin);
        debug!(font = font.name(), degraded, "font resolved");

        FontResolution {
            font,
            degraded,
            skipped: resolution.skipped,
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding and metrics
// ---------------------------------------------------------------------------

enum EncoderKind<'a> {
    Embedded { font: &'a EmbeddedFont, face: Face<'a> },
    Builtin,
}

/// Measures and encodes text in one font, remembering which glyphs were
/// drawn so that the font resources can be written afterwards.
pub struct TextEncoder<'a> {
    kind: EncoderKind<'a>,
    used: BTreeMap<u16, char>,
    missing: BTreeSet<char>,
}

impl TextEncoder<'_> {
    /// Advance width of `c` in thousandths of the font size.
    pub fn char_width(&self, c: char) -> f64 {
        match &self.kind {
            EncoderKind::Embedded { font, face } => {
                let glyph = face.glyph_index(c).unwrap_or(GlyphId(0));
                let advance = face.glyph_hor_advance(glyph).unwrap_or(0);
                font.scale(f64::from(advance)) as f64
            }
            EncoderKind::Builtin => f64::from(helvetica_width(win_ansi_byte(c).unwrap_or(b'?'))),
        }
    }

    /// Width of `text` set at `size` points.
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        text.chars().map(|c| self.char_width(c)).sum::<f64>() * size / 1000.0
    }

    /// Encode `text` as a string operand for `Tj`.
    pub fn encode(&mut self, text: &str) -> String {
        match &self.kind {
            EncoderKind::Embedded { face, .. } => {
                let mut hex = String::with_capacity(text.len() * 4 + 2);
                hex.push('<');
                for c in text.chars() {
                    let gid = match face.glyph_index(c) {
                        Some(glyph) if glyph.0 != 0 => {
                            self.used.entry(glyph.0).or_insert(c);
                            glyph.0
                        }
                        _ => {
                            self.missing.insert(c);
                            0
                        }
                    };
                    hex.push_str(&format!("{gid:04X}"));
                }
                hex.push('>');
                hex
            }
            EncoderKind::Builtin => {
                let mut literal = String::with_capacity(text.len() + 2);
                literal.push('(');
                for c in text.chars() {
                    let byte = match win_ansi_byte(c) {
                        Some(byte) => byte,
                        None => {
                            self.missing.insert(c);
                            b'?'
                        }
                    };
                    match byte {
                        b'(' | b')' | b'\\' => {
                            literal.push('\\');
                            literal.push(char::from(byte));
                        }
                        0x20..=0x7E => literal.push(char::from(byte)),
                        _ => literal.push_str(&format!("\\{byte:03o}")),
                    }
                }
                literal.push(')');
                literal
            }
        }
    }

    /// Distinct characters the font could not draw so far.
    pub fn missing_glyphs(&self) -> usize {
        self.missing.len()
    }

    /// Write the font dictionary (and for embedded fonts, the font program,
    /// descriptor, CID font and ToUnicode map). Returns the id to put in the
    /// page resources.
    pub fn write_resources(&self, writer: &mut PdfWriter) -> ObjectId {
        match &self.kind {
            EncoderKind::Builtin => writer.add(format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{BUILTIN_FONT} /Encoding /WinAnsiEncoding >>"
            )),
            EncoderKind::Embedded { font, face } => self.write_cid_font(writer, font, face),
        }
    }

    fn write_cid_font(&self, writer: &mut PdfWriter, font: &EmbeddedFont, face: &Face<'_>) -> ObjectId {
        let font_file = writer.add_compressed_stream(
            &format!("/Length1 {}", font.data.len()),
            &font.data,
        );

        let descriptor = writer.add(format!(
            "<< /Type /FontDescriptor /FontName /{name} /Flags 32 /FontBBox [{} {} {} {}] \
             /ItalicAngle 0 /Ascent {} /Descent {} /CapHeight {} /StemV 80 /FontFile2 {font_file} >>",
            font.scale(f64::from(font.bbox[0])),
            font.scale(f64::from(font.bbox[1])),
            font.scale(f64::from(font.bbox[2])),
            font.scale(f64::from(font.bbox[3])),
            font.scale(f64::from(font.ascent)),
            font.scale(f64::from(font.descent)),
            font.scale(f64::from(font.cap_height)),
            name = font.name,
        ));

        let widths: Vec<String> = self
            .used
            .keys()
            .map(|gid| {
                let advance = face.glyph_hor_advance(GlyphId(*gid)).unwrap_or(0);
                format!("{gid} [{}]", font.scale(f64::from(advance)))
            })
            .collect();
        let w_array = if widths.is_empty() {
            String::new()
        } else {
            format!(" /W [{}]", widths.join(" "))
        };

        let cid_font = writer.add(format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{name} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {descriptor}{w_array} /CIDToGIDMap /Identity >>",
            name = font.name,
        ));

        let to_unicode = writer.add_stream("", to_unicode_cmap(&self.used).as_bytes());

        writer.add(format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{name} /Encoding /Identity-H \
             /DescendantFonts [{cid_font}] /ToUnicode {to_unicode} >>",
            name = font.name,
        ))
    }
}

/// CMap from glyph ids back to Unicode, so text can be copied out of the PDF.
fn to_unicode_cmap(glyphs: &BTreeMap<u16, char>) -> String {
    let mut out = String::new();
    out.push_str("/CIDInit /ProcSet findresource begin\n");
    out.push_str("12 dict begin\n");
    out.push_str("begincmap\n");
    out.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    out.push_str("/CMapName /Adobe-Identity-UCS def\n");
    out.push_str("/CMapType 2 def\n");
    out.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let entries: Vec<(&u16, &char)> = glyphs.iter().collect();
    // At most 100 entries per bfchar block.
    for block in entries.chunks(100) {
        out.push_str(&format!("{} beginbfchar\n", block.len()));
        for (gid, c) in block {
            let mut units = [0u16; 2];
            let utf16: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            out.push_str(&format!("<{gid:04X}> <{utf16}>\n"));
        }
        out.push_str("endbfchar\n");
    }

    out.push_str("endcmap\n");
    out.push_str("CMapName currentdict /CMap defineresource pop\n");
    out.push_str("end\nend\n");
    out
}

/// WinAnsiEncoding code for `c`, if it has one.
fn win_ansi_byte(c: char) -> Option<u8> {
    let code = u32::from(c);
    if (0x20..=0x7E).contains(&code) || (0xA0..=0xFF).contains(&code) {
        return u8::try_from(code).ok();
    }
    let byte = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Helvetica advance widths for printable ASCII, from the standard AFM.
const HELVETICA_ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

fn helvetica_width(byte: u8) -> u16 {
    match byte {
        0x20..=0x7E => HELVETICA_ASCII_WIDTHS[usize::from(byte - 0x20)],
        _ => 556,
    }
}
