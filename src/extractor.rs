//! Positioned text extraction from PDF pages using lopdf
//!
//! Every show-text operator on a page becomes one [`Fragment`] carrying the
//! decoded string and the origin of the text run in page space. Fragments are
//! returned in content-stream order, which is not necessarily reading order.
//!
//! After each string is shown the text position advances along the baseline,
//! so consecutive `Tj`/`TJ` runs inside one BT/ET block get their own x.
//! Glyph advances come from a simple font's `Widths` array; fonts without one
//! (standard 14 fonts, composite Type0 fonts) are estimated at half an em per
//! character. Character spacing (`Tc`), word spacing (`Tw`), horizontal
//! scaling (`Tz`) and TJ kerning offsets are applied.

use crate::LedgerError;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// A piece of rendered text with its baseline origin
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// The text content
    pub text: String,
    /// X position on page
    pub x: f32,
    /// Y position on page (PDF coordinates, origin at bottom-left)
    pub y: f32,
}

impl Fragment {
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

/// A document that can hand out the fragments of each page
///
/// Pages are numbered from 1. An error from either method aborts processing
/// of the whole document.
pub trait FragmentSource {
    /// Number of pages in the document
    fn page_count(&self) -> u32;

    /// Fragments of a single page, in any order
    fn page_fragments(&self, page: u32) -> Result<Vec<Fragment>, LedgerError>;
}

/// Pre-extracted pages, for callers that bring their own extractor
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pages: Vec<Vec<Fragment>>,
}

impl MemorySource {
    pub fn new(pages: Vec<Vec<Fragment>>) -> Self {
        Self { pages }
    }
}

impl FragmentSource for MemorySource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_fragments(&self, page: u32) -> Result<Vec<Fragment>, LedgerError> {
        page.checked_sub(1)
            .and_then(|idx| self.pages.get(idx as usize))
            .cloned()
            .ok_or_else(|| LedgerError::Parse(format!("page {} out of range", page)))
    }
}

/// A loaded PDF document
pub struct PdfSource {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfSource {
    /// Load a PDF from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        Self::from_document(Document::load(path)?)
    }

    /// Load a PDF from a memory buffer
    pub fn load_mem(buffer: &[u8]) -> Result<Self, LedgerError> {
        Self::from_document(Document::load_mem(buffer)?)
    }

    fn from_document(doc: Document) -> Result<Self, LedgerError> {
        if doc.is_encrypted() {
            return Err(LedgerError::Encrypted);
        }
        let pages = doc.get_pages();
        Ok(Self { doc, pages })
    }
}

impl FragmentSource for PdfSource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_fragments(&self, page: u32) -> Result<Vec<Fragment>, LedgerError> {
        let page_id = self
            .pages
            .get(&page)
            .copied()
            .ok_or_else(|| LedgerError::Parse(format!("page {} out of range", page)))?;
        extract_page_fragments(&self.doc, page_id)
    }
}

/// Extract fragments for every page of a PDF file, in page order
pub fn extract_fragments<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<Fragment>>, LedgerError> {
    let source = PdfSource::load(path)?;
    (1..=source.page_count())
        .map(|page| source.page_fragments(page))
        .collect()
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Advance assumed for glyphs without metrics, in thousandths of an em
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// Glyph widths of a simple font, from its `FirstChar`/`Widths` entries
#[derive(Debug, Clone)]
struct FontWidths {
    first_char: i64,
    widths: Vec<f32>,
}

impl FontWidths {
    fn from_font(doc: &Document, font: &lopdf::Dictionary) -> Option<Self> {
        let first_char = font.get(b"FirstChar").ok()?.as_i64().ok()?;
        let widths = match font.get(b"Widths").ok()? {
            Object::Reference(id) => doc.get_object(*id).ok()?,
            obj => obj,
        };
        let widths = widths
            .as_array()
            .ok()?
            .iter()
            .map(|w| get_number(w).unwrap_or(DEFAULT_GLYPH_WIDTH))
            .collect();
        Some(Self { first_char, widths })
    }

    fn width(&self, code: u8) -> f32 {
        usize::try_from(code as i64 - self.first_char)
            .ok()
            .and_then(|idx| self.widths.get(idx).copied())
            .unwrap_or(DEFAULT_GLYPH_WIDTH)
    }
}

/// Fonts of one page, for decoding strings and measuring them
struct PageFonts<'a> {
    doc: &'a Document,
    fonts: BTreeMap<Vec<u8>, &'a lopdf::Dictionary>,
    widths: HashMap<Vec<u8>, FontWidths>,
}

impl<'a> PageFonts<'a> {
    fn load(doc: &'a Document, page_id: ObjectId) -> Self {
        let fonts = doc.get_page_fonts(page_id).unwrap_or_default();
        let widths = fonts
            .iter()
            .filter_map(|(name, font)| Some((name.clone(), FontWidths::from_font(doc, font)?)))
            .collect();
        Self { doc, fonts, widths }
    }

    #[cfg(test)]
    fn empty(doc: &'a Document) -> Self {
        Self {
            doc,
            fonts: BTreeMap::new(),
            widths: HashMap::new(),
        }
    }

    fn widths(&self, font: &str) -> Option<&FontWidths> {
        self.widths.get(font.as_bytes())
    }

    /// Decode a string operand, using the font's encoding when possible
    fn decode(&self, bytes: &[u8], font: &str) -> String {
        if let Some(font_dict) = self.fonts.get(font.as_bytes()) {
            if let Ok(encoding) = font_dict.get_font_encoding(self.doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }
        decode_fallback(bytes)
    }
}

/// Text positioning state inside a BT/ET block
struct TextState {
    ctm: [f32; 6],
    ctm_stack: Vec<[f32; 6]>,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// Tz as a fraction (1.0 = 100%)
    horizontal_scale: f32,
    font: String,
    font_size: f32,
    in_text_block: bool,
}

impl TextState {
    fn new() -> Self {
        Self {
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            font: String::new(),
            font_size: 12.0,
            in_text_block: false,
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        let translate = [1.0, 0.0, 0.0, 1.0, tx, ty];
        self.line_matrix = multiply_matrices(&translate, &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        // Without an explicit TL, approximate the leading from the font size
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    /// Move the text position along the baseline by `tx` text-space units
    fn advance(&mut self, tx: f32) {
        let translate = [1.0, 0.0, 0.0, 1.0, tx, 0.0];
        self.text_matrix = multiply_matrices(&translate, &self.text_matrix);
    }

    /// Horizontal displacement of a shown string
    ///
    /// Simple fonts with a `Widths` array are measured per byte; anything else
    /// (standard 14 fonts, composite fonts) gets half an em per character.
    fn string_width(&self, bytes: &[u8], text: &str, widths: Option<&FontWidths>) -> f32 {
        let glyph = |w: f32, is_space: bool| {
            w / 1000.0 * self.font_size
                + self.char_spacing
                + if is_space { self.word_spacing } else { 0.0 }
        };
        let total: f32 = match widths {
            Some(widths) => bytes.iter().map(|&b| glyph(widths.width(b), b == b' ')).sum(),
            None => text.chars().map(|c| glyph(DEFAULT_GLYPH_WIDTH, c == ' ')).sum(),
        };
        total * self.horizontal_scale
    }

    fn origin(&self) -> (f32, f32) {
        let combined = multiply_matrices(&self.text_matrix, &self.ctm);
        (combined[4], combined[5])
    }

    /// Decode a string operand and move past it
    fn show(&mut self, fonts: &PageFonts, operand: &Object) -> Option<String> {
        let Object::String(bytes, _) = operand else {
            return None;
        };
        let text = fonts.decode(bytes, &self.font);
        let width = self.string_width(bytes, &text, fonts.widths(&self.font));
        self.advance(width);
        Some(text)
    }

    /// Show a single string, returning it with its starting origin
    fn show_at(&mut self, fonts: &PageFonts, operand: Option<&Object>) -> Option<(String, (f32, f32))> {
        let origin = self.origin();
        let text = self.show(fonts, operand?)?;
        Some((text, origin))
    }

    /// Show a TJ array as one run; numbers shift the position in thousandths of an em
    fn show_array(
        &mut self,
        fonts: &PageFonts,
        operand: Option<&Object>,
    ) -> Option<(String, (f32, f32))> {
        let array = operand?.as_array().ok()?;
        let origin = self.origin();
        let mut combined = String::new();
        for item in array {
            if let Some(adjust) = get_number(item) {
                self.advance(-adjust / 1000.0 * self.font_size * self.horizontal_scale);
            } else if let Some(text) = self.show(fonts, item) {
                combined.push_str(&text);
            }
        }
        Some((combined, origin))
    }
}

/// Extract fragments from a single page
fn extract_page_fragments(doc: &Document, page_id: ObjectId) -> Result<Vec<Fragment>, LedgerError> {
    let fonts = PageFonts::load(doc, page_id);

    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| LedgerError::Parse(e.to_string()))?;

    let content = Content::decode(&content_data).map_err(|e| LedgerError::Parse(e.to_string()))?;

    Ok(fragments_from_operations(&fonts, &content.operations))
}

/// Run a decoded content stream and collect the text it shows
fn fragments_from_operations(fonts: &PageFonts, operations: &[Operation]) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut state = TextState::new();

    for op in operations {
        let shown = match op.operator.as_str() {
            "q" => {
                state.ctm_stack.push(state.ctm);
                None
            }
            "Q" => {
                if let Some(saved) = state.ctm_stack.pop() {
                    state.ctm = saved;
                }
                None
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let mut m = IDENTITY;
                    for (i, operand) in op.operands.iter().take(6).enumerate() {
                        m[i] = get_number(operand).unwrap_or(IDENTITY[i]);
                    }
                    state.ctm = multiply_matrices(&m, &state.ctm);
                }
                None
            }
            "BT" => {
                state.in_text_block = true;
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
                None
            }
            "ET" => {
                state.in_text_block = false;
                None
            }
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Ok(name) = op.operands[0].as_name() {
                        state.font = String::from_utf8_lossy(name).to_string();
                    }
                    if let Some(size) = get_number(&op.operands[1]) {
                        state.font_size = size;
                    }
                }
                None
            }
            "TL" | "Tc" | "Tw" | "Tz" => {
                if let Some(value) = op.operands.first().and_then(get_number) {
                    match op.operator.as_str() {
                        "TL" => state.leading = value,
                        "Tc" => state.char_spacing = value,
                        "Tw" => state.word_spacing = value,
                        _ => state.horizontal_scale = value / 100.0,
                    }
                }
                None
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.move_line(tx, ty);
                }
                None
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    for (i, operand) in op.operands.iter().take(6).enumerate() {
                        state.text_matrix[i] = get_number(operand).unwrap_or(IDENTITY[i]);
                    }
                    state.line_matrix = state.text_matrix;
                }
                None
            }
            "T*" => {
                state.next_line();
                None
            }
            "Tj" => state.show_at(fonts, op.operands.first()),
            "TJ" => state.show_array(fonts, op.operands.first()),
            "'" => {
                state.next_line();
                state.show_at(fonts, op.operands.first())
            }
            "\"" => {
                if let Some(aw) = op.operands.first().and_then(get_number) {
                    state.word_spacing = aw;
                }
                if let Some(ac) = op.operands.get(1).and_then(get_number) {
                    state.char_spacing = ac;
                }
                state.next_line();
                state.show_at(fonts, op.operands.get(2))
            }
            _ => None,
        };

        if let Some((text, (x, y))) = shown {
            if state.in_text_block && !text.trim().is_empty() {
                fragments.push(Fragment { text, x, y });
            }
        }
    }

    fragments
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// UTF-16BE when a byte-order mark is present, Latin-1 otherwise
fn decode_fallback(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }
    bytes.iter().map(|&b| b as char).collect()
}
