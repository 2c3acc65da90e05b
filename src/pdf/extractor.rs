/*!
 * Glyph extraction from PDF content streams.
 *
 * Every page's content stream is interpreted with enough of the text and
 * graphics state to place each text-showing operation on the page:
 * - text objects and matrices: `BT`, `ET`, `Tm`, `Td`, `TD`, `T*`
 * - text state: `Tf`, `Tc`, `Tw`, `Tz`, `TL`, `Ts`
 * - graphics state: `cm`, `q`, `Q`
 * - showing: `Tj`, `TJ`, `'`, `"`
 *
 * Form XObjects are not descended into, so text drawn through `Do` is not
 * extracted.
 */

use log::{debug, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::ParseError;
use crate::file_utils::has_pdf_header;
use crate::pdf::encoding::{ToUnicodeMap, winansi_decode};
use crate::pdf::fonts::helvetica_width;
use crate::pdf::geometry::{Matrix, PageSize};

/// Maximum depth when following `/Parent` links or references
const MAX_TREE_DEPTH: usize = 16;

/// `TJ` adjustment (in 1/1000 em) beyond which a word space is assumed
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// Width used when a font gives no metrics for a code, in 1/1000 em
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// Largest two-byte CID
const MAX_CID: u32 = 0xFFFF;

/// A piece of text shown on a page, in page user space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedRun {
    pub text: String,
    /// 1-based page number
    pub page: u32,
    /// Baseline origin
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

/// Page number and geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub number: u32,
    pub size: PageSize,
    /// Lower-left corner of the media box
    #[serde(default)]
    pub origin: (f32, f32),
}

/// Runs of a document together with its page geometry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub pages: Vec<PageInfo>,
    pub runs: Vec<PositionedRun>,
}

impl ExtractedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_size(&self, page: u32) -> Option<PageSize> {
        self.pages.iter().find(|p| p.number == page).map(|p| p.size)
    }

    /// Number of distinct pages that produced at least one run
    pub fn pages_with_text(&self) -> usize {
        let mut pages: Vec<u32> = self.runs.iter().map(|r| r.page).collect();
        pages.sort_unstable();
        pages.dedup();
        pages.len()
    }

    /// All run texts joined with single spaces
    pub fn full_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join(" ")
    }
}

/// Extract the positioned text runs of a PDF
pub fn extract(pdf_bytes: &[u8]) -> Result<Vec<PositionedRun>, ParseError> {
    Ok(extract_document(pdf_bytes)?.runs)
}

/// Extract runs and page geometry of a PDF
pub fn extract_document(pdf_bytes: &[u8]) -> Result<ExtractedDocument, ParseError> {
    let doc = load_document(pdf_bytes)?;
    let mut extracted = ExtractedDocument::default();

    for (number, page_id) in doc.get_pages() {
        let (size, origin) = media_box(&doc, page_id);
        extracted.pages.push(PageInfo { number, size, origin });

        let content = match doc.get_page_content(page_id) {
            Ok(content) => content,
            Err(e) => {
                warn!("Page {}: cannot read content stream: {}", number, e);
                continue;
            }
        };
        let content = Content::decode(&content).map_err(|e| ParseError::Unsupported {
            page: number,
            reason: e.to_string(),
        })?;

        let fonts = page_fonts(&doc, page_id);
        let mut interpreter = PageInterpreter::new(number, fonts);
        interpreter.run(&content.operations);
        debug!("Page {}: {} text run(s)", number, interpreter.runs.len());
        extracted.runs.append(&mut interpreter.runs);
    }

    Ok(extracted)
}

/// Load a document, distinguishing encrypted input from malformed input
pub(crate) fn load_document(pdf_bytes: &[u8]) -> Result<Document, ParseError> {
    if !has_pdf_header(pdf_bytes) {
        return Err(ParseError::Malformed("missing %PDF-x.y header".to_string()));
    }

    let doc = Document::load_mem(pdf_bytes).map_err(|e| {
        if contains(pdf_bytes, b"/Encrypt") {
            ParseError::Encrypted
        } else {
            ParseError::Malformed(e.to_string())
        }
    })?;

    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(ParseError::Encrypted);
    }
    Ok(doc)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// A `/W` code in the two-byte CID space
fn cid(value: f32) -> Option<u32> {
    (value.is_finite() && (0.0..=MAX_CID as f32).contains(&value)).then_some(value as u32)
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Follow references until a direct object is reached
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_TREE_DEPTH {
        match obj {
            Object::Reference(id) => obj = doc.get_object(*id).ok()?,
            _ => return Some(obj),
        }
    }
    None
}

pub(crate) fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Look up a page attribute, walking up the page tree for inheritable keys
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        dict = resolve_dict(doc, dict.get(b"Parent").ok()?)?;
    }
    None
}

/// Size and lower-left corner of a page's media box, US Letter at the origin when absent or invalid
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> (PageSize, (f32, f32)) {
    let media_box = match inherited(doc, page_id, b"MediaBox") {
        Some(Object::Array(values)) => values
            .iter()
            .filter_map(|v| resolve(doc, v).and_then(number))
            .collect::<Vec<_>>(),
        _ => Vec::new(),
    };

    match media_box.as_slice() {
        [x0, y0, x1, y1] if x1 != x0 && y1 != y0 => (
            PageSize::from_media_box([*x0, *y0, *x1, *y1]),
            (x0.min(*x1), y0.min(*y1)),
        ),
        _ => (PageSize::default(), (0.0, 0.0)),
    }
}

/// Decoders for the fonts in a page's `/Resources /Font` dictionary
fn page_fonts(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, Rc<FontDecoder>> {
    let Some(resources) = inherited(doc, page_id, b"Resources").and_then(|r| resolve_dict(doc, r)) else {
        return HashMap::new();
    };
    let Some(fonts) = resources.get(b"Font").ok().and_then(|f| resolve_dict(doc, f)) else {
        return HashMap::new();
    };

    fonts
        .iter()
        .filter_map(|(name, font)| {
            let dict = resolve_dict(doc, font)?;
            Some((name.clone(), Rc::new(FontDecoder::from_dict(doc, dict))))
        })
        .collect()
}

/// Standard-14 metric families
#[derive(Debug, Clone, Copy, PartialEq)]
enum StandardMetrics {
    Proportional,
    Monospaced,
}

/// Turns string operand bytes into text and advance widths
#[derive(Debug, Default)]
struct FontDecoder {
    family: Option<String>,
    two_byte: bool,
    to_unicode: Option<ToUnicodeMap>,
    /// Widths by code, in 1/1000 em
    widths: HashMap<u32, f32>,
    default_width: f32,
    standard: Option<StandardMetrics>,
}

/// One decoded character code
struct DecodedGlyph {
    text: String,
    /// Advance in 1/1000 em
    width: f32,
    is_word_space: bool,
}

impl FontDecoder {
    fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let name_of = |key: &[u8]| match dict.get(key).ok().and_then(|o| resolve(doc, o)) {
            Some(Object::Name(name)) => Some(String::from_utf8_lossy(name).to_string()),
            _ => None,
        };

        let subtype = name_of(b"Subtype");
        let family = name_of(b"BaseFont").map(|name| match name.split_once('+') {
            Some((prefix, rest)) if prefix.len() == 6 => rest.to_string(),
            _ => name.clone(),
        });
        let two_byte = subtype.as_deref() == Some("Type0");

        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| match o {
                Object::Stream(stream) => {
                    let data = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());
                    Some(ToUnicodeMap::parse(&data))
                }
                _ => None,
            })
            .filter(|cmap| !cmap.is_empty());

        let mut decoder = FontDecoder {
            family,
            two_byte,
            to_unicode,
            default_width: DEFAULT_GLYPH_WIDTH,
            ..Default::default()
        };

        if two_byte {
            decoder.load_cid_widths(doc, dict);
        } else {
            decoder.load_simple_widths(doc, dict);
        }
        decoder
    }

    fn load_simple_widths(&mut self, doc: &Document, dict: &Dictionary) {
        let first_char = dict.get(b"FirstChar").ok().and_then(|o| resolve(doc, o)).and_then(number);
        let widths = dict.get(b"Widths").ok().and_then(|o| resolve(doc, o));

        if let (Some(first), Some(Object::Array(widths))) = (first_char, widths) {
            for (i, width) in widths.iter().enumerate() {
                if let Some(w) = resolve(doc, width).and_then(number) {
                    self.widths.insert(first as u32 + i as u32, w);
                }
            }
            return;
        }

        self.standard = match self.family.as_deref() {
            Some(name) if name.contains("Courier") => Some(StandardMetrics::Monospaced),
            Some(name) if name.contains("Symbol") || name.contains("Dingbats") => None,
            Some(_) => Some(StandardMetrics::Proportional),
            None => None,
        };
    }

    fn load_cid_widths(&mut self, doc: &Document, dict: &Dictionary) {
        let descendant = match dict.get(b"DescendantFonts").ok().and_then(|o| resolve(doc, o)) {
            Some(Object::Array(fonts)) => fonts.first().and_then(|f| resolve_dict(doc, f)),
            _ => None,
        };
        let Some(descendant) = descendant else { return };

        // PDF default for CIDFonts without /DW
        self.default_width = descendant
            .get(b"DW")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(number)
            .unwrap_or(1000.0);

        let Some(Object::Array(entries)) = descendant.get(b"W").ok().and_then(|o| resolve(doc, o)) else {
            return;
        };

        // [c [w1 w2 ...]] or [c_first c_last w]
        let mut i = 0;
        while i < entries.len() {
            let Some(start) = resolve(doc, &entries[i]).and_then(number).and_then(cid) else { break };
            match entries.get(i + 1).and_then(|o| resolve(doc, o)) {
                Some(Object::Array(widths)) => {
                    let codes = start..=MAX_CID;
                    for (code, width) in codes.zip(widths.iter()) {
                        if let Some(w) = resolve(doc, width).and_then(number) {
                            self.widths.insert(code, w);
                        }
                    }
                    i += 2;
                }
                Some(end) => {
                    let (Some(end), Some(width)) = (number(end), entries.get(i + 2).and_then(|o| resolve(doc, o)).and_then(number)) else {
                        break;
                    };
                    let end = if end >= MAX_CID as f32 { MAX_CID } else { end as u32 };
                    if end >= start {
                        for code in start..=end {
                            self.widths.insert(code, width);
                        }
                    } else {
                        debug!("Ignoring inverted /W range {}..{}", start, end);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Vec<DecodedGlyph> {
        let code_len = if self.two_byte { 2 } else { 1 };
        bytes
            .chunks(code_len)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                let text = match &self.to_unicode {
                    Some(cmap) => cmap.lookup(code).map(str::to_string),
                    None => None,
                }
                .or_else(|| self.fallback_text(code))
                .unwrap_or_default();

                DecodedGlyph {
                    width: self.glyph_width(code, &text),
                    is_word_space: code == 32 && chunk.len() == 1,
                    text,
                }
            })
            .collect()
    }

    fn fallback_text(&self, code: u32) -> Option<String> {
        if self.two_byte {
            char::from_u32(code).filter(|c| !c.is_control()).map(String::from)
        } else {
            winansi_decode(code as u8).map(String::from)
        }
    }

    fn glyph_width(&self, code: u32, text: &str) -> f32 {
        if let Some(width) = self.widths.get(&code) {
            return *width;
        }
        match self.standard {
            Some(StandardMetrics::Monospaced) => 600.0,
            Some(StandardMetrics::Proportional) => text.chars().next().map_or(self.default_width, |c| f32::from(helvetica_width(c))),
            None => self.default_width,
        }
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Rc<FontDecoder>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Element of a text-showing operation
enum ShowItem<'a> {
    Text(&'a [u8]),
    Adjust(f32),
}

struct PageInterpreter {
    page: u32,
    fonts: HashMap<Vec<u8>, Rc<FontDecoder>>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    runs: Vec<PositionedRun>,
}

fn operand(op: &Operation, index: usize) -> f32 {
    op.operands.get(index).and_then(number).unwrap_or(0.0)
}

fn matrix_operand(op: &Operation) -> Option<Matrix> {
    let values: Vec<f32> = op.operands.iter().filter_map(number).collect();
    match values.as_slice() {
        [a, b, c, d, e, f] => Some(Matrix::new(*a, *b, *c, *d, *e, *f)),
        _ => None,
    }
}

impl PageInterpreter {
    fn new(page: u32, fonts: HashMap<Vec<u8>, Rc<FontDecoder>>) -> Self {
        Self {
            page,
            fonts,
            state: GraphicsState::default(),
            stack: Vec::new(),
            tm: Matrix::identity(),
            tlm: Matrix::identity(),
            runs: Vec::new(),
        }
    }

    fn run(&mut self, operations: &[Operation]) {
        for op in operations {
            match op.operator.as_str() {
                "q" => self.stack.push(self.state.clone()),
                "Q" => match self.stack.pop() {
                    Some(state) => self.state = state,
                    None => debug!("Page {}: unbalanced Q", self.page),
                },
                "cm" => {
                    if let Some(m) = matrix_operand(op) {
                        self.state.ctm = m.multiply(&self.state.ctm);
                    }
                }
                "BT" | "ET" => {
                    self.tm = Matrix::identity();
                    self.tlm = Matrix::identity();
                }
                "Tf" => {
                    let font = match op.operands.first() {
                        Some(Object::Name(name)) => self.fonts.get(name).cloned(),
                        _ => None,
                    };
                    if font.is_none() {
                        debug!("Page {}: unknown font in {:?}", self.page, op.operands);
                    }
                    self.state.text.font = font;
                    self.state.text.font_size = operand(op, 1);
                }
                "Tc" => self.state.text.char_spacing = operand(op, 0),
                "Tw" => self.state.text.word_spacing = operand(op, 0),
                "Tz" => self.state.text.horizontal_scaling = operand(op, 0) / 100.0,
                "TL" => self.state.text.leading = operand(op, 0),
                "Ts" => self.state.text.rise = operand(op, 0),
                "Tm" => {
                    if let Some(m) = matrix_operand(op) {
                        self.tm = m;
                        self.tlm = m;
                    }
                }
                "Td" => self.next_line(operand(op, 0), operand(op, 1)),
                "TD" => {
                    self.state.text.leading = -operand(op, 1);
                    self.next_line(operand(op, 0), operand(op, 1));
                }
                "T*" => self.next_line(0.0, -self.state.text.leading),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        self.show(&[ShowItem::Text(bytes)]);
                    }
                }
                "'" => {
                    self.next_line(0.0, -self.state.text.leading);
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        self.show(&[ShowItem::Text(bytes)]);
                    }
                }
                "\"" => {
                    self.state.text.word_spacing = operand(op, 0);
                    self.state.text.char_spacing = operand(op, 1);
                    self.next_line(0.0, -self.state.text.leading);
                    if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                        self.show(&[ShowItem::Text(bytes)]);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(elements)) = op.operands.first() {
                        let items: Vec<ShowItem> = elements
                            .iter()
                            .filter_map(|e| match e {
                                Object::String(bytes, _) => Some(ShowItem::Text(bytes)),
                                other => number(other).map(ShowItem::Adjust),
                            })
                            .collect();
                        self.show(&items);
                    }
                }
                _ => {}
            }
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).multiply(&self.tlm);
        self.tm = self.tlm;
    }

    fn show(&mut self, items: &[ShowItem]) {
        let ts = &self.state.text;
        let Some(font) = ts.font.clone() else {
            debug!("Page {}: text shown without a font", self.page);
            return;
        };
        let (size, th) = (ts.font_size, ts.horizontal_scaling);
        let (tc, tw) = (ts.char_spacing, ts.word_spacing);

        let rise = Matrix::translation(0.0, ts.rise);
        let start = rise.multiply(&self.tm).multiply(&self.state.ctm);
        let mut text = String::new();

        for item in items {
            match item {
                ShowItem::Text(bytes) => {
                    for glyph in font.decode(bytes) {
                        let mut spacing = tc;
                        if glyph.is_word_space {
                            spacing += tw;
                        }
                        let tx = (glyph.width / 1000.0 * size + spacing) * th;
                        self.tm = Matrix::translation(tx, 0.0).multiply(&self.tm);
                        text.push_str(&glyph.text);
                    }
                }
                ShowItem::Adjust(amount) => {
                    let tx = -amount / 1000.0 * size * th;
                    self.tm = Matrix::translation(tx, 0.0).multiply(&self.tm);
                    if *amount < TJ_SPACE_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
            }
        }

        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let end = rise.multiply(&self.tm).multiply(&self.state.ctm);
        let width = (end.e - start.e).hypot(end.f - start.f);
        let effective_size = size * self.tm.multiply(&self.state.ctm).scale_y();

        self.runs.push(PositionedRun {
            text: text.to_string(),
            page: self.page,
            x: start.e,
            y: start.f,
            width,
            height: effective_size,
            font_size: (effective_size > 0.0).then_some(effective_size),
            font_family: font.family.clone(),
        });
    }
}
