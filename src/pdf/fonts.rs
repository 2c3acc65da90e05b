/*!
 * Fonts used to measure and draw translated text.
 *
 * Two kinds of font are supported:
 * - `StandardFont`: a standard-14 font (Helvetica), never embedded, WinAnsi encoded
 * - `TrueTypeFont`: a TrueType/OpenType asset embedded as a Type0 font with
 *   Identity-H encoding, glyph ids written as two-byte codes
 *
 * `FontProvider` decides which font a given piece of text is drawn with.
 */

use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use ttf_parser::Face;

use crate::errors::RenderError;
use crate::language_utils::{Script, dominant_script};
use crate::pdf::encoding::winansi_encode;

/// Helvetica advance widths for codes 32..=126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32..47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48..63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64..79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80..95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96..111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112..126
];

/// Width used for characters outside the table
const HELVETICA_DEFAULT_WIDTH: u16 = 556;

/// Helvetica width of a character in 1/1000 em
pub fn helvetica_width(ch: char) -> u16 {
    match ch as u32 {
        code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        _ => HELVETICA_DEFAULT_WIDTH,
    }
}

/// Standard-14 fonts available without embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StandardFont {
    #[default]
    Helvetica,
}

impl StandardFont {
    pub fn base_font(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
        }
    }

    /// Advance width of a character in 1/1000 em
    pub fn glyph_width(&self, ch: char) -> u16 {
        match self {
            Self::Helvetica => helvetica_width(ch),
        }
    }
}

/// A glyph resolved in a TrueType font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub id: u16,
    /// Horizontal advance in font units
    pub advance: u16,
}

/// A parsed TrueType/OpenType font asset
pub struct TrueTypeFont {
    name: String,
    data: Vec<u8>,
    pub units_per_em: u16,
    pub ascent: i16,
    pub descent: i16,
    pub cap_height: i16,
    pub bbox: [i16; 4],
    glyphs: RwLock<HashMap<char, Option<Glyph>>>,
}

impl fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl TrueTypeFont {
    /// Parse font bytes, failing with `RenderError::Font` when they are not a usable font
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, RenderError> {
        let face = Face::parse(&data, 0).map_err(|e| RenderError::Font(format!("Invalid font data: {}", e)))?;

        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err(RenderError::Font("Font declares zero units per em".to_string()));
        }

        let mut name = None;
        for entry in face.names() {
            if entry.is_unicode() && entry.name_id == ttf_parser::name_id::POST_SCRIPT_NAME {
                name = entry.to_string();
                break;
            }
        }
        let name: String = name
            .unwrap_or_else(|| "EmbeddedFont".to_string())
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();

        let rect = face.global_bounding_box();
        let ascent = face.ascender();
        let descent = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascent);
        let bbox = [rect.x_min, rect.y_min, rect.x_max, rect.y_max];

        debug!("Loaded TrueType font '{}' ({} bytes, {} units/em)", name, data.len(), units_per_em);

        Ok(Self {
            name,
            data,
            units_per_em,
            ascent,
            descent,
            cap_height,
            bbox,
            glyphs: RwLock::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw font program for embedding
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Resolve a character, caching the lookup
    pub fn glyph(&self, ch: char) -> Option<Glyph> {
        if let Some(cached) = self.glyphs.read().get(&ch) {
            return *cached;
        }

        let resolved = Face::parse(&self.data, 0).ok().and_then(|face| {
            let id = face.glyph_index(ch)?;
            let advance = face.glyph_hor_advance(id).unwrap_or(0);
            Some(Glyph { id: id.0, advance })
        });

        self.glyphs.write().insert(ch, resolved);
        resolved
    }

    /// Scale factor from font units to 1/1000 em
    pub fn to_thousandths(&self, units: i32) -> i32 {
        units * 1000 / i32::from(self.units_per_em)
    }
}

/// A font the renderer can draw with
#[derive(Debug, Clone)]
pub enum PdfFont {
    Standard(StandardFont),
    TrueType(Arc<TrueTypeFont>),
}

impl PdfFont {
    /// Unembedded standard Helvetica
    pub fn helvetica() -> Self {
        Self::Standard(StandardFont::Helvetica)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Standard(font) => font.base_font(),
            Self::TrueType(font) => font.name(),
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::TrueType(_))
    }

    /// Whether the font can draw a character
    pub fn has_glyph(&self, ch: char) -> bool {
        match self {
            Self::Standard(_) => winansi_encode(ch).is_some(),
            Self::TrueType(font) => font.glyph(ch).is_some_and(|g| g.id != 0),
        }
    }

    /// Width of a text at a font size, in points
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match self {
            Self::Standard(font) => {
                let units: u32 = text.chars().map(|ch| u32::from(font.glyph_width(ch))).sum();
                units as f32 * font_size / 1000.0
            }
            Self::TrueType(font) => {
                let units: u32 = text
                    .chars()
                    .map(|ch| font.glyph(ch).map_or(0, |g| u32::from(g.advance)))
                    .sum();
                units as f32 * font_size / f32::from(font.units_per_em)
            }
        }
    }

    /// Encode text as the bytes of a PDF string operand for this font
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut missing = 0usize;
        let bytes = match self {
            Self::Standard(_) => text
                .chars()
                .map(|ch| {
                    winansi_encode(ch).unwrap_or_else(|| {
                        missing += 1;
                        b'?'
                    })
                })
                .collect(),
            Self::TrueType(font) => text
                .chars()
                .flat_map(|ch| {
                    let id = font.glyph(ch).map_or(0, |g| g.id);
                    if id == 0 {
                        missing += 1;
                    }
                    id.to_be_bytes()
                })
                .collect(),
        };

        if missing > 0 {
            warn!("Font '{}' has no glyph for {} character(s)", self.name(), missing);
        }
        bytes
    }
}

/// Handle of a font inside a `FontProvider`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontKey(pub usize);

impl FontKey {
    /// Resource name used in page `/Font` dictionaries
    pub fn resource_name(&self) -> String {
        format!("FTW{}", self.0)
    }
}

/// Font selection for translated text
#[derive(Debug, Clone)]
pub enum FontProvider {
    /// Every segment uses the same font
    Single(PdfFont),

    /// Font chosen by the dominant script of the text
    PerScript {
        table: Vec<(Script, PdfFont)>,
        fallback: PdfFont,
    },
}

impl FontProvider {
    /// Every segment drawn with unembedded Helvetica
    pub fn standard() -> Self {
        Self::Single(PdfFont::helvetica())
    }

    /// Pick the font for a text
    pub fn select(&self, text: &str) -> (FontKey, &PdfFont) {
        match self {
            Self::Single(font) => (FontKey(0), font),
            Self::PerScript { table, fallback } => {
                let script = dominant_script(text);
                table
                    .iter()
                    .enumerate()
                    .find(|(_, (s, _))| Some(*s) == script)
                    .map(|(i, (_, font))| (FontKey(i), font))
                    .unwrap_or((FontKey(table.len()), fallback))
            }
        }
    }

    pub fn font(&self, key: FontKey) -> Option<&PdfFont> {
        match self {
            Self::Single(font) => (key.0 == 0).then_some(font),
            Self::PerScript { table, fallback } => match key.0.cmp(&table.len()) {
                std::cmp::Ordering::Less => table.get(key.0).map(|(_, font)| font),
                std::cmp::Ordering::Equal => Some(fallback),
                std::cmp::Ordering::Greater => None,
            },
        }
    }

    /// All fonts with their keys
    pub fn fonts(&self) -> Vec<(FontKey, &PdfFont)> {
        match self {
            Self::Single(font) => vec![(FontKey(0), font)],
            Self::PerScript { table, fallback } => table
                .iter()
                .enumerate()
                .map(|(i, (_, font))| (FontKey(i), font))
                .chain(std::iter::once((FontKey(table.len()), fallback)))
                .collect(),
        }
    }
}

/// Mukta Mahee Regular, which covers both Latin and Gurmukhi
pub const DEFAULT_FONT_URL: &str = "https://raw.githubusercontent.com/google/fonts/main/ofl/muktamahee/MuktaMahee-Regular.ttf";

/// Where a font comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FontSource {
    /// Built-in Helvetica, Latin only
    Standard,

    /// TrueType file on disk
    File { path: PathBuf },

    /// TrueType file fetched over HTTP(S)
    Url { url: String },
}

impl FontSource {
    /// Load the font, reading or fetching the asset when needed
    pub async fn load(&self) -> Result<PdfFont, RenderError> {
        match self {
            Self::Standard => Ok(PdfFont::Standard(StandardFont::Helvetica)),
            Self::File { path } => {
                let data = tokio::fs::read(path)
                    .await
                    .map_err(|e| RenderError::Font(format!("Cannot read font file {}: {}", path.display(), e)))?;
                Ok(PdfFont::TrueType(Arc::new(TrueTypeFont::from_bytes(data)?)))
            }
            Self::Url { url } => {
                let parsed = url::Url::parse(url).map_err(|e| RenderError::FontFetch(format!("Invalid font URL {}: {}", url, e)))?;
                debug!("Fetching font asset from {}", parsed);

                let response = reqwest::get(parsed.clone())
                    .await
                    .map_err(|e| RenderError::FontFetch(format!("{}: {}", parsed, e)))?;
                if !response.status().is_success() {
                    return Err(RenderError::FontFetch(format!("{} returned {}", parsed, response.status())));
                }
                let data = response
                    .bytes()
                    .await
                    .map_err(|e| RenderError::FontFetch(format!("{}: {}", parsed, e)))?;

                Ok(PdfFont::TrueType(Arc::new(TrueTypeFont::from_bytes(data.to_vec())?)))
            }
        }
    }
}

impl Default for FontSource {
    fn default() -> Self {
        Self::Url {
            url: DEFAULT_FONT_URL.to_string(),
        }
    }
}

/// Font configuration of the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FontConfig {
    /// Font for text with no dedicated script font
    #[serde(default)]
    pub primary: FontSource,

    /// Dedicated font for Gurmukhi text
    #[serde(default)]
    pub gurmukhi: Option<FontSource>,
}

impl FontConfig {
    /// Helvetica only, nothing fetched or embedded
    pub fn standard() -> Self {
        Self {
            primary: FontSource::Standard,
            gurmukhi: None,
        }
    }

    /// Load every configured font and build the provider
    pub async fn build_provider(&self) -> Result<FontProvider, RenderError> {
        let primary = self.primary.load().await?;
        match &self.gurmukhi {
            Some(source) => Ok(FontProvider::PerScript {
                table: vec![(Script::Gurmukhi, source.load().await?)],
                fallback: primary,
            }),
            None => Ok(FontProvider::Single(primary)),
        }
    }
}
