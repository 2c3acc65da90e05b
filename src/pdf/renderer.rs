/*!
 * Output document generation.
 *
 * Two strategies are supported:
 * - `FreshDocument`: a new document with one page per source page, holding
 *   only the translated text
 * - `CopyAndOverlay`: the source document with its original content wrapped
 *   in `q ... Q` and the translated text drawn on top
 */

use log::{debug, info, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::RenderError;
use crate::layout::RenderPlan;
use crate::pdf::encoding::build_to_unicode;
use crate::pdf::extractor::{inherited, load_document, resolve, resolve_dict};
use crate::pdf::fonts::{FontKey, FontProvider, PdfFont, TrueTypeFont};
use crate::pdf::geometry::PageSize;

/// How the output document is produced
#[derive(Debug, Clone)]
pub enum RenderStrategy {
    /// New document at a fixed page size
    FreshDocument { page_size: PageSize },

    /// Copy of the source document with text drawn over each page
    CopyAndOverlay { source: Vec<u8> },
}

impl Default for RenderStrategy {
    fn default() -> Self {
        Self::FreshDocument {
            page_size: PageSize::default(),
        }
    }
}

/// Renders reconciled plans into PDF bytes
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    strategy: RenderStrategy,
    fonts: FontProvider,
}

impl PdfRenderer {
    pub fn new(strategy: RenderStrategy, fonts: FontProvider) -> Self {
        Self { strategy, fonts }
    }

    pub fn strategy(&self) -> &RenderStrategy {
        &self.strategy
    }

    /// Produce the output document
    pub fn render(&self, plans: &[RenderPlan]) -> Result<Vec<u8>, RenderError> {
        let mut doc = match &self.strategy {
            RenderStrategy::FreshDocument { page_size } => self.render_fresh(plans, *page_size)?,
            RenderStrategy::CopyAndOverlay { source } => self.render_overlay(plans, source)?,
        };

        doc.compress();
        let mut output = Vec::new();
        doc.save_to(&mut output).map_err(|e| RenderError::Save(e.to_string()))?;
        info!("Rendered {} plan(s) into {} bytes", plans.len(), output.len());
        Ok(output)
    }

    fn render_fresh(&self, plans: &[RenderPlan], page_size: PageSize) -> Result<Document, RenderError> {
        let Some(last_page) = plans.iter().map(|p| p.page).max() else {
            return Err(RenderError::NoDocument("no pages to render".to_string()));
        };

        let mut doc = Document::with_version("1.5");
        let page_tree_id = doc.new_object_id();

        let fonts = self.add_fonts(&mut doc, plans)?;
        let font_resources: Dictionary = fonts
            .iter()
            .map(|(key, id)| (key.resource_name().into_bytes(), Object::Reference(*id)))
            .collect();
        let resources_id = doc.add_object(Dictionary::from_iter([("Font", Object::Dictionary(font_resources))]));

        let by_page = plans_by_page(plans);
        let mut kids = Vec::with_capacity(last_page as usize);
        for number in 1..=last_page {
            let page_plans = by_page.get(&number).map(Vec::as_slice).unwrap_or_default();
            let content = self.page_content(page_plans)?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(page_tree_id)),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Reference(resources_id)),
                (
                    "MediaBox",
                    Object::Array(vec![0.into(), 0.into(), page_size.width.into(), page_size.height.into()]),
                ),
            ]));
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            page_tree_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Count", Object::Integer(kids.len() as i64)),
                ("Kids", Object::Array(kids)),
            ])),
        );

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(page_tree_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        debug!("Built fresh document with {} page(s)", last_page);
        Ok(doc)
    }

    fn render_overlay(&self, plans: &[RenderPlan], source: &[u8]) -> Result<Document, RenderError> {
        let mut doc = load_document(source).map_err(|e| RenderError::NoDocument(format!("cannot load source document: {}", e)))?;
        let pages = doc.get_pages();

        let fonts = self.add_fonts(&mut doc, plans)?;
        for (number, page_plans) in plans_by_page(plans) {
            let Some(page_id) = pages.get(&number).copied() else {
                warn!("Skipping {} plan(s) for page {}: the source has {} page(s)", page_plans.len(), number, pages.len());
                continue;
            };

            install_fonts(&mut doc, page_id, &fonts)?;
            let content = self.page_content(&page_plans)?;
            wrap_contents(&mut doc, page_id, content)?;
        }

        debug!("Overlaid text on a {}-page source document", pages.len());
        Ok(doc)
    }

    /// Add the fonts referenced by the plans, keyed by provider key
    fn add_fonts(&self, doc: &mut Document, plans: &[RenderPlan]) -> Result<BTreeMap<FontKey, ObjectId>, RenderError> {
        let mut used: BTreeMap<FontKey, BTreeSet<char>> = BTreeMap::new();
        for plan in plans {
            let chars = used.entry(plan.font).or_default();
            for line in &plan.lines {
                chars.extend(line.text.chars());
            }
        }

        let mut fonts = BTreeMap::new();
        for (key, chars) in used {
            let font = self
                .fonts
                .font(key)
                .ok_or_else(|| RenderError::Font(format!("no font registered for key {}", key.0)))?;
            let id = match font {
                PdfFont::Standard(standard) => doc.add_object(Dictionary::from_iter([
                    ("Type", Object::Name(b"Font".to_vec())),
                    ("Subtype", Object::Name(b"Type1".to_vec())),
                    ("BaseFont", Object::Name(standard.base_font().as_bytes().to_vec())),
                    ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
                ])),
                PdfFont::TrueType(truetype) => add_truetype_font(doc, truetype, &chars),
            };
            fonts.insert(key, id);
        }
        Ok(fonts)
    }

    fn page_content(&self, plans: &[&RenderPlan]) -> Result<Vec<u8>, RenderError> {
        let mut operations = vec![Operation::new("g", vec![0.into()])];

        for plan in plans {
            let font = self
                .fonts
                .font(plan.font)
                .ok_or_else(|| RenderError::Font(format!("no font registered for key {}", plan.font.0)))?;
            let resource = plan.font.resource_name();

            for line in plan.lines.iter().filter(|l| !l.text.is_empty()) {
                operations.extend([
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![resource.as_str().into(), plan.font_size.into()]),
                    Operation::new("Td", vec![line.x.into(), line.y.into()]),
                    Operation::new("Tj", vec![Object::String(font.encode(&line.text), StringFormat::Hexadecimal)]),
                    Operation::new("ET", vec![]),
                ]);
            }
        }

        Content { operations }
            .encode()
            .map_err(|e| RenderError::Document(format!("cannot encode content stream: {}", e)))
    }
}

fn plans_by_page(plans: &[RenderPlan]) -> BTreeMap<u32, Vec<&RenderPlan>> {
    let mut by_page: BTreeMap<u32, Vec<&RenderPlan>> = BTreeMap::new();
    for plan in plans {
        by_page.entry(plan.page).or_default().push(plan);
    }
    by_page
}

/// Embed a TrueType font as a Type0 font with Identity-H encoding
fn add_truetype_font(doc: &mut Document, font: &TrueTypeFont, chars: &BTreeSet<char>) -> ObjectId {
    let mut glyphs: BTreeMap<u16, (char, u16)> = BTreeMap::new();
    for ch in chars {
        match font.glyph(*ch) {
            Some(glyph) if glyph.id != 0 => {
                glyphs.entry(glyph.id).or_insert((*ch, glyph.advance));
            }
            _ => debug!("Font '{}' has no glyph for {:?}", font.name(), ch),
        }
    }

    let scale = |units: i16| Object::Integer(i64::from(font.to_thousandths(i32::from(units))));
    let base_font = Object::Name(font.name().as_bytes().to_vec());

    let font_file_id = doc.add_object(Stream::new(
        Dictionary::from_iter([("Length1", Object::Integer(font.data().len() as i64))]),
        font.data().to_vec(),
    ));

    let descriptor_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"FontDescriptor".to_vec())),
        ("FontName", base_font.clone()),
        ("Flags", Object::Integer(32)),
        (
            "FontBBox",
            Object::Array(font.bbox.iter().map(|v| scale(*v)).collect()),
        ),
        ("ItalicAngle", Object::Integer(0)),
        ("Ascent", scale(font.ascent)),
        ("Descent", scale(font.descent)),
        ("CapHeight", scale(font.cap_height)),
        ("StemV", Object::Integer(80)),
        ("FontFile2", Object::Reference(font_file_id)),
    ]));

    let widths: Vec<Object> = glyphs
        .iter()
        .flat_map(|(gid, (_, advance))| {
            let width = font.to_thousandths(i32::from(*advance));
            [
                Object::Integer(i64::from(*gid)),
                Object::Array(vec![Object::Integer(i64::from(width))]),
            ]
        })
        .collect();

    let cid_font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
        ("BaseFont", base_font.clone()),
        (
            "CIDSystemInfo",
            Object::Dictionary(Dictionary::from_iter([
                ("Registry", Object::string_literal("Adobe")),
                ("Ordering", Object::string_literal("Identity")),
                ("Supplement", Object::Integer(0)),
            ])),
        ),
        ("FontDescriptor", Object::Reference(descriptor_id)),
        ("DW", Object::Integer(1000)),
        ("W", Object::Array(widths)),
        ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
    ]));

    let entries: Vec<(u16, char)> = glyphs.iter().map(|(gid, (ch, _))| (*gid, *ch)).collect();
    let to_unicode_id = doc.add_object(Stream::new(Dictionary::new(), build_to_unicode(&entries)));

    doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type0".to_vec())),
        ("BaseFont", base_font),
        ("Encoding", Object::Name(b"Identity-H".to_vec())),
        ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)])),
        ("ToUnicode", Object::Reference(to_unicode_id)),
    ]))
}

/// Give a page its own resource dictionary containing the translation fonts
fn install_fonts(doc: &mut Document, page_id: ObjectId, fonts: &BTreeMap<FontKey, ObjectId>) -> Result<(), RenderError> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|r| resolve_dict(doc, r))
        .cloned()
        .unwrap_or_default();
    let mut font_dict = resources
        .get(b"Font")
        .ok()
        .and_then(|f| resolve_dict(doc, f))
        .cloned()
        .unwrap_or_default();

    for (key, id) in fonts {
        font_dict.set(key.resource_name().into_bytes(), Object::Reference(*id));
    }
    resources.set("Font", Object::Dictionary(font_dict));

    match doc.get_object_mut(page_id) {
        Ok(Object::Dictionary(page)) => {
            page.set("Resources", Object::Dictionary(resources));
            Ok(())
        }
        _ => Err(RenderError::Document(format!("page object {:?} is not a dictionary", page_id))),
    }
}

/// Wrap the existing page content in `q ... Q` and append the overlay
fn wrap_contents(doc: &mut Document, page_id: ObjectId, overlay: Vec<u8>) -> Result<(), RenderError> {
    let existing: Vec<Object> = match doc.get_dictionary(page_id).ok().and_then(|page| page.get(b"Contents").ok()) {
        Some(Object::Array(items)) => items.clone(),
        Some(reference @ Object::Reference(_)) => match resolve(doc, reference) {
            Some(Object::Array(items)) => items.clone(),
            _ => vec![reference.clone()],
        },
        _ => Vec::new(),
    };

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut restored = b"\nQ\n".to_vec();
    restored.extend(overlay);
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), restored));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    match doc.get_object_mut(page_id) {
        Ok(Object::Dictionary(page)) => {
            page.set("Contents", Object::Array(contents));
            Ok(())
        }
        _ => Err(RenderError::Document(format!("page object {:?} is not a dictionary", page_id))),
    }
}
