use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::layout::grouping::DEFAULT_FONT_SIZE;
use crate::pdf::extractor::PageInfo;
use crate::pdf::fonts::{FontKey, FontProvider, PdfFont};
use crate::pdf::geometry::PageSize;
use crate::translation::TranslationResult;

/// Where translated text is placed on its page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Text flows from the top-left margin down the page
    #[default]
    Flow,

    /// Text starts at the segment's own position
    Anchored,
}

/// Page margins and line metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_margin")]
    pub margin_left: f32,

    #[serde(default = "default_margin")]
    pub margin_right: f32,

    #[serde(default = "default_margin")]
    pub margin_top: f32,

    #[serde(default = "default_margin")]
    pub margin_bottom: f32,

    /// Baseline advance as a multiple of the font size
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,

    #[serde(default = "default_font_size")]
    pub default_font_size: f32,

    #[serde(default)]
    pub placement: Placement,
}

fn default_margin() -> f32 {
    50.0
}

fn default_line_spacing() -> f32 {
    1.2
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_left: default_margin(),
            margin_right: default_margin(),
            margin_top: default_margin(),
            margin_bottom: default_margin(),
            line_spacing: default_line_spacing(),
            default_font_size: default_font_size(),
            placement: Placement::default(),
        }
    }
}

impl LayoutConfig {
    /// Whether the margins leave a drawable area on a page
    pub fn fits(&self, page: PageSize) -> bool {
        self.margin_left + self.margin_right < page.width && self.margin_top + self.margin_bottom < page.height
    }
}

/// One wrapped line and its baseline origin
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

/// Drawing instructions for one translation result
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub page: u32,
    pub font: FontKey,
    pub font_size: f32,
    pub lines: Vec<PlannedLine>,
    pub available_width: f32,
    /// Lines that did not fit above the bottom margin
    pub dropped_lines: usize,
    pub original_text: String,
}

/// Fits translated text into page coordinates
///
/// A reconciler lives for one rendering pass and keeps a vertical cursor per
/// page so that successive results on a page never overlap.
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: LayoutConfig,
    pages: HashMap<u32, PageInfo>,
    fallback_size: PageSize,
    cursors: HashMap<u32, f32>,
}

impl Reconciler {
    /// Lay out on the pages of a source document
    pub fn for_pages(config: LayoutConfig, pages: &[PageInfo]) -> Self {
        Self {
            config,
            pages: pages.iter().map(|p| (p.number, *p)).collect(),
            fallback_size: PageSize::default(),
            cursors: HashMap::new(),
        }
    }

    /// Lay out on pages that all share one size
    pub fn uniform(config: LayoutConfig, size: PageSize) -> Self {
        Self {
            config,
            pages: HashMap::new(),
            fallback_size: size,
            cursors: HashMap::new(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn page_size(&self, page: u32) -> PageSize {
        self.pages.get(&page).map_or(self.fallback_size, |p| p.size)
    }

    /// Lower-left corner of a page
    pub fn page_origin(&self, page: u32) -> (f32, f32) {
        self.pages.get(&page).map_or((0.0, 0.0), |p| p.origin)
    }

    /// Wrap and position one result
    pub fn reconcile(&mut self, result: &TranslationResult, font_key: FontKey, font: &PdfFont) -> RenderPlan {
        let page = self.page_size(result.page);
        let (origin_x, origin_y) = self.page_origin(result.page);
        let config = &self.config;

        let font_size = result
            .font_size
            .filter(|size| size.is_finite() && *size > 0.0)
            .unwrap_or(config.default_font_size);
        let advance = font_size * config.line_spacing;

        let left_edge = origin_x + config.margin_left;
        let right_edge = origin_x + page.width - config.margin_right;
        let top = origin_y + page.height - config.margin_top;
        let bottom = origin_y + config.margin_bottom;
        let (x, first_baseline) = match config.placement {
            Placement::Flow => (left_edge, top),
            Placement::Anchored => (result.x.clamp(left_edge, right_edge.max(left_edge)), result.y.min(top)),
        };
        let available_width = (right_edge - x).max(0.0);

        let cursor = self.cursors.entry(result.page).or_insert(top);
        let mut y = first_baseline.min(*cursor);

        let mut lines = Vec::new();
        let mut dropped_lines = 0;
        for (text, width) in wrap_text(&result.translated_text, font, font_size, available_width) {
            if y < bottom {
                dropped_lines += 1;
            } else {
                lines.push(PlannedLine { text, x, y, width });
            }
            y -= advance;
        }
        *cursor = y;

        if dropped_lines > 0 {
            warn!(
                "Page {}: {} line(s) fell below the bottom margin and were dropped",
                result.page, dropped_lines
            );
        }
        debug!("Page {}: placed {} line(s) at size {}", result.page, lines.len(), font_size);

        RenderPlan {
            page: result.page,
            font: font_key,
            font_size,
            lines,
            available_width,
            dropped_lines,
            original_text: result.original_text.clone(),
        }
    }

    /// Reconcile every result in order, choosing fonts through the provider
    pub fn reconcile_all(&mut self, results: &[TranslationResult], fonts: &FontProvider) -> Vec<RenderPlan> {
        results
            .iter()
            .map(|result| {
                let (key, font) = fonts.select(&result.translated_text);
                self.reconcile(result, key, font)
            })
            .collect()
    }
}

/// Greedy word wrap, returning each line with its measured width
///
/// Explicit newlines force a break. A word wider than `available_width` is
/// placed alone on its line.
pub fn wrap_text(text: &str, font: &PdfFont, font_size: f32, available_width: f32) -> Vec<(String, f32)> {
    let space_width = font.text_width(" ", font_size);
    let mut lines = Vec::new();

    for paragraph in text.trim().lines() {
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in paragraph.split_whitespace() {
            let word_width = font.text_width(word, font_size);
            if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
            } else if current_width + space_width + word_width <= available_width {
                current.push(' ');
                current.push_str(word);
                current_width += space_width + word_width;
            } else {
                lines.push((std::mem::take(&mut current), current_width));
                current.push_str(word);
                current_width = word_width;
            }
        }

        if !current.is_empty() {
            lines.push((current, current_width));
        }
    }

    lines
}
