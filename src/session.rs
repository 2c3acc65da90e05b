/*!
 * Request-scoped pipeline.
 *
 * A `TranslationSession` is built for one document and consumed by `run`.
 * It owns the loaded fonts and, in overlay mode, the source bytes; nothing
 * outlives the request.
 */

use log::{debug, info, warn};

use crate::app_config::{Config, PipelineConfig, RenderMode};
use crate::errors::{PipelineError, ValidationError};
use crate::file_utils::validate_pdf_bytes;
use crate::language_utils::{Language, LanguageDetector, detect_source_language};
use crate::layout::{GroupingStrategy, LayoutConfig, Reconciler, RenderPlan};
use crate::pdf::{FontProvider, PageSize, PdfRenderer, RenderStrategy, extract_document};
use crate::translation::{OrchestrationReport, ProgressCallback, SegmentFailure, TextTranslator, TranslationOrchestrator};

/// Summary of one translated document
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Output PDF bytes
    pub pdf: Vec<u8>,
    pub source: Language,
    pub target: Language,
    pub pages: usize,
    pub total_segments: usize,
    pub skipped_segments: usize,
    pub failures: Vec<SegmentFailure>,
    pub provider_calls: usize,
    pub dropped_lines: usize,
    /// Characters the chosen fonts cannot draw
    pub missing_glyphs: usize,
}

/// Everything needed to translate one document
#[derive(Debug)]
pub struct TranslationSession {
    fonts: FontProvider,
    grouping: GroupingStrategy,
    layout: LayoutConfig,
    mode: RenderMode,
    page_size: PageSize,
    fallback_source: Language,
    max_input_bytes: u64,
}

impl TranslationSession {
    /// Build a session from configuration, loading the configured fonts
    pub async fn open(config: &Config) -> Result<Self, PipelineError> {
        let fallback_source = Language::from_code(&config.fallback_source_language)?;
        let fonts = config.pipeline.render.fonts.build_provider().await?;
        Ok(Self::with_fonts(&config.pipeline, fallback_source, fonts))
    }

    /// Build a session around an already loaded font provider
    pub fn with_fonts(pipeline: &PipelineConfig, fallback_source: Language, fonts: FontProvider) -> Self {
        Self {
            fonts,
            grouping: pipeline.grouping,
            layout: pipeline.layout.clone(),
            mode: pipeline.render.mode,
            page_size: pipeline.render.page_size,
            fallback_source,
            max_input_bytes: pipeline.max_input_bytes,
        }
    }

    pub fn fonts(&self) -> &FontProvider {
        &self.fonts
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Translate `pdf` into `target` and render the result
    pub async fn run(
        self,
        pdf: Vec<u8>,
        target: Language,
        translator: &dyn TextTranslator,
        detector: &dyn LanguageDetector,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<SessionOutcome, PipelineError> {
        validate_pdf_bytes(&pdf, self.max_input_bytes)?;

        let document = extract_document(&pdf)?;
        if document.runs.is_empty() {
            return Err(ValidationError::NoExtractableText.into());
        }
        info!(
            "Extracted {} run(s) from {} of {} page(s)",
            document.runs.len(),
            document.pages_with_text(),
            document.page_count()
        );

        let source = detect_source_language(detector, &document.full_text(), self.fallback_source);
        debug!("Source language: {}", source.name());
        if source == target {
            return Err(ValidationError::SameLanguage(target).into());
        }

        let segments = self.grouping.group(&document.runs);
        debug!("Grouped into {} segment(s) by {}", segments.len(), self.grouping);

        let report = TranslationOrchestrator::new(translator)
            .translate(&segments, source, target, progress)
            .await?;

        let mut reconciler = match self.mode {
            RenderMode::Fresh => Reconciler::uniform(self.layout.clone(), self.page_size),
            RenderMode::Overlay => Reconciler::for_pages(self.layout.clone(), &document.pages),
        };
        let plans = reconciler.reconcile_all(&report.results, &self.fonts);
        let missing_glyphs = self.count_missing_glyphs(&plans);

        let strategy = match self.mode {
            RenderMode::Fresh => RenderStrategy::FreshDocument {
                page_size: self.page_size,
            },
            RenderMode::Overlay => RenderStrategy::CopyAndOverlay { source: pdf },
        };
        let output = PdfRenderer::new(strategy, self.fonts).render(&plans)?;

        Ok(Self::outcome(output, source, target, document.page_count(), report, &plans, missing_glyphs))
    }

    fn count_missing_glyphs(&self, plans: &[RenderPlan]) -> usize {
        let mut missing = 0;
        for plan in plans {
            let Some(font) = self.fonts.font(plan.font) else {
                continue;
            };
            missing += plan
                .lines
                .iter()
                .flat_map(|line| line.text.chars())
                .filter(|ch| !ch.is_whitespace() && !font.has_glyph(*ch))
                .count();
        }
        if missing > 0 {
            warn!(
                "{} character(s) have no glyph in the selected font and were replaced",
                missing
            );
        }
        missing
    }

    fn outcome(
        pdf: Vec<u8>,
        source: Language,
        target: Language,
        pages: usize,
        report: OrchestrationReport,
        plans: &[RenderPlan],
        missing_glyphs: usize,
    ) -> SessionOutcome {
        let dropped_lines = plans.iter().map(|p| p.dropped_lines).sum();
        SessionOutcome {
            pdf,
            source,
            target,
            pages,
            total_segments: report.results.len(),
            skipped_segments: report.skipped_count(),
            provider_calls: report.provider_calls,
            failures: report.failures,
            dropped_lines,
            missing_glyphs,
        }
    }
}
