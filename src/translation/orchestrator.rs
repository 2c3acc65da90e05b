/*!
 * Segment-by-segment translation driver.
 *
 * Segments are sent to the translator one at a time, in order. A failed
 * segment keeps its original text and is recorded in the report; it never
 * stops the rest of the document.
 */

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::errors::{ProviderError, ValidationError};
use crate::language_utils::Language;
use crate::layout::TextSegment;
use crate::translation::cache::truncate_text;

/// Anything that turns text in one language into text in another
#[async_trait]
pub trait TextTranslator: Send + Sync {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String, ProviderError>;
}

/// Progress callback receiving (completed, total)
pub type ProgressCallback<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Translated text of one segment, with the segment's geometry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationResult {
    pub original_text: String,
    pub translated_text: String,
    pub page: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_size: Option<f32>,
    /// Whether `translated_text` came from the translator
    pub translated: bool,
}

impl TranslationResult {
    pub fn from_segment(segment: &TextSegment, translated_text: String, translated: bool) -> Self {
        let (x, y) = segment.origin();
        Self {
            original_text: segment.text(),
            translated_text,
            page: segment.page,
            x,
            y,
            width: segment.bbox.width(),
            height: segment.bbox.height(),
            font_size: Some(segment.font_size),
            translated,
        }
    }

    /// Result carrying the original text unchanged
    pub fn untranslated(segment: &TextSegment) -> Self {
        Self::from_segment(segment, segment.text(), false)
    }
}

/// A segment whose translation failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentFailure {
    /// Position of the segment in the input
    pub index: usize,
    pub page: u32,
    pub message: String,
}

/// Outcome of translating a list of segments
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestrationReport {
    /// One result per input segment, in input order
    pub results: Vec<TranslationResult>,
    pub failures: Vec<SegmentFailure>,
    /// Number of translator invocations
    pub provider_calls: usize,
}

impl OrchestrationReport {
    /// Segments that fell back to their original text
    pub fn skipped_count(&self) -> usize {
        self.failures.len()
    }

    pub fn translated_count(&self) -> usize {
        self.results.iter().filter(|r| r.translated).count()
    }
}

/// Drives a translator over segments strictly in sequence
pub struct TranslationOrchestrator<'a> {
    translator: &'a dyn TextTranslator,
}

impl<'a> TranslationOrchestrator<'a> {
    pub fn new(translator: &'a dyn TextTranslator) -> Self {
        Self { translator }
    }

    /// Translate every segment, tolerating per-segment failures
    pub async fn translate(
        &self,
        segments: &[TextSegment],
        source: Language,
        target: Language,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<OrchestrationReport, ValidationError> {
        if source == target {
            return Err(ValidationError::SameLanguage(target));
        }

        info!(
            "Translating {} segment(s) {}",
            segments.len(),
            Language::pair_label(source, target)
        );

        let total = segments.len();
        let mut report = OrchestrationReport {
            results: Vec::with_capacity(total),
            ..OrchestrationReport::default()
        };

        for (index, segment) in segments.iter().enumerate() {
            let result = if segment.is_blank() {
                debug!("Segment {} on page {} is blank, keeping it as is", index, segment.page);
                TranslationResult::untranslated(segment)
            } else {
                report.provider_calls += 1;
                let text = segment.text();
                match self.translator.translate(&text, source, target).await {
                    Ok(translated) if !translated.trim().is_empty() => {
                        debug!(
                            "Segment {} on page {}: '{}'",
                            index,
                            segment.page,
                            truncate_text(translated.trim(), 40)
                        );
                        TranslationResult::from_segment(segment, translated.trim().to_string(), true)
                    }
                    outcome => {
                        let message = match outcome {
                            Err(e) => e.to_string(),
                            Ok(_) => "Translator returned an empty response".to_string(),
                        };
                        error!("Segment {} on page {} failed: {}", index, segment.page, message);
                        report.failures.push(SegmentFailure {
                            index,
                            page: segment.page,
                            message,
                        });
                        TranslationResult::untranslated(segment)
                    }
                }
            };

            report.results.push(result);
            if let Some(callback) = progress {
                callback(index + 1, total);
            }
        }

        if report.skipped_count() > 0 {
            warn!(
                "{} of {} segment(s) kept their original text",
                report.skipped_count(),
                total
            );
        }

        Ok(report)
    }
}

/// Translate `segments` with `translator`, see [`TranslationOrchestrator::translate`]
pub async fn translate(
    segments: &[TextSegment],
    source: Language,
    target: Language,
    translator: &dyn TextTranslator,
    progress: Option<ProgressCallback<'_>>,
) -> Result<OrchestrationReport, ValidationError> {
    TranslationOrchestrator::new(translator)
        .translate(segments, source, target, progress)
        .await
}
