/*!
 * End-to-end tests of one document through extraction, translation, layout and rendering
 */

use pdftwai::app_config::{PipelineConfig, RenderMode};
use pdftwai::errors::{PipelineError, ValidationError};
use pdftwai::language_utils::{Language, ScriptDetector};
use pdftwai::layout::GroupingStrategy;
use pdftwai::pdf::{FontProvider, PageSize, extract_document};
use pdftwai::providers::mock::MockProvider;
use pdftwai::session::TranslationSession;
use pdftwai::translation::ProgressCallback;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::common::{self, TestPage};

fn session_with(pipeline: PipelineConfig) -> TranslationSession {
    TranslationSession::with_fonts(&pipeline, Language::English, FontProvider::standard())
}

fn session() -> TranslationSession {
    session_with(PipelineConfig::default())
}

#[tokio::test]
async fn test_pipeline_withEchoProvider_shouldRenderOneLineAtTopLeftMargin() {
    common::init_logging();

    let outcome = session()
        .run(
            common::hello_world_pdf(),
            Language::Punjabi,
            &MockProvider::echo(),
            &ScriptDetector::default(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.pages, 1);
    assert_eq!(outcome.total_segments, 1);
    assert_eq!(outcome.provider_calls, 1);
    assert_eq!(outcome.dropped_lines, 0);
    assert_eq!(outcome.missing_glyphs, 0);

    let rendered = extract_document(&outcome.pdf).unwrap();
    assert_eq!(rendered.page_count(), 1);
    assert_eq!(rendered.runs.len(), 1);
    let run = &rendered.runs[0];
    assert_eq!(run.text, "Hello world");
    assert!((run.x - 50.0).abs() < 1e-3);
    assert!((run.y - (792.0 - 50.0)).abs() < 1e-3);
}

#[tokio::test]
async fn test_pipeline_withAlwaysFailingProvider_shouldRenderOriginalTexts() {
    let pdf = common::build_pdf(&[
        TestPage::new(&[("First page", 72.0, 700.0, 12.0)]),
        TestPage::new(&[("Second page", 72.0, 700.0, 12.0)]),
    ]);

    let outcome = session()
        .run(
            pdf,
            Language::Punjabi,
            &MockProvider::failing(),
            &ScriptDetector::default(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.skipped_segments, outcome.total_segments);
    assert_eq!(outcome.failures.len(), 2);

    let rendered = extract_document(&outcome.pdf).unwrap();
    let texts: Vec<&str> = rendered.runs.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["First page", "Second page"]);
    assert_eq!(rendered.runs[1].page, 2);
}

#[tokio::test]
async fn test_pipeline_withTripledTextAndOneLineOfRoom_shouldRenderOneLineAndDropRest() {
    let mut pipeline = PipelineConfig::default();
    pipeline.render.page_size = PageSize {
        width: 160.0,
        height: 110.0,
    };

    let provider = MockProvider::expanding(3);
    let outcome = session_with(pipeline)
        .run(
            common::hello_world_pdf(),
            Language::Punjabi,
            &provider,
            &ScriptDetector::default(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.dropped_lines, 2);
    assert_eq!(outcome.skipped_segments, 0);

    let rendered = extract_document(&outcome.pdf).unwrap();
    assert_eq!(rendered.runs.len(), 1);
    assert_eq!(rendered.runs[0].text, "Hello world");
    assert!((rendered.runs[0].y - 60.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_pipeline_withSameLanguage_shouldRejectWithZeroProviderCalls() {
    let provider = MockProvider::working();
    let result = session()
        .run(
            common::hello_world_pdf(),
            Language::English,
            &provider,
            &ScriptDetector::default(),
            None,
        )
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::Validation(ValidationError::SameLanguage(Language::English)))
    ));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_pipeline_withOversizeInput_shouldRejectBeforeParsing() {
    let pipeline = PipelineConfig {
        max_input_bytes: 64,
        ..PipelineConfig::default()
    };
    let provider = MockProvider::echo();
    let result = session_with(pipeline)
        .run(
            common::hello_world_pdf(),
            Language::Punjabi,
            &provider,
            &ScriptDetector::default(),
            None,
        )
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::Validation(ValidationError::TooLarge { limit: 64, .. }))
    ));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_pipeline_withTruncatedPdf_shouldFailToParse() {
    let mut pdf = common::hello_world_pdf();
    pdf.truncate(40);

    let result = session()
        .run(
            pdf,
            Language::Punjabi,
            &MockProvider::echo(),
            &ScriptDetector::default(),
            None,
        )
        .await;
    assert!(matches!(result, Err(PipelineError::Parse(_))));
}

#[tokio::test]
async fn test_pipeline_withOverlayMode_shouldKeepSourcePagesAndDrawOnTop() {
    let pdf = common::build_pdf(&[TestPage::new(&[("Hello world", 100.0, 300.0, 12.0)]).with_size(400.0, 500.0)]);
    let mut pipeline = PipelineConfig::default();
    pipeline.render.mode = RenderMode::Overlay;

    let outcome = session_with(pipeline)
        .run(
            pdf,
            Language::Punjabi,
            &MockProvider::working(),
            &ScriptDetector::default(),
            None,
        )
        .await
        .unwrap();

    let rendered = extract_document(&outcome.pdf).unwrap();
    assert_eq!(rendered.page_size(1), Some(PageSize { width: 400.0, height: 500.0 }));

    let original = rendered.runs.iter().find(|r| r.text == "Hello world").unwrap();
    assert!((original.x - 100.0).abs() < 1e-3);
    let overlay = rendered.runs.iter().find(|r| r.text == "[pa] Hello world").unwrap();
    assert!((overlay.x - 50.0).abs() < 1e-3);
    assert!((overlay.y - 450.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_pipeline_withLineGrouping_shouldTranslateEachLineAndReportProgress() {
    let pdf = common::build_pdf(&[TestPage::new(&[
        ("Title", 50.0, 740.0, 18.0),
        ("Body text", 50.0, 700.0, 12.0),
        ("More body", 50.0, 680.0, 12.0),
    ])]);
    let pipeline = PipelineConfig {
        grouping: GroupingStrategy::Line { tolerance: 2.0 },
        ..PipelineConfig::default()
    };

    let updates = AtomicUsize::new(0);
    let last_total = AtomicUsize::new(0);
    let progress: ProgressCallback<'_> = &|done, total| {
        updates.fetch_add(1, Ordering::SeqCst);
        last_total.store(total, Ordering::SeqCst);
        assert!(done <= total);
    };

    let provider = MockProvider::working();
    let outcome = session_with(pipeline)
        .run(
            pdf,
            Language::Punjabi,
            &provider,
            &ScriptDetector::default(),
            Some(progress),
        )
        .await
        .unwrap();

    assert_eq!(outcome.total_segments, 3);
    assert_eq!(provider.request_count(), 3);
    assert_eq!(updates.load(Ordering::SeqCst), 3);
    assert_eq!(last_total.load(Ordering::SeqCst), 3);

    let rendered = extract_document(&outcome.pdf).unwrap();
    let texts: Vec<&str> = rendered.runs.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["[pa] Title", "[pa] Body text", "[pa] More body"]);
    assert_eq!(rendered.runs[0].font_size, Some(18.0));
}

#[tokio::test]
async fn test_pipeline_withHelveticaAndGurmukhiTranslation_shouldCountMissingGlyphs() {
    let provider = MockProvider::working().with_custom_response(|_| "ਸਤ ਸ੍ਰੀ".to_string());
    let outcome = session()
        .run(
            common::hello_world_pdf(),
            Language::Punjabi,
            &provider,
            &ScriptDetector::default(),
            None,
        )
        .await
        .unwrap();

    // "ਸਤ ਸ੍ਰੀ" has six code points besides the space, none in Helvetica
    assert_eq!(outcome.missing_glyphs, 6);
    assert_eq!(outcome.skipped_segments, 0);
}
