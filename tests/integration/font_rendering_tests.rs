/*!
 * Rendering with embedded TrueType fonts, checked by extracting the output again
 */

use lopdf::{Document, Object};
use std::fs;
use std::sync::Arc;

use pdftwai::app_config::Config;
use pdftwai::language_utils::{Language, ScriptDetector};
use pdftwai::layout::{PlannedLine, RenderPlan};
use pdftwai::pdf::fonts::TrueTypeFont;
use pdftwai::pdf::{FontKey, FontProvider, FontSource, PdfFont, PdfRenderer, RenderStrategy, extract_document};
use pdftwai::providers::mock::MockProvider;
use pdftwai::session::TranslationSession;

use crate::common::{self, truetype};

const GURMUKHI_GREETING: &str = "ਸਤ ਸ੍ਰੀ ਅਕਾਲ";

fn dejavu_sans() -> PdfFont {
    let data = fs::read(common::test_resource_path("fonts/DejaVuSans.ttf")).unwrap();
    PdfFont::TrueType(Arc::new(TrueTypeFont::from_bytes(data).unwrap()))
}

/// Latin and Gurmukhi in one face, 500 units per glyph
fn two_script_font_bytes() -> Vec<u8> {
    truetype::build_truetype(&[(' ', '~'), ('\u{0A00}', '\u{0A7F}')], 500)
}

fn two_script_font() -> PdfFont {
    PdfFont::TrueType(Arc::new(TrueTypeFont::from_bytes(two_script_font_bytes()).unwrap()))
}

fn plan(lines: &[(&str, f32, f32)]) -> RenderPlan {
    RenderPlan {
        page: 1,
        font: FontKey(0),
        font_size: 12.0,
        lines: lines
            .iter()
            .map(|(text, x, y)| PlannedLine {
                text: text.to_string(),
                x: *x,
                y: *y,
                width: 0.0,
            })
            .collect(),
        available_width: 512.0,
        dropped_lines: 0,
        original_text: String::new(),
    }
}

fn has_identity_h_font(pdf: &[u8]) -> bool {
    let doc = Document::load_mem(pdf).unwrap();
    doc.objects.values().any(|object| match object {
        Object::Dictionary(dict) => {
            dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Type0".as_slice())
                && dict.get(b"Encoding").and_then(Object::as_name).ok() == Some(b"Identity-H".as_slice())
        }
        _ => false,
    })
}

#[test]
fn test_render_withDejaVuSans_shouldRoundTripTextAndOrigin() {
    common::init_logging();
    let font = dejavu_sans();
    assert!(font.is_embedded());
    assert!(font.has_glyph('H'));
    assert!(!font.has_glyph('ਸ'));

    let renderer = PdfRenderer::new(RenderStrategy::default(), FontProvider::Single(font.clone()));
    let pdf = renderer.render(&[plan(&[("Hello world", 50.0, 742.0)])]).unwrap();
    assert!(has_identity_h_font(&pdf));

    let rendered = extract_document(&pdf).unwrap();
    assert_eq!(rendered.runs.len(), 1);
    let run = &rendered.runs[0];
    assert_eq!(run.text, "Hello world");
    assert!((run.x - 50.0).abs() < 1e-3);
    assert!((run.y - 742.0).abs() < 1e-3);
    assert_eq!(run.font_size, Some(12.0));
    assert_eq!(run.font_family.as_deref(), Some(font.name()));
    assert!((run.width - font.text_width("Hello world", 12.0)).abs() < 0.2);
}

#[test]
fn test_render_withTwoScriptFont_shouldRoundTripLatinAndGurmukhi() {
    let font = two_script_font();
    assert!(font.has_glyph('H'));
    assert!(font.has_glyph('ਸ'));
    assert!(font.has_glyph('੍'));
    assert!(!font.has_glyph('é'));

    let renderer = PdfRenderer::new(RenderStrategy::default(), FontProvider::Single(font));
    let pdf = renderer
        .render(&[plan(&[("Hello world", 50.0, 742.0), (GURMUKHI_GREETING, 50.0, 727.6)])])
        .unwrap();

    let rendered = extract_document(&pdf).unwrap();
    let texts: Vec<&str> = rendered.runs.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["Hello world", GURMUKHI_GREETING]);

    let gurmukhi = &rendered.runs[1];
    assert!((gurmukhi.x - 50.0).abs() < 1e-3);
    assert!((gurmukhi.y - 727.6).abs() < 1e-3);
    // twelve code points at 500/1000 em and size 12
    assert!((gurmukhi.width - 72.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_session_withEmbeddedFontFile_shouldDrawGurmukhiWithoutMissingGlyphs() {
    let dir = common::create_temp_dir().unwrap();
    let font_path = common::create_test_file(dir.path(), "two-script.ttf", &two_script_font_bytes()).unwrap();

    let mut config = Config::default();
    config.pipeline.render.fonts.primary = FontSource::File { path: font_path };

    let session = TranslationSession::open(&config).await.unwrap();
    assert!(session.fonts().select(GURMUKHI_GREETING).1.is_embedded());

    let provider = MockProvider::working().with_custom_response(|_| GURMUKHI_GREETING.to_string());
    let outcome = session
        .run(
            common::hello_world_pdf(),
            Language::Punjabi,
            &provider,
            &ScriptDetector::default(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.missing_glyphs, 0);
    let rendered = extract_document(&outcome.pdf).unwrap();
    assert_eq!(rendered.runs.len(), 1);
    assert_eq!(rendered.runs[0].text, GURMUKHI_GREETING);
    assert!((rendered.runs[0].x - 50.0).abs() < 1e-3);
    assert!((rendered.runs[0].y - 742.0).abs() < 1e-3);
}
