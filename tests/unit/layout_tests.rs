/*!
 * Tests for segment grouping and layout reconciliation
 */

use pdftwai::layout::{GroupingStrategy, LayoutConfig, Placement, Reconciler, wrap_text};
use pdftwai::pdf::{FontProvider, PageSize, PdfFont, PositionedRun};
use pdftwai::translation::TranslationResult;

fn run(text: &str, page: u32, x: f32, y: f32) -> PositionedRun {
    PositionedRun {
        text: text.to_string(),
        page,
        x,
        y,
        width: 40.0,
        height: 12.0,
        font_size: Some(12.0),
        font_family: Some("Helvetica".to_string()),
    }
}

fn result(text: &str, page: u32) -> TranslationResult {
    TranslationResult {
        original_text: "original".to_string(),
        translated_text: text.to_string(),
        page,
        x: 72.0,
        y: 700.0,
        width: 200.0,
        height: 12.0,
        font_size: Some(12.0),
        translated: true,
    }
}

#[test]
fn test_group_withInterleavedPages_shouldKeepPagesAscendingAndArrivalOrder() {
    let runs = vec![
        run("second page", 2, 50.0, 700.0),
        run("first", 1, 50.0, 700.0),
        run("page", 1, 100.0, 700.0),
        run("next line", 1, 50.0, 680.0),
    ];

    let pages = GroupingStrategy::Page.group(&runs);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].page, 1);
    assert_eq!(pages[0].text(), "first page next line");
    assert_eq!(pages[1].text(), "second page");

    let lines = GroupingStrategy::Line { tolerance: 2.0 }.group(&runs);
    let texts: Vec<String> = lines.iter().map(|s| s.text()).collect();
    assert_eq!(texts, vec!["first page", "next line", "second page"]);

    assert_eq!(GroupingStrategy::Run.group(&runs).len(), 4);
}

#[test]
fn test_group_flattenedPageSegments_shouldKeepPageBoundaries() {
    let runs = vec![run("a", 1, 50.0, 700.0), run("b", 2, 50.0, 700.0), run("c", 2, 60.0, 690.0)];

    let flattened: Vec<PositionedRun> = GroupingStrategy::Page
        .group(&runs)
        .into_iter()
        .flat_map(|segment| segment.runs)
        .collect();
    let regrouped = GroupingStrategy::Page.group(&flattened);

    assert_eq!(regrouped.len(), 2);
    assert!(regrouped.iter().all(|s| s.runs.iter().all(|r| r.page == s.page)));
}

#[test]
fn test_group_withNoRuns_shouldReturnNoSegments() {
    assert!(GroupingStrategy::Page.group(&[]).is_empty());
}

#[test]
fn test_wrapText_shouldStayWithinWidthExceptLoneLongWord() {
    let font = PdfFont::helvetica();
    let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
    let available = 80.0;

    let lines = wrap_text(text, &font, 12.0, available);
    assert!(lines.len() > 1);
    for (line, width) in &lines {
        assert!(*width <= available || !line.contains(' '), "line '{}' is {} wide", line, width);
    }

    let long = wrap_text("Pneumonoultramicroscopicsilicovolcanoconiosis", &font, 12.0, 40.0);
    assert_eq!(long.len(), 1);
    assert!(long[0].1 > 40.0);
}

#[test]
fn test_wrapText_withExplicitNewline_shouldBreak() {
    let lines = wrap_text("one\ntwo", &PdfFont::helvetica(), 12.0, 500.0);
    let texts: Vec<&str> = lines.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(texts, vec!["one", "two"]);
}

#[test]
fn test_reconcile_withFlowPlacement_shouldStartAtTopLeftMarginAndStack() {
    let mut reconciler = Reconciler::uniform(LayoutConfig::default(), PageSize::LETTER);
    let fonts = FontProvider::standard();

    let plans = reconciler.reconcile_all(&[result("first", 1), result("second", 1)], &fonts);

    assert_eq!(plans[0].lines[0].x, 50.0);
    assert_eq!(plans[0].lines[0].y, 742.0);
    assert!((plans[1].lines[0].y - (742.0 - 12.0 * 1.2)).abs() < 1e-3);
}

#[test]
fn test_reconcile_withAnchoredPlacement_shouldStartAtSegmentOrigin() {
    let config = LayoutConfig {
        placement: Placement::Anchored,
        ..LayoutConfig::default()
    };
    let mut reconciler = Reconciler::uniform(config, PageSize::LETTER);
    let fonts = FontProvider::standard();
    let (key, font) = fonts.select("text");

    let plan = reconciler.reconcile(&result("text", 1), key, font);
    assert_eq!(plan.lines[0].x, 72.0);
    assert_eq!(plan.lines[0].y, 700.0);
}

#[test]
fn test_reconcile_withNoVerticalRoom_shouldDropEveryLine() {
    let page = PageSize {
        width: 612.0,
        height: 110.0,
    };
    let mut reconciler = Reconciler::uniform(LayoutConfig::default(), page);
    let fonts = FontProvider::standard();

    let plans = reconciler.reconcile_all(&[result("fits", 1), result("no room left", 1)], &fonts);

    assert_eq!(plans[0].lines.len(), 1);
    assert_eq!(plans[1].lines.len(), 0);
    assert_eq!(plans[1].dropped_lines, 1);
    assert!(plans.iter().flat_map(|p| &p.lines).all(|l| l.y >= 50.0));
}
