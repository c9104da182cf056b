use marginalia_core::{
    DocumentCache, EngineConfig, Highlight, HighlightEvents, MatchKind, PointerEvent,
    RenderSurface, decorate_document,
};

fn surface_for(content: &str, highlights: Vec<Highlight>) -> RenderSurface {
    let cache = DocumentCache::new(EngineConfig::default());
    let mut surface = RenderSurface::new(EngineConfig::default());
    surface.set_content(content, &cache);
    surface.set_highlights(highlights);
    surface
}

#[test]
fn heading_title_highlight() {
    let surface = surface_for("# Title\n\nBody text here.", vec![Highlight::new(2..7, "t", "#ff0")]);
    let ranges = surface.decorations();
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].node_path, vec![0, 0]);
    assert_eq!((ranges[0].local_start, ranges[0].local_end), (0, 5));
}

#[test]
fn bold_markers_map_to_content() {
    let cache = DocumentCache::new(EngineConfig::default());
    let doc = cache.get_or_prepare("**Bold text**");
    assert_eq!(doc.projection().plain_text(), "Bold text");
    // Offsets on the markers themselves still land on the content.
    for (start, end) in [(0, 13), (1, 12), (0, 11), (2, 13)] {
        let ranges = decorate_document(
            &doc,
            &[Highlight::new(start..end, "b", "red").with_quote("Bold text")],
            None,
            cache.config(),
        );
        assert_eq!(ranges.len(), 1, "{start}..{end}");
        assert_eq!((ranges[0].local_start, ranges[0].local_end), (0, 9), "{start}..{end}");
        assert_eq!(ranges[0].matched_by, MatchKind::Reconciled);
    }
}

#[test]
fn inverted_highlight_is_skipped() {
    let surface = surface_for(
        "Some document body text.",
        vec![Highlight::new(10..5, "bad", "red"), Highlight::new(0..4, "good", "red")],
    );
    let tags: Vec<_> = surface.decorations().iter().map(|d| d.tag.as_str()).collect();
    assert_eq!(tags, vec!["good"]);
}

#[derive(Default)]
struct Log(Vec<String>);

impl HighlightEvents for Log {
    fn on_highlight_hover(&mut self, tag: Option<&str>) {
        self.0.push(format!("hover:{}", tag.unwrap_or("-")));
    }

    fn on_highlight_click(&mut self, tag: &str) {
        self.0.push(format!("click:{tag}"));
    }
}

#[test]
fn overlapping_highlights_are_independent() {
    let surface = surface_for(
        "Overlapping highlights on one leaf",
        vec![Highlight::new(0..10, "one", "red"), Highlight::new(0..10, "two", "blue")],
    );
    let ranges = surface.decorations();
    assert_eq!(ranges.len(), 2);
    assert_eq!(ranges[0].node_path, ranges[1].node_path);

    let mut log = Log::default();
    for region in surface.regions() {
        surface.dispatch(PointerEvent::Enter(region.id), &mut log);
        surface.dispatch(PointerEvent::Click(region.id), &mut log);
        surface.dispatch(PointerEvent::Leave(region.id), &mut log);
    }
    assert_eq!(
        log.0,
        vec![
            "hover:one", "click:one", "hover:-", "hover:two", "click:two", "hover:-"
        ]
    );
}

#[test]
fn multi_line_quote_falls_back_to_first_line() {
    let source = "First paragraph with words.\n\nSecond paragraph here.";
    let cache = DocumentCache::new(EngineConfig::default());
    let doc = cache.get_or_prepare(source);
    let highlight = Highlight::new(900..950, "q", "c")
        .with_quote("First paragraph with words.\n\nSecond paragraph here.");
    let ranges = decorate_document(&doc, &[highlight], None, cache.config());
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].matched_by, MatchKind::PrefixQuote);
    assert_eq!((ranges[0].local_start, ranges[0].local_end), (0, 27));
}

#[test]
fn link_text_highlight() {
    let source = "Read [the docs](https://example.com/docs) first.";
    let start = source.find("the docs").unwrap();
    let surface = surface_for(source, vec![Highlight::new(start..start + 8, "l", "c")]);
    let ranges = surface.decorations();
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].node_path, vec![0, 1, 0]);
    assert_eq!((ranges[0].local_start, ranges[0].local_end), (0, 8));
}
