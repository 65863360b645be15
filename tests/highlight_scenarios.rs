//! End-to-end highlighting scenarios
//!
//! Each case builds a small definition, highlights a snippet and checks the runs the
//! formatter received.

use rstest::rstest;
use std::io::Cursor;
use std::sync::Arc;
use vimscan::highlighting::{
    HighlightMode, ItemOptions, Pattern, ReaderOptions, RecordingFormatter, Region, ScanOptions,
    Scanner, Span, SyntaxDefinition, SyntaxDefinitionBuilder, WriterOptions,
};

fn pattern(src: &str) -> Pattern {
    Pattern::new(src).unwrap()
}

fn highlight(definition: SyntaxDefinition, input: &str) -> RecordingFormatter {
    let mut formatter = RecordingFormatter::new();
    Scanner::new(Arc::new(definition))
        .scan_str(input, &mut formatter)
        .unwrap();
    formatter
}

fn span(start: usize, end: usize, mode: HighlightMode) -> Span {
    Span { start, end, mode }
}

fn if_else_keywords() -> SyntaxDefinition {
    let mut b = SyntaxDefinitionBuilder::new("kw");
    b.set_ignore_case(true);
    b.add_keywords("Keyword", ["if", "else"], ItemOptions::default());
    b.finish().unwrap()
}

#[rstest]
#[case("if x else y\n")]
#[case("IF x Else y\n")]
fn case_insensitive_keywords(#[case] input: &str) {
    let out = highlight(if_else_keywords(), input);
    assert_eq!(out.text(), input);
    assert_eq!(
        out.spans(),
        vec![
            span(0, 2, HighlightMode::Keyword),
            span(2, 5, HighlightMode::Normal),
            span(5, 9, HighlightMode::Keyword),
            span(9, 12, HighlightMode::Normal),
        ]
    );
}

#[rstest]
#[case("ifelse if\n", &["if"])]
#[case("_if if_ if\n", &["if"])]
#[case("if9 9if\n", &[])]
#[case("(if)[else]\n", &["if", "else"])]
fn keywords_stop_at_word_boundaries(#[case] input: &str, #[case] expected: &[&str]) {
    let out = highlight(if_else_keywords(), input);
    assert_eq!(out.texts_in(HighlightMode::Keyword), expected);
}

#[test]
fn quoted_region_opens_and_closes_on_quotes() {
    let mut b = SyntaxDefinitionBuilder::new("str");
    b.add_region(
        "String",
        Region::new().start(pattern("\"")).end(pattern("\"")),
        ItemOptions::default(),
    );
    let out = highlight(b.finish().unwrap(), "a \"bc\" d\n");

    assert_eq!(
        out.spans(),
        vec![
            span(0, 2, HighlightMode::Normal),
            span(2, 6, HighlightMode::String),
            span(6, 9, HighlightMode::Normal),
        ]
    );
}

#[rstest]
#[case::closed_on_the_line("a 'b' c\n", &["'b'"])]
#[case::closed_on_the_next_line("a 'b\nc' d\n", &[])]
#[case::second_quote_pairs_up("'x\n'y'\n", &["'y'"])]
fn oneline_regions_need_an_end_on_their_line(#[case] input: &str, #[case] expected: &[&str]) {
    let mut b = SyntaxDefinitionBuilder::new("ol");
    b.add_region(
        "String",
        Region::new().start(pattern("'")).end(pattern("'")),
        ItemOptions::default().one_line(),
    );
    let out = highlight(b.finish().unwrap(), input);
    assert_eq!(out.text(), input);
    assert_eq!(out.texts_in(HighlightMode::String), expected);
}

/// `(...)` regions holding a contained string region.
fn parens(outer: ItemOptions, inner: ItemOptions) -> SyntaxDefinition {
    let mut b = SyntaxDefinitionBuilder::new("paren");
    b.add_region(
        "PreProc",
        Region::new().start(pattern(r"\(")).end(pattern(r"\)")),
        outer.contains("String"),
    );
    b.add_region(
        "String",
        Region::new().start(pattern("\"")).end(pattern("\"")),
        inner.contained(),
    );
    b.finish().unwrap()
}

const PAREN_INPUT: &str = "(a \"b) c\"\n";

#[test]
fn keepend_closes_contained_regions() {
    let out = highlight(
        parens(ItemOptions::default().keep_end(), ItemOptions::default()),
        PAREN_INPUT,
    );
    assert_eq!(out.mode_at(0), HighlightMode::PreProc);
    assert_eq!(out.mode_at(3), HighlightMode::String);
    assert_eq!(out.mode_at(4), HighlightMode::String);
    assert_eq!(out.mode_at(7), HighlightMode::Normal);
    assert_eq!(out.mode_at(8), HighlightMode::Normal);
}

#[test]
fn without_keepend_the_inner_region_runs_on() {
    let out = highlight(
        parens(ItemOptions::default(), ItemOptions::default()),
        PAREN_INPUT,
    );
    assert_eq!(out.texts_in(HighlightMode::String), vec!["\"b) c\""]);
    assert_eq!(out.mode_at(9), HighlightMode::PreProc);
}

#[test]
fn extend_overrides_keepend() {
    let out = highlight(
        parens(ItemOptions::default().keep_end(), ItemOptions::default().extend()),
        PAREN_INPUT,
    );
    assert_eq!(out.mode_at(7), HighlightMode::String);
    assert_eq!(out.mode_at(9), HighlightMode::PreProc);
}

#[test]
fn extend_item_ending_inside_keepend_leaves_its_end_alone() {
    let out = highlight(
        parens(ItemOptions::default().keep_end(), ItemOptions::default().extend()),
        "(a \"b\" c) d\n",
    );
    assert_eq!(
        out.spans(),
        vec![
            span(0, 3, HighlightMode::PreProc),
            span(3, 6, HighlightMode::String),
            span(6, 9, HighlightMode::PreProc),
            span(9, 12, HighlightMode::Normal),
        ]
    );
}

#[rstest]
#[case::at_line_start("ab rest\n")]
#[case::mid_line("xxxxxxxx ab rest\n")]
fn overshooting_match_start_never_matches(#[case] input: &str) {
    let mut b = SyntaxDefinitionBuilder::new("ms");
    b.add_match(
        "Number",
        pattern("ab").with_offsets("ms=e-5").unwrap(),
        ItemOptions::default(),
    );
    let out = highlight(b.finish().unwrap(), input);
    assert_eq!(out.text(), input);
    assert!(out.texts_in(HighlightMode::Number).is_empty());
}

#[test]
fn trailing_carriage_return_survives() {
    let out = highlight(if_else_keywords(), "if\r");
    assert_eq!(out.text(), "if\n");
    assert_eq!(out.texts_in(HighlightMode::Keyword), vec!["if"]);
}

#[rstest]
#[case::inline(false)]
#[case::worker(true)]
fn streaming_keeps_regions_open_across_windows(#[case] asynchronous: bool) {
    let mut b = SyntaxDefinitionBuilder::new("block");
    b.add_region(
        "Comment",
        Region::new().start(pattern(r"/\*")).end(pattern(r"\*/")),
        ItemOptions::default(),
    );
    let definition = Arc::new(b.finish().unwrap());

    let body = "comment text\n".repeat(30);
    let input = format!("x /*{}*/ y\n", body);
    let options = ScanOptions {
        reader: ReaderOptions {
            window_size: 64,
            safety_margin: 16,
            ..ReaderOptions::default()
        },
        writer: WriterOptions {
            flush_threshold: 1,
            asynchronous,
            ..WriterOptions::default()
        },
    };

    let mut formatter = RecordingFormatter::new();
    Scanner::with_options(definition, options)
        .scan(Cursor::new(input.clone()), &mut formatter)
        .unwrap();

    assert_eq!(formatter.text(), input);
    assert_eq!(
        formatter.texts_in(HighlightMode::Comment),
        vec![format!("/*{}*/", body)]
    );
}
