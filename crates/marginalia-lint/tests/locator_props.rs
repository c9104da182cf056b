use marginalia_lint::{LineQuery, LintDocument, locate, validate_span};
use marginalia_core::text::{eq_ignore_case, slice_chars};
use proptest::prelude::*;

fn document() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Zéü ]{0,30}", 1..12)
}

proptest! {
    #[test]
    fn located_spans_read_back(
        lines in document(),
        pick in any::<prop::sample::Index>(),
        from in 0usize..30,
        len in 1usize..8,
        upper in any::<bool>(),
    ) {
        let content = lines.join("\n");
        let doc = LintDocument::new(content.as_str());
        let line_idx = pick.index(lines.len());
        let line: Vec<char> = lines[line_idx].chars().collect();
        prop_assume!(from + len <= line.len());
        let mut needle: String = line[from..from + len].iter().collect();
        prop_assume!(!needle.trim().is_empty());
        if upper {
            needle = needle.to_uppercase();
        }

        let query = LineQuery {
            line_start: line_idx + 1,
            line_end: line_idx + 1,
            text: &needle,
        };
        let span = locate(&query, &doc);
        prop_assert!(span.is_some());
        let span = span.unwrap();
        let found = slice_chars(&content, span.range());
        prop_assert!(found.is_some_and(|f| eq_ignore_case(f, &needle)));
        prop_assert!(validate_span(
            &content,
            span.start_offset as i64,
            span.end_offset as i64,
            &needle
        ));
    }

    #[test]
    fn missing_lines_never_locate(lines in document(), extra in 1usize..5) {
        let content = lines.join("\n");
        let doc = LintDocument::new(content.as_str());
        let past = lines.len() + extra;
        let query = LineQuery { line_start: past, line_end: past, text: "a" };
        prop_assert_eq!(locate(&query, &doc), None);
    }
}
