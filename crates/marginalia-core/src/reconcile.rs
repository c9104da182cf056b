//! Markdown-source to plain-text offset alignment.
//!
//! Rendering strips syntax (`**`, `[`, `](url)`) and injects separators, so
//! no arithmetic shift maps one coordinate space onto the other. The parser
//! already knows where most leaf text came from; those anchors are taken as
//! exact runs and only the gaps between them are diffed. Without anchors the
//! whole document is one gap. Source chars that were stripped have no entry.

use std::ops::Range;
use std::time::{Duration, Instant};

use similar::{Algorithm, DiffOp, capture_diff_slices_deadline};

/// One unchanged run: `len` chars starting at `source_start` in the markdown
/// appear unchanged starting at `plain_start` in the plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedRun {
    pub source_start: usize,
    pub plain_start: usize,
    pub len: usize,
}

impl AlignedRun {
    fn source_range(&self) -> Range<usize> {
        self.source_start..self.source_start + self.len
    }

    fn source_end(&self) -> usize {
        self.source_start + self.len
    }

    fn plain_end(&self) -> usize {
        self.plain_start + self.len
    }
}

/// Partial function from markdown char offset to plain-text char offset.
///
/// Runs are sorted by source offset and never cross, so lookups are a
/// binary search and the mapping is monotonic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetMap {
    runs: Vec<AlignedRun>,
}

impl OffsetMap {
    /// Diff `source` against `plain` and record every unchanged run.
    ///
    /// `timeout` bounds the diff; when it elapses the diff library returns a
    /// coarser (still monotonic) alignment.
    pub fn build(source: &str, plain: &str, timeout: Duration) -> Self {
        Self::build_anchored(source, plain, &[], timeout)
    }

    /// Align using known runs as fixed points and diff the stretches between
    /// them. Anchors that cross an earlier anchor, fall outside either text,
    /// or whose chars disagree are ignored.
    pub fn build_anchored(
        source: &str,
        plain: &str,
        anchors: &[AlignedRun],
        timeout: Duration,
    ) -> Self {
        let old: Vec<char> = source.chars().collect();
        let new: Vec<char> = plain.chars().collect();
        let started = Instant::now();
        let deadline = started.checked_add(timeout);

        let chain = anchor_chain(&old, &new, anchors);
        let tail = AlignedRun {
            source_start: old.len(),
            plain_start: new.len(),
            len: 0,
        };

        let mut runs = Vec::with_capacity(chain.len() * 2 + 1);
        let (mut source_at, mut plain_at) = (0, 0);
        for anchor in chain.iter().copied().chain(std::iter::once(tail)) {
            diff_gap(
                &old[source_at..anchor.source_start],
                &new[plain_at..anchor.plain_start],
                (source_at, plain_at),
                deadline,
                &mut runs,
            );
            push_run(&mut runs, anchor);
            source_at = anchor.source_end();
            plain_at = anchor.plain_end();
        }

        let map = Self { runs };
        tracing::debug!(
            target: "marginalia::reconcile",
            source_chars = old.len(),
            plain_chars = new.len(),
            anchors = chain.len(),
            ignored_anchors = anchors.len() - chain.len(),
            runs = map.runs.len(),
            mapped = map.mapped_len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "built offset map"
        );
        map
    }

    pub fn from_runs(mut runs: Vec<AlignedRun>) -> Self {
        runs.sort_by_key(|run| run.source_start);
        Self { runs }
    }

    pub fn runs(&self) -> &[AlignedRun] {
        &self.runs
    }

    /// Number of source chars that have a counterpart.
    pub fn mapped_len(&self) -> usize {
        self.runs.iter().map(|run| run.len).sum()
    }

    /// Exact lookup. None for stripped syntax and out-of-range offsets.
    pub fn get(&self, source_offset: usize) -> Option<usize> {
        let idx = self
            .runs
            .partition_point(|run| run.source_start <= source_offset);
        let run = self.runs.get(idx.checked_sub(1)?)?;
        run.source_range()
            .contains(&source_offset)
            .then(|| run.plain_start + (source_offset - run.source_start))
    }

    /// Lookup with nearby probing, preferring later offsets.
    ///
    /// Used for range starts: a start on opening syntax (`**`) should slide
    /// forward onto the first visible char.
    pub fn resolve_start(&self, source_offset: usize, window: usize) -> Option<usize> {
        self.probe(source_offset, window, true)
    }

    /// Resolve an exclusive range end, preferring earlier offsets.
    ///
    /// The last included char is `end - 1`; closing syntax slides backward
    /// onto the last visible char, and the result is one past it.
    pub fn resolve_end(&self, source_end: usize, window: usize) -> Option<usize> {
        let last = source_end.checked_sub(1)?;
        self.probe(last, window, false).map(|offset| offset + 1)
    }

    fn probe(&self, offset: usize, window: usize, forward_first: bool) -> Option<usize> {
        if let Some(found) = self.get(offset) {
            return Some(found);
        }
        for distance in 1..=window {
            let ahead = offset.checked_add(distance);
            let behind = offset.checked_sub(distance);
            let (first, second) = if forward_first {
                (ahead, behind)
            } else {
                (behind, ahead)
            };
            if let Some(found) = first.and_then(|o| self.get(o)) {
                return Some(found);
            }
            if let Some(found) = second.and_then(|o| self.get(o)) {
                return Some(found);
            }
        }
        None
    }

    /// Resolve a source range to a non-empty plain-text range.
    pub fn resolve_range(&self, source: Range<usize>, window: usize) -> Option<Range<usize>> {
        if source.start >= source.end {
            return None;
        }
        let start = self.resolve_start(source.start, window)?;
        let end = self.resolve_end(source.end, window)?;
        (start < end).then_some(start..end)
    }
}

/// Strictly increasing subsequence of usable anchors, greedy in plain order.
fn anchor_chain(old: &[char], new: &[char], anchors: &[AlignedRun]) -> Vec<AlignedRun> {
    let mut sorted: Vec<AlignedRun> = anchors.iter().copied().filter(|a| a.len > 0).collect();
    sorted.sort_by_key(|a| (a.plain_start, a.source_start));

    let mut chain: Vec<AlignedRun> = Vec::with_capacity(sorted.len());
    let (mut source_at, mut plain_at) = (0, 0);
    for anchor in sorted {
        if anchor.source_start < source_at
            || anchor.plain_start < plain_at
            || anchor.source_end() > old.len()
            || anchor.plain_end() > new.len()
        {
            continue;
        }
        if old[anchor.source_range()] != new[anchor.plain_start..anchor.plain_end()] {
            continue;
        }
        source_at = anchor.source_end();
        plain_at = anchor.plain_end();
        chain.push(anchor);
    }
    chain
}

fn diff_gap(
    old: &[char],
    new: &[char],
    (source_base, plain_base): (usize, usize),
    deadline: Option<Instant>,
    runs: &mut Vec<AlignedRun>,
) {
    if old.is_empty() || new.is_empty() {
        return;
    }
    for op in capture_diff_slices_deadline(Algorithm::Myers, old, new, deadline) {
        if let DiffOp::Equal {
            old_index,
            new_index,
            len,
        } = op
        {
            push_run(
                runs,
                AlignedRun {
                    source_start: source_base + old_index,
                    plain_start: plain_base + new_index,
                    len,
                },
            );
        }
    }
}

/// Append a run, merging it into the previous one when both continue each other.
fn push_run(runs: &mut Vec<AlignedRun>, run: AlignedRun) {
    if run.len == 0 {
        return;
    }
    match runs.last_mut() {
        Some(last)
            if last.source_end() == run.source_start && last.plain_end() == run.plain_start =>
        {
            last.len += run.len;
        }
        _ => runs.push(run),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use crate::projection::project;

    fn map_for(source: &str) -> (OffsetMap, String) {
        let projection = project(&parse(source));
        let plain = projection.plain_text().to_string();
        (
            OffsetMap::build_anchored(
                source,
                &plain,
                projection.anchors(),
                Duration::from_secs(5),
            ),
            plain,
        )
    }

    #[test]
    fn test_heading_marker_is_a_hole() {
        let (map, _) = map_for("# Title\n\nBody text here.");
        assert_eq!(map.get(0), None);
        assert_eq!(map.get(1), None);
        assert_eq!(map.get(2), Some(0));
        assert_eq!(map.resolve_range(2..7, 5), Some(0..5));
    }

    #[test]
    fn test_bold_markers_are_excluded() {
        let (map, plain) = map_for("**Bold text**");
        assert_eq!(plain, "Bold text");
        // Offsets covering the markers land inside the content, not shifted by two.
        assert_eq!(map.resolve_range(0..13, 5), Some(0..9));
        assert_eq!(map.resolve_range(2..11, 5), Some(0..9));
    }

    #[test]
    fn test_link_syntax_is_stripped() {
        let source = "See [the docs](https://example.com/docs) now.";
        let (map, plain) = map_for(source);
        assert_eq!(plain, "See the docs now.");
        let start = source.find("the docs").unwrap();
        let range = map.resolve_range(start..start + 8, 5).unwrap();
        assert_eq!(&plain[range], "the docs");
    }

    #[test]
    fn test_heading_anchors_merge_across_separator() {
        let (map, _) = map_for("# Title\n\nBody text here.");
        // "\n\n" matches in the gap, joining both leaf anchors into one run.
        assert_eq!(
            map.runs(),
            &[AlignedRun {
                source_start: 2,
                plain_start: 0,
                len: 22,
            }]
        );
    }

    #[test]
    fn test_unanchored_diff() {
        let map = OffsetMap::build("**Bold text**", "Bold text", Duration::from_secs(5));
        assert_eq!(map.get(0), None);
        assert_eq!(map.get(2), Some(0));
        assert_eq!(map.resolve_range(0..13, 5), Some(0..9));
    }

    #[test]
    fn test_bad_anchors_are_ignored() {
        let anchors = [
            // Disagrees with the text.
            AlignedRun {
                source_start: 0,
                plain_start: 0,
                len: 3,
            },
            // Out of bounds.
            AlignedRun {
                source_start: 40,
                plain_start: 0,
                len: 3,
            },
        ];
        let map = OffsetMap::build_anchored("**abc**", "abc", &anchors, Duration::from_secs(5));
        assert_eq!(map.get(2), Some(0));
        assert_eq!(map.get(4), Some(2));
        assert_eq!(map.get(0), None);
    }

    #[test]
    fn test_probe_window_limits() {
        let map = OffsetMap::from_runs(vec![AlignedRun {
            source_start: 10,
            plain_start: 0,
            len: 5,
        }]);
        assert_eq!(map.resolve_start(4, 5), None);
        assert_eq!(map.resolve_start(5, 5), Some(0));
        assert_eq!(map.resolve_start(5, 4), None);
        // Probing past the run end goes backward onto the last mapped char.
        assert_eq!(map.resolve_end(18, 5), Some(5));
        assert_eq!(map.resolve_end(0, 5), None);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let (map, _) = map_for("plain words");
        assert_eq!(map.resolve_range(10..5, 5), None);
        assert_eq!(map.resolve_range(3..3, 5), None);
    }

    #[test]
    fn test_mapping_is_monotonic() {
        let source = "# A\n\nSome *x* and **y** with [l](u) and `c`.\n\n- i\n- j";
        let (map, _) = map_for(source);
        let mapped: Vec<usize> = (0..source.chars().count())
            .filter_map(|offset| map.get(offset))
            .collect();
        assert!(mapped.windows(2).all(|w| w[0] < w[1]));
    }
}
