//! Decoration-range rendering adapter.

use tinct_highlight::{Position, TermBuckets, TextRange};

use crate::event::VisibleEditor;

/// Receives per-term ranges for one editor at a time.
///
/// Called once per refreshed editor with buckets already restricted to the
/// enabled terms. Every bucket replaces whatever the editor showed for that
/// term before, so an empty bucket clears it.
pub trait DecorationSink {
	fn apply(&mut self, editor: &VisibleEditor, buckets: &TermBuckets);
}

impl<F> DecorationSink for F
where
	F: FnMut(&VisibleEditor, &TermBuckets),
{
	fn apply(&mut self, editor: &VisibleEditor, buckets: &TermBuckets) {
		self(editor, buckets)
	}
}

/// Byte length of each line of `text`, without its terminator.
fn line_lengths(text: &str) -> Vec<usize> {
	text.split('\n')
		.map(|line| line.strip_suffix('\r').unwrap_or(line).len())
		.collect()
}

/// Splits a range into one non-empty range per line it touches.
///
/// The pieces cover exactly the original span minus line terminators.
/// Single-line ranges are returned unchanged (unless empty).
pub fn split_multiline(range: TextRange, text: &str) -> Vec<TextRange> {
	if !range.is_multiline() {
		return if range.is_empty() { Vec::new() } else { vec![range] };
	}

	let lines = line_lengths(text);
	let mut out = Vec::with_capacity(range.end.row - range.start.row + 1);
	for row in range.start.row..=range.end.row {
		let line_len = lines.get(row).copied().unwrap_or(0);
		let start = if row == range.start.row { range.start.column } else { 0 };
		let end = if row == range.end.row { range.end.column } else { line_len };
		if end > start {
			out.push(TextRange::new(Position::new(row, start), Position::new(row, end)));
		}
	}
	out
}

/// Splits every range in `buckets`, keeping empty buckets.
pub fn split_buckets(buckets: &TermBuckets, text: &str) -> TermBuckets {
	let mut out = TermBuckets::seeded(buckets.iter().map(|(term, _)| term));
	for (term, ranges) in buckets.iter() {
		for range in ranges {
			for piece in split_multiline(*range, text) {
				out.push(term.clone(), piece);
			}
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use tinct_language::Term;

	use super::*;

	fn r(sr: usize, sc: usize, er: usize, ec: usize) -> TextRange {
		TextRange::new(Position::new(sr, sc), Position::new(er, ec))
	}

	#[test]
	fn test_single_line_is_unchanged() {
		assert_eq!(split_multiline(r(1, 2, 1, 5), "a\nbcdefg"), [r(1, 2, 1, 5)]);
		assert!(split_multiline(r(0, 3, 0, 3), "abc").is_empty());
	}

	#[test]
	fn test_block_comment_splits_per_line() {
		let text = "x /* one\r\n\ntwo\nthree */ y";
		assert_eq!(
			split_multiline(r(0, 2, 3, 8), text),
			[r(0, 2, 0, 8), r(2, 0, 2, 3), r(3, 0, 3, 8)]
		);
	}

	#[test]
	fn test_range_ending_at_line_start() {
		assert_eq!(split_multiline(r(0, 1, 1, 0), "ab\ncd"), [r(0, 1, 0, 2)]);
	}

	#[test]
	fn test_split_buckets_keeps_empty_terms() {
		let seed = [Term::from("comment"), Term::from("string")];
		let mut buckets = TermBuckets::seeded(&seed);
		buckets.push(Term::from("string"), r(0, 0, 1, 2));
		let split = split_buckets(&buckets, "abc\ndef");
		assert_eq!(split.get("comment"), Some(&[][..]));
		assert_eq!(split.get("string"), Some(&[r(0, 0, 0, 3), r(1, 0, 1, 2)][..]));
	}

	#[test]
	fn test_closure_sink() {
		let mut seen = Vec::new();
		let mut sink = |editor: &VisibleEditor, buckets: &TermBuckets| seen.push((editor.id, buckets.len()));
		sink.apply(&VisibleEditor::new(3, "doc"), &TermBuckets::default());
		assert_eq!(seen, [(crate::event::EditorId(3), 0)]);
	}
}
