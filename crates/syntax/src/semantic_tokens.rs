//! Semantic-token rendering adapter.
//!
//! Encodes annotations into the LSP relative 5-tuple stream
//! `[deltaLine, deltaStart, length, tokenType, modifiers]`. Multi-line
//! annotations are split per line first since a token cannot span lines.
//! Nested annotations are flattened: an inner token cuts its outer token and
//! the innermost term wins, so the stream never overlaps. Columns stay in the
//! parser's units (bytes).

use lsp_types::SemanticToken;
use tinct_highlight::{Annotation, Legend, TextRange};

use crate::render::split_multiline;

/// A single-line piece of annotation `order`.
#[derive(Debug, Clone, Copy)]
struct Piece {
	range: TextRange,
	token_type: u32,
	/// Annotation index; post-order puts children before their parents.
	order: usize,
}

impl Piece {
	fn len(&self) -> usize {
		self.range.end.column - self.range.start.column
	}
}

/// Sorted, line-split, non-overlapping, delta-encoded tokens.
///
/// Terms outside `legend` are skipped.
pub fn encode_semantic_tokens(annotations: &[Annotation], legend: &Legend, text: &str) -> Vec<SemanticToken> {
	let mut pieces: Vec<Piece> = annotations
		.iter()
		.enumerate()
		.filter_map(|(order, a)| Some((order, a.range, legend.index_of(a.term.as_str())?)))
		.flat_map(|(order, range, token_type)| {
			split_multiline(range, text).into_iter().map(move |range| Piece {
				range,
				token_type,
				order,
			})
		})
		.collect();
	pieces.sort_by_key(|p| (p.range.start, p.range.end, p.order));

	let mut tokens = Vec::with_capacity(pieces.len());
	let mut prev_line = 0;
	let mut prev_start = 0;
	for row_pieces in pieces.chunk_by(|a, b| a.range.start.row == b.range.start.row) {
		for (range, token_type) in flatten_row(row_pieces) {
			let line = range.start.row as u32;
			let start = range.start.column as u32;
			let delta_line = line - prev_line;
			let delta_start = if delta_line == 0 { start - prev_start } else { start };
			tokens.push(SemanticToken {
				delta_line,
				delta_start,
				length: (range.end.column - range.start.column) as u32,
				token_type,
				token_modifiers_bitset: 0,
			});
			prev_line = line;
			prev_start = start;
		}
	}
	tokens
}

/// Cuts one row's pieces at every boundary and gives each span to the
/// shortest covering piece (earliest annotation on ties).
fn flatten_row(pieces: &[Piece]) -> Vec<(TextRange, u32)> {
	let mut bounds: Vec<usize> = pieces
		.iter()
		.flat_map(|p| [p.range.start.column, p.range.end.column])
		.collect();
	bounds.sort_unstable();
	bounds.dedup();

	// `pieces` is sorted by start column; `active` holds those covering `lo`.
	let mut next = 0;
	let mut active: Vec<&Piece> = Vec::new();
	let mut out: Vec<(TextRange, u32, usize)> = Vec::new();
	for span in bounds.windows(2) {
		let (lo, hi) = (span[0], span[1]);
		active.retain(|p| p.range.end.column >= hi);
		while let Some(p) = pieces.get(next)
			&& p.range.start.column <= lo
		{
			if p.range.end.column >= hi {
				active.push(p);
			}
			next += 1;
		}
		let Some(owner) = active.iter().min_by_key(|p| (p.len(), p.order)) else {
			continue;
		};
		match out.last_mut() {
			Some((range, _, order)) if *order == owner.order && range.end.column == lo => range.end.column = hi,
			_ => {
				let mut range = owner.range;
				range.start.column = lo;
				range.end.column = hi;
				out.push((range, owner.token_type, owner.order));
			}
		}
	}
	out.into_iter().map(|(range, ty, _)| (range, ty)).collect()
}

#[cfg(test)]
mod tests {
	use tinct_highlight::{Position, classify_tree};
	use tinct_language::{Grammar, Term};
	use tree_sitter::Parser;

	use super::*;

	fn ann(term: &str, sr: usize, sc: usize, er: usize, ec: usize) -> Annotation {
		Annotation {
			term: Term::from(term),
			range: TextRange::new(Position::new(sr, sc), Position::new(er, ec)),
		}
	}

	fn tuples(tokens: &[SemanticToken]) -> Vec<[u32; 4]> {
		tokens
			.iter()
			.map(|t| [t.delta_line, t.delta_start, t.length, t.token_type])
			.collect()
	}

	#[test]
	fn test_delta_encoding() {
		let legend = Legend::default();
		let text = "int foo;\nint bar;";
		// out of order on purpose
		let anns = [
			ann("variable", 1, 4, 1, 7),
			ann("type", 0, 0, 0, 3),
			ann("variable", 0, 4, 0, 7),
			ann("type", 1, 0, 1, 3),
		];
		let ty = legend.index_of("type").unwrap();
		let var = legend.index_of("variable").unwrap();
		assert_eq!(
			tuples(&encode_semantic_tokens(&anns, &legend, text)),
			[[0, 0, 3, ty], [0, 4, 3, var], [1, 0, 3, ty], [0, 4, 3, var]]
		);
	}

	#[test]
	fn test_nested_tokens_do_not_overlap() {
		let legend = Legend::default();
		let text = r#"["abc"]"#;
		// child before parent, as classification emits them
		let anns = [ann("variable", 0, 2, 0, 5), ann("string", 0, 1, 0, 6)];
		let string = legend.index_of("string").unwrap();
		let var = legend.index_of("variable").unwrap();
		assert_eq!(
			tuples(&encode_semantic_tokens(&anns, &legend, text)),
			[[0, 1, 1, string], [0, 1, 3, var], [0, 3, 1, string]]
		);
	}

	#[test]
	fn test_nested_json_string_from_parser() {
		let grammar = Grammar::parse(
			"json",
			r#"{ "simpleTerms": { "string": "string", "string_content": "variable" } }"#,
		)
		.unwrap();
		let mut parser = Parser::new();
		parser.set_language(&tree_sitter_json::LANGUAGE.into()).unwrap();
		let text = r#"["abc", "d"]"#;
		let tree = parser.parse(text, None).unwrap();
		let anns = classify_tree(&tree.root_node(), &grammar);

		let legend = Legend::default();
		let tokens = encode_semantic_tokens(&anns, &legend, text);
		let mut end = 0;
		let mut column = 0;
		for t in &tokens {
			column += t.delta_start;
			assert!(column >= end, "token at {column} starts before {end}");
			end = column + t.length;
		}
		let string = legend.index_of("string").unwrap();
		let var = legend.index_of("variable").unwrap();
		assert_eq!(
			tuples(&tokens),
			[
				[0, 1, 1, string],
				[0, 1, 3, var],
				[0, 3, 1, string],
				[0, 3, 1, string],
				[0, 1, 1, var],
				[0, 1, 1, string],
			]
		);
	}

	#[test]
	fn test_adjacent_tokens_stay_separate() {
		let legend = Legend::default();
		let anns = [ann("number", 0, 0, 0, 1), ann("number", 0, 1, 0, 2)];
		let number = legend.index_of("number").unwrap();
		assert_eq!(
			tuples(&encode_semantic_tokens(&anns, &legend, "12")),
			[[0, 0, 1, number], [0, 1, 1, number]]
		);
	}

	#[test]
	fn test_multiline_and_unknown_terms() {
		let legend = Legend::default();
		let text = "/* a\nbc */ x";
		let anns = [ann("comment", 0, 0, 1, 5), ann("not_a_term", 1, 6, 1, 7)];
		let comment = legend.index_of("comment").unwrap();
		assert_eq!(
			tuples(&encode_semantic_tokens(&anns, &legend, text)),
			[[0, 0, 4, comment], [1, 0, 5, comment]]
		);
	}
}
