//! Static term vocabulary handed to the rendering host.

use lsp_types::{SemanticTokenType, SemanticTokensLegend};
use rustc_hash::FxHashMap;
use tinct_language::Term;

/// Default term vocabulary, in token-index order.
pub const DEFAULT_TERMS: [&str; 13] = [
	"type",
	"namespace",
	"function",
	"variable",
	"string",
	"number",
	"punctuation",
	"comment",
	"keyword_constant",
	"keyword_directive",
	"keyword_control",
	"keyword_operator",
	"storage_modifier",
];

/// Prefix of the theme color key for a term.
pub const COLOR_KEY_PREFIX: &str = "syntax.";

/// Ordered term list with stable token indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Legend {
	terms: Vec<Term>,
	index: FxHashMap<Term, u32>,
}

impl Default for Legend {
	fn default() -> Self {
		Self::new(DEFAULT_TERMS.into_iter().map(Term::from))
	}
}

impl Legend {
	/// Builds a legend; duplicate terms keep their first index.
	pub fn new(terms: impl IntoIterator<Item = Term>) -> Self {
		let mut legend = Self {
			terms: Vec::new(),
			index: FxHashMap::default(),
		};
		for term in terms {
			if legend.index.contains_key(&term) {
				continue;
			}
			let idx = legend.terms.len() as u32;
			legend.index.insert(term.clone(), idx);
			legend.terms.push(term);
		}
		legend
	}

	pub fn terms(&self) -> &[Term] {
		&self.terms
	}

	pub fn len(&self) -> usize {
		self.terms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.terms.is_empty()
	}

	pub fn contains(&self, term: &str) -> bool {
		self.index.contains_key(term)
	}

	/// Token type index of `term`, if it is part of the legend.
	pub fn index_of(&self, term: &str) -> Option<u32> {
		self.index.get(term).copied()
	}

	/// Theme color key for `term`, e.g. `syntax.function`.
	pub fn color_key(term: &str) -> String {
		format!("{COLOR_KEY_PREFIX}{term}")
	}

	/// LSP legend whose token types are the terms, in index order.
	pub fn semantic_tokens_legend(&self) -> SemanticTokensLegend {
		SemanticTokensLegend {
			token_types: self
				.terms
				.iter()
				.map(|t| SemanticTokenType::from(t.as_str().to_string()))
				.collect(),
			token_modifiers: Vec::new(),
		}
	}
}
