//! Whole-tree classification.
//!
//! Walks every node with an explicit stack so deeply nested sources never
//! exhaust the call stack, asks the matcher for a term per node, and collects
//! the resulting annotations in visit order.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use tinct_language::{Grammar, Term};

use crate::matcher::classify_node;
use crate::node::{SyntaxNode, TextRange};

/// A term assigned to a node's exact span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
	pub term: Term,
	pub range: TextRange,
}

impl fmt::Display for Annotation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.range, self.term)
	}
}

/// Classifies every node reachable from `root`, including `root` itself.
///
/// Annotations come out in post-order: a node is emitted once its subtree has
/// been visited, children left to right.
pub fn classify_tree<N: SyntaxNode>(root: &N, grammar: &Grammar) -> Vec<Annotation> {
	let mut out = Vec::new();
	walk(root, |node| {
		if let Some(term) = classify_node(node, grammar) {
			out.push(Annotation {
				term: term.clone(),
				range: node.range(),
			});
		}
	});
	out
}

/// Visits every node under `root` exactly once, children before parents.
pub fn walk<N: SyntaxNode>(root: &N, mut visit: impl FnMut(&N)) {
	let mut stack: Vec<N> = Vec::new();
	let mut cursor = Some(root.clone());
	loop {
		if let Some(node) = cursor {
			cursor = node.first_child();
			stack.push(node);
			continue;
		}
		let Some(node) = stack.pop() else {
			break;
		};
		visit(&node);
		// Siblings of the root are outside the walked subtree.
		if !stack.is_empty() {
			cursor = node.next_sibling();
		}
	}
}

/// Annotation ranges grouped by term.
///
/// Seeded buckets stay present even when empty so that pushing a fresh set of
/// buckets also clears terms that no longer occur.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermBuckets {
	buckets: FxHashMap<Term, Vec<TextRange>>,
}

impl TermBuckets {
	/// Empty buckets for each of `terms`.
	pub fn seeded<'a>(terms: impl IntoIterator<Item = &'a Term>) -> Self {
		Self {
			buckets: terms.into_iter().map(|t| (t.clone(), Vec::new())).collect(),
		}
	}

	/// Groups `annotations` into `seed` buckets, keeping per-term order.
	pub fn from_annotations<'a>(seed: impl IntoIterator<Item = &'a Term>, annotations: &[Annotation]) -> Self {
		let mut buckets = Self::seeded(seed);
		for a in annotations {
			buckets.push(a.term.clone(), a.range);
		}
		buckets
	}

	pub fn push(&mut self, term: Term, range: TextRange) {
		self.buckets.entry(term).or_default().push(range);
	}

	pub fn get(&self, term: &str) -> Option<&[TextRange]> {
		self.buckets.get(term).map(Vec::as_slice)
	}

	/// Buckets restricted to `enabled`; disabled terms are dropped entirely.
	pub fn filtered(&self, enabled: &FxHashSet<Term>) -> Self {
		Self {
			buckets: self
				.buckets
				.iter()
				.filter(|(term, _)| enabled.contains(*term))
				.map(|(term, ranges)| (term.clone(), ranges.clone()))
				.collect(),
		}
	}

	/// Iterates buckets in term order.
	pub fn iter(&self) -> impl Iterator<Item = (&Term, &[TextRange])> {
		let mut entries: Vec<_> = self.buckets.iter().collect();
		entries.sort_by(|a, b| a.0.cmp(b.0));
		entries.into_iter().map(|(t, r)| (t, r.as_slice()))
	}

	/// Number of buckets, empty ones included.
	pub fn len(&self) -> usize {
		self.buckets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buckets.is_empty()
	}

	/// Total number of ranges across all buckets.
	pub fn range_count(&self) -> usize {
		self.buckets.values().map(Vec::len).sum()
	}
}
