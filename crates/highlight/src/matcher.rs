//! Scope matching: node + ancestors + siblings + grammar -> term.
//!
//! Most nodes resolve through the direct `simpleTerms` lookup. Node types
//! listed in `complexTerms` build a chain of scope strings from the node up
//! through at most `max_depth` ancestors, optionally expanded with sibling
//! order qualifiers, and every candidate present in `complexScopes` overwrites
//! the result. Candidates are ordered shallow-to-deep and, within a depth,
//! plain before `[k]` before `[-k]`, so the most specific match wins.

use tinct_language::scope::SEPARATOR;
use tinct_language::{Grammar, Term};

use crate::node::{SyntaxNode, type_key};

/// Classifies a single node. Pure; never fails for a loaded grammar.
pub fn classify_node<'g, N: SyntaxNode>(node: &N, grammar: &'g Grammar) -> Option<&'g Term> {
	let key = type_key(node);
	let simple = grammar.simple_term(&key);
	if !grammar.is_complex(&key) {
		return simple;
	}

	// A complex type's own simple term is its least specific match.
	let mut result = simple;
	for candidate in scope_candidates(node, grammar) {
		if let Some(term) = grammar.scope_term(&candidate) {
			result = Some(term);
		}
	}
	result
}

/// Scope strings from the node alone up to its deepest considered ancestor.
///
/// Has `min(max_depth, available ancestors) + 1` entries.
pub fn scope_chain<N: SyntaxNode>(node: &N, max_depth: usize) -> Vec<String> {
	let mut desc = type_key(node).into_owned();
	let mut scopes = Vec::with_capacity(max_depth + 1);
	scopes.push(desc.clone());

	let mut parent = node.parent();
	for _ in 0..max_depth {
		let Some(p) = parent else {
			break;
		};
		desc = format!("{}{SEPARATOR}{desc}", type_key(&p));
		scopes.push(desc.clone());
		parent = p.parent();
	}
	scopes
}

/// Full ordered candidate list checked against `complexScopes`.
pub fn scope_candidates<N: SyntaxNode>(node: &N, grammar: &Grammar) -> Vec<String> {
	let chain = scope_chain(node, grammar.max_depth());
	if !grammar.uses_order() {
		return chain;
	}

	let (before, after) = sibling_counts(node);
	let mut out = Vec::with_capacity(chain.len() * 3);
	for scope in chain {
		let forward = format!("{scope}[{before}]");
		let backward = format!("{scope}[-{}]", after + 1);
		out.extend([scope, forward, backward]);
	}
	out
}

/// Counts same-type siblings before and after the node.
///
/// Returns `(k_forward, k_backward)`: the node is `[k_forward]` and
/// `[-(k_backward + 1)]` among siblings sharing its type key.
pub fn sibling_counts<N: SyntaxNode>(node: &N) -> (usize, usize) {
	let key = type_key(node);

	let mut before = 0;
	let mut cur = node.prev_sibling();
	while let Some(n) = cur {
		if type_key(&n) == key {
			before += 1;
		}
		cur = n.prev_sibling();
	}

	let mut after = 0;
	let mut cur = node.next_sibling();
	while let Some(n) = cur {
		if type_key(&n) == key {
			after += 1;
		}
		cur = n.next_sibling();
	}

	(before, after)
}
