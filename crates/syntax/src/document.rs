//! Per-document parse trees and annotation caches.
//!
//! A tracked document owns its parser, its current tree and the text the tree
//! was parsed from. Edits are applied to the tree as [`InputEdit`]s before a
//! full re-parse that passes the edited tree back as a reuse hint; the result
//! is the same as a fresh parse, only faster. Any edit discards the cached
//! annotations.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tinct_highlight::{Annotation, Legend, TermBuckets, classify_tree};
use tinct_language::{LoadedLanguage, ParserInitError};
use tracing::{debug, trace, warn};
use tree_sitter::{InputEdit, Parser, Tree};

use crate::event::{DocumentId, TextEdit};

/// Failures opening a document.
#[derive(Error, Debug)]
pub enum DocumentError {
	#[error(transparent)]
	Parser(#[from] ParserInitError),

	/// The parser returned no tree (cancelled or no language set).
	#[error("parsing {doc} produced no tree")]
	NoTree { doc: DocumentId },
}

/// Result of [`DocumentTreeCache::edit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
	/// Tree updated and annotations invalidated.
	Applied,
	/// The batch had no edits; nothing changed.
	Empty,
	/// The document is not tracked; nothing changed.
	Stale,
}

/// Annotations of one tree, flat and bucketed by term.
#[derive(Debug, Clone)]
pub struct BuiltAnnotations {
	pub annotations: Arc<[Annotation]>,
	pub buckets: Arc<TermBuckets>,
}

/// A parsed document.
pub struct Document {
	language: Arc<LoadedLanguage>,
	parser: Parser,
	tree: Tree,
	text: String,
	built: Option<BuiltAnnotations>,
}

impl Document {
	pub fn language(&self) -> &Arc<LoadedLanguage> {
		&self.language
	}

	pub fn tree(&self) -> &Tree {
		&self.tree
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	/// Cached annotations, `None` while dirty.
	pub fn built(&self) -> Option<&BuiltAnnotations> {
		self.built.as_ref()
	}

	pub fn is_dirty(&self) -> bool {
		self.built.is_none()
	}

	fn build(&mut self, legend: &Legend) -> &BuiltAnnotations {
		let grammar = self.language.grammar();
		let tree = &self.tree;
		self.built.get_or_insert_with(|| {
			let annotations = classify_tree(&tree.root_node(), grammar);
			let buckets = TermBuckets::from_annotations(legend.terms(), &annotations);
			BuiltAnnotations {
				annotations: annotations.into(),
				buckets: Arc::new(buckets),
			}
		})
	}
}

/// Trees and annotation caches of all open documents.
#[derive(Default)]
pub struct DocumentTreeCache {
	docs: FxHashMap<DocumentId, Document>,
}

impl DocumentTreeCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses `text` from scratch and starts tracking `doc`.
	///
	/// Re-opening a tracked document replaces its state.
	pub fn open(&mut self, doc: DocumentId, language: Arc<LoadedLanguage>, text: String) -> Result<(), DocumentError> {
		let mut parser = language.new_parser()?;
		let tree = parser.parse(&text, None).ok_or_else(|| DocumentError::NoTree { doc: doc.clone() })?;
		debug!(doc = %doc, language = language.id(), bytes = text.len(), "document.opened");
		self.docs.insert(
			doc,
			Document {
				language,
				parser,
				tree,
				text,
				built: None,
			},
		);
		Ok(())
	}

	/// Applies `edits` in order, then re-parses `text` (the post-edit document).
	pub fn edit(&mut self, doc: &DocumentId, text: String, edits: &[TextEdit]) -> EditOutcome {
		let Some(state) = self.docs.get_mut(doc) else {
			trace!(doc = %doc, "document.edit.stale");
			return EditOutcome::Stale;
		};
		if edits.is_empty() {
			return EditOutcome::Empty;
		}

		for edit in edits {
			state.tree.edit(&InputEdit::from(*edit));
		}
		match state.parser.parse(&text, Some(&state.tree)) {
			Some(tree) => state.tree = tree,
			// keep the edited tree
			None => warn!(doc = %doc, "document.reparse.failed"),
		}
		state.text = text;
		state.built = None;
		trace!(doc = %doc, edits = edits.len(), "document.edited");
		EditOutcome::Applied
	}

	/// Stops tracking `doc`. Returns false if it was not tracked.
	pub fn close(&mut self, doc: &DocumentId) -> bool {
		let closed = self.docs.remove(doc).is_some();
		if closed {
			debug!(doc = %doc, "document.closed");
		}
		closed
	}

	pub fn get(&self, doc: &DocumentId) -> Option<&Document> {
		self.docs.get(doc)
	}

	pub fn contains(&self, doc: &DocumentId) -> bool {
		self.docs.contains_key(doc)
	}

	/// True if `doc` is tracked and its annotation cache is valid.
	pub fn is_fresh(&self, doc: &DocumentId) -> bool {
		self.docs.get(doc).is_some_and(|d| !d.is_dirty())
	}

	/// Classifies `doc` if its cache is stale and returns the cached result.
	pub fn build(&mut self, doc: &DocumentId, legend: &Legend) -> Option<&BuiltAnnotations> {
		Some(self.docs.get_mut(doc)?.build(legend))
	}

	pub fn documents(&self) -> impl Iterator<Item = &DocumentId> {
		self.docs.keys()
	}

	pub fn len(&self) -> usize {
		self.docs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.docs.is_empty()
	}
}
