//! Read-only view of a concrete syntax tree.
//!
//! The matcher and classifier are written against [`SyntaxNode`] so they do
//! not depend on a particular parser; the tree-sitter implementation lives
//! here as well.

use std::borrow::Cow;
use std::fmt;

/// A (row, column) position. Columns are in the parser's units (bytes for tree-sitter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
	pub row: usize,
	pub column: usize,
}

impl Position {
	pub const fn new(row: usize, column: usize) -> Self {
		Self { row, column }
	}
}

impl fmt::Display for Position {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.row, self.column)
	}
}

impl From<tree_sitter::Point> for Position {
	fn from(p: tree_sitter::Point) -> Self {
		Self::new(p.row, p.column)
	}
}

impl From<Position> for tree_sitter::Point {
	fn from(p: Position) -> Self {
		tree_sitter::Point {
			row: p.row,
			column: p.column,
		}
	}
}

/// Half-open `[start, end)` span of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TextRange {
	pub start: Position,
	pub end: Position,
}

impl TextRange {
	pub const fn new(start: Position, end: Position) -> Self {
		Self { start, end }
	}

	pub fn is_empty(&self) -> bool {
		self.start >= self.end
	}

	pub fn is_multiline(&self) -> bool {
		self.end.row > self.start.row
	}
}

impl fmt::Display for TextRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}", self.start, self.end)
	}
}

/// Navigation over a syntax tree owned by an external parser.
pub trait SyntaxNode: Clone {
	/// Node type name (for anonymous tokens, the token text).
	fn kind(&self) -> &str;
	/// False for anonymous tokens such as punctuation and keywords.
	fn is_named(&self) -> bool;
	fn parent(&self) -> Option<Self>;
	fn first_child(&self) -> Option<Self>;
	fn next_sibling(&self) -> Option<Self>;
	fn prev_sibling(&self) -> Option<Self>;
	fn start_position(&self) -> Position;
	fn end_position(&self) -> Position;

	fn range(&self) -> TextRange {
		TextRange::new(self.start_position(), self.end_position())
	}
}

/// Lookup key for a node: the type name, quoted for anonymous nodes.
///
/// Keeps the `"identifier"` keyword token distinct from an `identifier` node.
pub fn type_key<N: SyntaxNode>(node: &N) -> Cow<'_, str> {
	if node.is_named() {
		Cow::Borrowed(node.kind())
	} else {
		Cow::Owned(format!("\"{}\"", node.kind()))
	}
}

impl<'tree> SyntaxNode for tree_sitter::Node<'tree> {
	#[inline]
	fn kind(&self) -> &str {
		tree_sitter::Node::kind(self)
	}

	#[inline]
	fn is_named(&self) -> bool {
		tree_sitter::Node::is_named(self)
	}

	fn parent(&self) -> Option<Self> {
		tree_sitter::Node::parent(self)
	}

	fn first_child(&self) -> Option<Self> {
		let mut cursor = self.walk();
		cursor.goto_first_child().then(|| cursor.node())
	}

	fn next_sibling(&self) -> Option<Self> {
		tree_sitter::Node::next_sibling(self)
	}

	fn prev_sibling(&self) -> Option<Self> {
		tree_sitter::Node::prev_sibling(self)
	}

	fn start_position(&self) -> Position {
		tree_sitter::Node::start_position(self).into()
	}

	fn end_position(&self) -> Position {
		tree_sitter::Node::end_position(self).into()
	}
}
