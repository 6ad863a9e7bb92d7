//! Events delivered by the host and the identifiers they carry.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use tinct_config::Config;
use tinct_highlight::Position;
use tree_sitter::InputEdit;

/// Identifies an open document (typically its URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Arc<str>);

impl DocumentId {
	pub fn new(uri: impl Into<Arc<str>>) -> Self {
		Self(uri.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for DocumentId {
	fn from(uri: &str) -> Self {
		Self::new(uri)
	}
}

impl fmt::Display for DocumentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Identifies one on-screen editor. Several editors may show the same document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorId(pub u64);

impl fmt::Display for EditorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "editor#{}", self.0)
	}
}

/// An editor currently on screen and the document it shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisibleEditor {
	pub id: EditorId,
	pub doc: DocumentId,
}

impl VisibleEditor {
	pub fn new(id: u64, doc: impl Into<DocumentId>) -> Self {
		Self {
			id: EditorId(id),
			doc: doc.into(),
		}
	}
}

/// One replaced region, in old and new coordinates.
///
/// Byte offsets and positions map one to one onto [`InputEdit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
	pub start_byte: usize,
	pub old_end_byte: usize,
	pub new_end_byte: usize,
	pub start_position: Position,
	pub old_end_position: Position,
	pub new_end_position: Position,
}

impl TextEdit {
	/// Describes replacing `range` (bytes of `old_text`) with `inserted`.
	///
	/// The range is clamped to the text.
	pub fn from_change(old_text: &str, range: Range<usize>, inserted: &str) -> Self {
		let end = range.end.min(old_text.len());
		let start = range.start.min(end);
		let start_position = advance(Position::default(), &old_text.as_bytes()[..start]);
		let old_end_position = advance(start_position, &old_text.as_bytes()[start..end]);
		Self {
			start_byte: start,
			old_end_byte: end,
			new_end_byte: start + inserted.len(),
			start_position,
			old_end_position,
			new_end_position: advance(start_position, inserted.as_bytes()),
		}
	}

	/// Applies a replacement to `text`, returning the new text and its edit.
	///
	/// Returns `None` if `range` is out of bounds or splits a character.
	pub fn apply(text: &str, range: Range<usize>, inserted: &str) -> Option<(String, Self)> {
		text.get(range.clone())?;
		let mut new_text = String::with_capacity(text.len() - range.len() + inserted.len());
		new_text.push_str(&text[..range.start]);
		new_text.push_str(inserted);
		new_text.push_str(&text[range.end..]);
		let edit = Self::from_change(text, range, inserted);
		Some((new_text, edit))
	}

	/// Inserts nothing and removes nothing.
	pub fn is_noop(&self) -> bool {
		self.start_byte == self.old_end_byte && self.start_byte == self.new_end_byte
	}
}

fn advance(mut pos: Position, bytes: &[u8]) -> Position {
	for &b in bytes {
		if b == b'\n' {
			pos.row += 1;
			pos.column = 0;
		} else {
			pos.column += 1;
		}
	}
	pos
}

impl From<TextEdit> for InputEdit {
	fn from(e: TextEdit) -> Self {
		InputEdit {
			start_byte: e.start_byte,
			old_end_byte: e.old_end_byte,
			new_end_byte: e.new_end_byte,
			start_position: e.start_position.into(),
			old_end_position: e.old_end_position.into(),
			new_end_position: e.new_end_position.into(),
		}
	}
}

/// Host notifications consumed by the engine.
#[derive(Debug, Clone)]
pub enum HostEvent {
	Opened {
		doc: DocumentId,
		language: String,
		text: String,
	},
	/// `text` is the full document after all `edits` were applied, in order.
	Changed {
		doc: DocumentId,
		text: String,
		edits: Vec<TextEdit>,
	},
	Closed {
		doc: DocumentId,
	},
	/// The complete set of editors now on screen.
	VisibleEditorsChanged(Vec<VisibleEditor>),
	ConfigChanged(Box<Config>),
}

impl HostEvent {
	/// Document the event refers to, if any.
	pub fn doc(&self) -> Option<&DocumentId> {
		match self {
			Self::Opened { doc, .. } | Self::Changed { doc, .. } | Self::Closed { doc } => Some(doc),
			Self::VisibleEditorsChanged(_) | Self::ConfigChanged(_) => None,
		}
	}
}
