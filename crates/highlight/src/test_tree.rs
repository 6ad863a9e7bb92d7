//! In-memory syntax tree for exercising the matcher without a parser.

use std::collections::HashMap;

use crate::node::{Position, SyntaxNode, TextRange};

struct NodeData {
	kind: String,
	named: bool,
	text: Option<String>,
	parent: Option<usize>,
	children: Vec<usize>,
	range: TextRange,
}

/// Arena tree laid out on a single row; leaves occupy `text.len()` columns.
pub(crate) struct TestTree {
	nodes: Vec<NodeData>,
}

impl TestTree {
	pub(crate) fn new(root: &str) -> Self {
		Self {
			nodes: vec![NodeData {
				kind: root.to_string(),
				named: true,
				text: None,
				parent: None,
				children: Vec::new(),
				range: TextRange::default(),
			}],
		}
	}

	pub(crate) const ROOT: usize = 0;

	fn push(&mut self, parent: usize, kind: &str, named: bool, text: Option<&str>) -> usize {
		let idx = self.nodes.len();
		self.nodes.push(NodeData {
			kind: kind.to_string(),
			named,
			text: text.map(String::from),
			parent: Some(parent),
			children: Vec::new(),
			range: TextRange::default(),
		});
		self.nodes[parent].children.push(idx);
		idx
	}

	/// Adds a named interior node.
	pub(crate) fn node(&mut self, parent: usize, kind: &str) -> usize {
		self.push(parent, kind, true, None)
	}

	/// Adds a named leaf spanning `text`.
	pub(crate) fn leaf(&mut self, parent: usize, kind: &str, text: &str) -> usize {
		self.push(parent, kind, true, Some(text))
	}

	/// Adds an anonymous token whose text is its kind.
	pub(crate) fn token(&mut self, parent: usize, kind: &str) -> usize {
		self.push(parent, kind, false, Some(kind))
	}

	/// Assigns ranges: leaves laid out left to right, parents span their children.
	pub(crate) fn finish(mut self) -> Self {
		let mut column = 0;
		self.layout(Self::ROOT, &mut column);
		self
	}

	fn layout(&mut self, idx: usize, column: &mut usize) {
		let start = Position::new(0, *column);
		if let Some(text) = &self.nodes[idx].text {
			*column += text.len();
		}
		for child in self.nodes[idx].children.clone() {
			self.layout(child, column);
		}
		self.nodes[idx].range = TextRange::new(start, Position::new(0, *column));
	}

	pub(crate) fn get(&self, idx: usize) -> TestNode<'_> {
		TestNode { tree: self, idx }
	}

	pub(crate) fn root(&self) -> TestNode<'_> {
		self.get(Self::ROOT)
	}

	/// Index of every node by kind, in insertion order.
	pub(crate) fn by_kind(&self) -> HashMap<&str, Vec<usize>> {
		let mut map: HashMap<&str, Vec<usize>> = HashMap::new();
		for (idx, n) in self.nodes.iter().enumerate() {
			map.entry(n.kind.as_str()).or_default().push(idx);
		}
		map
	}

	pub(crate) fn len(&self) -> usize {
		self.nodes.len()
	}
}

#[derive(Clone, Copy)]
pub(crate) struct TestNode<'a> {
	tree: &'a TestTree,
	pub(crate) idx: usize,
}

impl TestNode<'_> {
	fn data(&self) -> &NodeData {
		&self.tree.nodes[self.idx]
	}

	fn sibling(&self, offset: isize) -> Option<Self> {
		let parent = self.data().parent?;
		let siblings = &self.tree.nodes[parent].children;
		let pos = siblings.iter().position(|&c| c == self.idx)?;
		let target = pos.checked_add_signed(offset)?;
		siblings.get(target).map(|&idx| Self { tree: self.tree, idx })
	}
}

impl SyntaxNode for TestNode<'_> {
	fn kind(&self) -> &str {
		&self.data().kind
	}

	fn is_named(&self) -> bool {
		self.data().named
	}

	fn parent(&self) -> Option<Self> {
		self.data().parent.map(|idx| Self { tree: self.tree, idx })
	}

	fn first_child(&self) -> Option<Self> {
		self.data().children.first().map(|&idx| Self { tree: self.tree, idx })
	}

	fn next_sibling(&self) -> Option<Self> {
		self.sibling(1)
	}

	fn prev_sibling(&self) -> Option<Self> {
		self.sibling(-1)
	}

	fn start_position(&self) -> Position {
		self.data().range.start
	}

	fn end_position(&self) -> Position {
		self.data().range.end
	}
}

/// `foo(bar)` as a C-like tree:
/// `program > expression_statement > call_expression > (identifier, argument_list > ("(", identifier, ")"))`.
pub(crate) fn call_tree() -> TestTree {
	let mut t = TestTree::new("program");
	let stmt = t.node(TestTree::ROOT, "expression_statement");
	let call = t.node(stmt, "call_expression");
	t.leaf(call, "identifier", "foo");
	let args = t.node(call, "argument_list");
	t.token(args, "(");
	t.leaf(args, "identifier", "bar");
	t.token(args, ")");
	t.finish()
}
