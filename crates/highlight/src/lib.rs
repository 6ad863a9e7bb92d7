//! Term classification over concrete syntax trees.
//!
//! * [`node`]: Parser-agnostic node view, implemented for tree-sitter nodes
//! * [`matcher`]: Single-node classification from type, ancestors, and siblings
//! * [`classify`]: Whole-tree walk producing annotations and per-term buckets
//! * [`legend`]: Term vocabulary with stable token indices

pub mod classify;
pub mod legend;
pub mod matcher;
pub mod node;
#[cfg(test)]
mod test_tree;

pub use classify::{Annotation, TermBuckets, classify_tree, walk};
pub use legend::{DEFAULT_TERMS, Legend};
pub use matcher::{classify_node, scope_candidates, scope_chain, sibling_counts};
pub use node::{Position, SyntaxNode, TextRange, type_key};
