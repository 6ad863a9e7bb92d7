//! Grammar rule tables.
//!
//! A grammar maps tree-sitter node types to highlight terms. Rule files live at
//! `<runtime>/grammars/<language>.json` and are JSON with comments:
//!
//! ```jsonc
//! {
//!     // direct one-to-one lookups
//!     "simpleTerms": { "identifier": "variable", "\"return\"": "keyword_control" },
//!     // node types that need ancestor/sibling context
//!     "complexTerms": ["identifier"],
//!     "complexScopes": { "call_expression > identifier": "function" },
//! }
//! ```
//!
//! Matching metadata (`max_depth`, `uses_order`) is derived once at load.
//! Malformed files are rejected as a whole; a loaded [`Grammar`] never fails
//! during classification.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use serde::de::IgnoredAny;
use thiserror::Error;
use tracing::{debug, warn};

use crate::scope::{PatternError, ScopePattern};

/// Errors that can occur when loading a grammar.
#[derive(Error, Debug)]
pub enum GrammarLoadError {
	/// No rule file for the language in the runtime directory.
	#[error("grammar not found: {0}")]
	NotFound(String),

	/// Reading the rule file failed.
	#[error("I/O error reading {path}: {error}")]
	Io {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},

	/// The rule file is not valid JSONC or has the wrong shape.
	#[error("malformed grammar for {language}: {message}")]
	Syntax { language: String, message: String },

	/// A `complexScopes` key failed to parse.
	#[error("invalid scope pattern `{pattern}`: {reason}")]
	InvalidPattern {
		pattern: String,
		#[source]
		reason: PatternError,
	},

	/// A rule maps to an empty term.
	#[error("empty term for `{key}`")]
	EmptyTerm { key: String },
}

/// A highlight term such as `function` or `keyword_control`.
///
/// Terms are opaque labels; the engine only uses them as lookup keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term(Arc<str>);

impl Term {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self(name.into())
	}

	#[inline]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Term {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Borrow<str> for Term {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl From<&str> for Term {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

/// On-disk rule file shape.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RuleFile {
	#[serde(default)]
	simple_terms: BTreeMap<String, String>,
	#[serde(default)]
	complex_terms: ComplexTerms,
	#[serde(default)]
	complex_scopes: BTreeMap<String, String>,
}

/// `complexTerms` is written either as a list or as an object keyed by type.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ComplexTerms {
	List(Vec<String>),
	Keys(BTreeMap<String, IgnoredAny>),
}

impl Default for ComplexTerms {
	fn default() -> Self {
		Self::List(Vec::new())
	}
}

impl ComplexTerms {
	fn into_keys(self) -> Vec<String> {
		match self {
			Self::List(list) => list,
			Self::Keys(map) => map.into_keys().collect(),
		}
	}
}

/// Immutable per-language rule table with precomputed matching metadata.
#[derive(Debug, Clone)]
pub struct Grammar {
	language: String,
	simple_terms: FxHashMap<String, Term>,
	complex_terms: FxHashSet<String>,
	complex_scopes: FxHashMap<String, Term>,
	max_depth: usize,
	uses_order: bool,
}

impl Grammar {
	/// Parses a rule description (JSON with comments and trailing commas).
	pub fn parse(language: &str, source: &str) -> Result<Self, GrammarLoadError> {
		let rules: RuleFile = json5::from_str(source).map_err(|e| GrammarLoadError::Syntax {
			language: language.to_string(),
			message: e.to_string(),
		})?;
		Self::from_rules(language, rules)
	}

	/// Loads `<runtime>/grammars/<language>.json`.
	pub fn load(runtime: &Path, language: &str) -> Result<Self, GrammarLoadError> {
		let path = grammar_path(runtime, language);
		if !path.exists() {
			return Err(GrammarLoadError::NotFound(language.to_string()));
		}
		Self::load_from_path(language, &path)
	}

	/// Loads a rule file from an explicit path.
	pub fn load_from_path(language: &str, path: &Path) -> Result<Self, GrammarLoadError> {
		let source = std::fs::read_to_string(path).map_err(|error| GrammarLoadError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let grammar = Self::parse(language, &source)?;
		debug!(
			language,
			path = %path.display(),
			max_depth = grammar.max_depth,
			uses_order = grammar.uses_order,
			"grammar.loaded"
		);
		Ok(grammar)
	}

	fn from_rules(language: &str, rules: RuleFile) -> Result<Self, GrammarLoadError> {
		let simple_terms = rules
			.simple_terms
			.into_iter()
			.map(|(key, term)| Ok((key.clone(), checked_term(key, term)?)))
			.collect::<Result<FxHashMap<_, _>, GrammarLoadError>>()?;

		let complex_terms: FxHashSet<String> = rules.complex_terms.into_keys().into_iter().collect();

		let mut complex_scopes = FxHashMap::default();
		let mut max_depth = 0;
		let mut uses_order = false;
		for (key, term) in rules.complex_scopes {
			let pattern = ScopePattern::parse(&key).map_err(|reason| GrammarLoadError::InvalidPattern {
				pattern: key.clone(),
				reason,
			})?;
			if pattern.has_ancestor_qualifier() {
				warn!(language, pattern = %key, "order qualifier on an ancestor segment never matches");
			}
			max_depth = max_depth.max(pattern.depth());
			uses_order |= pattern.uses_order();
			complex_scopes.insert(pattern.canonical(), checked_term(key, term)?);
		}

		Ok(Self {
			language: language.to_string(),
			simple_terms,
			complex_terms,
			complex_scopes,
			max_depth,
			uses_order,
		})
	}

	/// Language identifier this grammar was loaded for.
	pub fn language(&self) -> &str {
		&self.language
	}

	/// Direct lookup for a type key.
	#[inline]
	pub fn simple_term(&self, type_key: &str) -> Option<&Term> {
		self.simple_terms.get(type_key)
	}

	/// Returns true if the type key requires contextual analysis.
	#[inline]
	pub fn is_complex(&self, type_key: &str) -> bool {
		self.complex_terms.contains(type_key)
	}

	/// Looks up a canonical scope key.
	#[inline]
	pub fn scope_term(&self, scope: &str) -> Option<&Term> {
		self.complex_scopes.get(scope)
	}

	/// Longest ancestor chain referenced by any scope pattern, excluding the node.
	#[inline]
	pub fn max_depth(&self) -> usize {
		self.max_depth
	}

	/// True if any scope pattern carries a sibling-order qualifier.
	#[inline]
	pub fn uses_order(&self) -> bool {
		self.uses_order
	}

	pub fn simple_len(&self) -> usize {
		self.simple_terms.len()
	}

	pub fn complex_len(&self) -> usize {
		self.complex_terms.len()
	}

	pub fn scopes_len(&self) -> usize {
		self.complex_scopes.len()
	}

	/// Every term this grammar can produce, sorted and deduplicated.
	pub fn terms(&self) -> Vec<Term> {
		let mut terms: Vec<Term> = self
			.simple_terms
			.values()
			.chain(self.complex_scopes.values())
			.cloned()
			.collect();
		terms.sort();
		terms.dedup();
		terms
	}
}

fn checked_term(key: String, term: String) -> Result<Term, GrammarLoadError> {
	if term.trim().is_empty() {
		return Err(GrammarLoadError::EmptyTerm { key });
	}
	Ok(Term::new(term))
}

/// Path of a language's rule file inside a runtime directory.
pub fn grammar_path(runtime: &Path, language: &str) -> PathBuf {
	runtime.join("grammars").join(format!("{language}.json"))
}

/// Returns the default runtime directory: `$TINCT_RUNTIME`, else `~/.local/share/tinct/`.
pub fn runtime_dir() -> PathBuf {
	if let Ok(runtime) = std::env::var("TINCT_RUNTIME") {
		return PathBuf::from(runtime);
	}

	dirs::data_local_dir()
		.map(|d| d.join("tinct"))
		.unwrap_or_else(|| PathBuf::from("."))
}

/// Lists languages that have a rule file in the runtime directory.
pub fn installed_grammars(runtime: &Path) -> Vec<String> {
	let Ok(entries) = std::fs::read_dir(runtime.join("grammars")) else {
		return Vec::new();
	};
	let mut names: Vec<String> = entries
		.filter_map(Result::ok)
		.map(|e| e.path())
		.filter(|p| p.extension().is_some_and(|ext| ext == "json"))
		.filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
		.collect();
	names.sort();
	names
}
