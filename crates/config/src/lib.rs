//! Configuration for the tinct highlighting engine.
//!
//! Configuration is written in KDL (v2). Every key is optional:
//!
//! ```kdl
//! languages "c" "cpp" "javascript" "typescript"
//! terms "type" "function" "variable" "comment"
//! highlight-comments #true
//! debounce-ms 20
//! runtime "/usr/share/tinct"
//! ```
//!
//! Unknown nodes and repeated keys do not fail parsing; they are collected in
//! [`Config::warnings`].

pub mod error;
mod kdl_util;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use error::{ConfigError, ConfigWarning, Result};
use rustc_hash::FxHashSet;
use tinct_highlight::DEFAULT_TERMS;
use tinct_language::{Term, runtime_dir};

/// Languages enabled when the config does not say otherwise.
pub const DEFAULT_LANGUAGES: [&str; 4] = ["c", "cpp", "javascript", "typescript"];

/// Quiet period before a debounced stage fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(20);

/// The term suppressed by `highlight-comments #false`.
pub const COMMENT_TERM: &str = "comment";

/// Parsed engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
	/// Language identifiers allowed to register.
	pub languages: Vec<String>,
	/// Terms forwarded to the rendering adapter.
	pub terms: Vec<Term>,
	/// When false, `comment` is dropped from the enabled terms.
	pub highlight_comments: bool,
	/// Debounce delay shared by the rebuild and refresh stages.
	pub debounce: Duration,
	/// Directory holding `grammars/` and `parsers/`.
	pub runtime: PathBuf,
	/// Non-fatal warnings encountered during parsing.
	pub warnings: Vec<ConfigWarning>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			languages: DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect(),
			terms: DEFAULT_TERMS.into_iter().map(Term::from).collect(),
			highlight_comments: true,
			debounce: DEFAULT_DEBOUNCE,
			runtime: runtime_dir(),
			warnings: Vec::new(),
		}
	}
}

impl Config {
	/// Parse a KDL string, starting from defaults.
	pub fn parse(input: &str) -> Result<Self> {
		let doc: kdl::KdlDocument = input.parse()?;
		let mut config = Self::default();
		let mut seen: FxHashSet<&str> = FxHashSet::default();

		for node in doc.nodes() {
			let name = node.name().value();
			match name {
				"languages" => config.languages = dedup(kdl_util::string_args(node)?),
				"terms" => {
					config.terms = dedup(kdl_util::string_args(node)?)
						.into_iter()
						.map(|t| Term::from(t.as_str()))
						.collect();
				}
				"highlight-comments" => config.highlight_comments = kdl_util::bool_arg(node)?,
				"debounce-ms" => config.debounce = Duration::from_millis(kdl_util::u64_arg(node)?),
				"runtime" => config.runtime = PathBuf::from(kdl_util::string_arg(node)?),
				_ => {
					config.warnings.push(ConfigWarning::UnknownNode(name.to_string()));
					continue;
				}
			}
			if !seen.insert(name) {
				config.warnings.push(ConfigWarning::Duplicate(name.to_string()));
			}
		}

		Ok(config)
	}

	/// Load configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		Self::parse(&content)
	}

	/// `$XDG_CONFIG_HOME/tinct/config.kdl` or the platform equivalent.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|d| d.join("tinct").join("config.kdl"))
	}

	/// Loads the default config file if it exists, otherwise returns defaults.
	pub fn discover() -> Result<Self> {
		match Self::default_path() {
			Some(path) if path.is_file() => Self::load(path),
			_ => Ok(Self::default()),
		}
	}

	/// Terms forwarded downstream after applying the comment toggle.
	pub fn enabled_terms(&self) -> FxHashSet<Term> {
		self.terms
			.iter()
			.filter(|t| self.highlight_comments || t.as_str() != COMMENT_TERM)
			.cloned()
			.collect()
	}

	pub fn is_language_enabled(&self, id: &str) -> bool {
		self.languages.iter().any(|l| l == id)
	}
}

fn dedup(values: Vec<String>) -> Vec<String> {
	let mut seen = FxHashSet::default();
	values.into_iter().filter(|v| seen.insert(v.clone())).collect()
}
