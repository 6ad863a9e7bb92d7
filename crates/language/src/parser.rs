//! Parser assets.
//!
//! Parsers are compiled tree-sitter grammars, either linked into the binary
//! ([`ParserSource::Builtin`]) or loaded from a shared library under
//! `<runtime>/parsers/` exporting `tree_sitter_<language>`.

use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use thiserror::Error;
use tracing::debug;
use tree_sitter::{Language, Parser};
use tree_sitter_language::LanguageFn;

/// Errors that can occur when initializing a parser.
#[derive(Error, Debug)]
pub enum ParserInitError {
	/// No parser library for the language in any search path.
	#[error("parser not found: {0}")]
	NotFound(String),

	/// Failed to load the dynamic library.
	#[error("failed to load parser library {path}: {message}")]
	Library { path: PathBuf, message: String },

	/// Library exists but doesn't export the expected symbol.
	#[error("parser library {path} missing symbol {symbol}")]
	MissingSymbol { path: PathBuf, symbol: String },

	/// The parser's ABI version is not supported by the linked runtime.
	#[error("parser for {language} is incompatible: {message}")]
	Incompatible { language: String, message: String },
}

/// Where a language's parser comes from.
#[derive(Clone)]
pub enum ParserSource {
	/// Shared library at the given path.
	Library(PathBuf),
	/// Parser compiled into the binary.
	Builtin(LanguageFn),
}

impl fmt::Debug for ParserSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Library(path) => f.debug_tuple("Library").field(path).finish(),
			Self::Builtin(_) => f.write_str("Builtin"),
		}
	}
}

/// An initialized parser language, keeping its backing library alive.
pub struct ParserAsset {
	language: Language,
	_library: Option<Library>,
}

impl fmt::Debug for ParserAsset {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ParserAsset")
			.field("abi_version", &self.language.abi_version())
			.field("dynamic", &self._library.is_some())
			.finish()
	}
}

impl ParserAsset {
	/// Initializes a parser from its source and checks it against the runtime.
	pub fn load(name: &str, source: &ParserSource) -> Result<Self, ParserInitError> {
		let asset = match source {
			ParserSource::Builtin(func) => Self {
				language: Language::new(func.clone()),
				_library: None,
			},
			ParserSource::Library(path) => load_library(name, path)?,
		};
		asset.new_parser(name)?;
		Ok(asset)
	}

	/// Resolves `<runtime>/parsers/<lib>` for the language and loads it.
	pub fn load_from_runtime(runtime: &Path, name: &str) -> Result<Self, ParserInitError> {
		let path = parser_library_path(runtime, name);
		if !path.exists() {
			return Err(ParserInitError::NotFound(name.to_string()));
		}
		Self::load(name, &ParserSource::Library(path))
	}

	pub fn language(&self) -> &Language {
		&self.language
	}

	/// Creates a parser configured for this language.
	pub fn new_parser(&self, name: &str) -> Result<Parser, ParserInitError> {
		let mut parser = Parser::new();
		parser
			.set_language(&self.language)
			.map_err(|e| ParserInitError::Incompatible {
				language: name.to_string(),
				message: e.to_string(),
			})?;
		Ok(parser)
	}
}

fn load_library(name: &str, path: &Path) -> Result<ParserAsset, ParserInitError> {
	let symbol = format!("tree_sitter_{}", name.replace('-', "_"));

	// SAFETY: Loading a tree-sitter parser from a dynamic library. Its
	// initializers are trusted the same way as any other runtime asset.
	let library = unsafe { Library::new(path) }.map_err(|e| ParserInitError::Library {
		path: path.to_path_buf(),
		message: e.to_string(),
	})?;

	// SAFETY: `tree_sitter_<name>` has this signature in every generated parser,
	// and the library outlives the language because both live in the asset.
	let func = unsafe {
		let sym = library
			.get::<unsafe extern "C" fn() -> *const ()>(symbol.as_bytes())
			.map_err(|_| ParserInitError::MissingSymbol {
				path: path.to_path_buf(),
				symbol: symbol.clone(),
			})?;
		LanguageFn::from_raw(*sym)
	};

	debug!(language = name, path = %path.display(), "parser.library_loaded");
	Ok(ParserAsset {
		language: Language::new(func),
		_library: Some(library),
	})
}

/// Returns the path of a language's parser library inside a runtime directory.
pub fn parser_library_path(runtime: &Path, name: &str) -> PathBuf {
	runtime.join("parsers").join(parser_library_name(name))
}

/// Returns the platform-specific library filename for a parser.
fn parser_library_name(name: &str) -> String {
	let safe_name = name.replace('-', "_");
	#[cfg(target_os = "macos")]
	{
		format!("lib{safe_name}.dylib")
	}
	#[cfg(target_os = "windows")]
	{
		format!("{safe_name}.dll")
	}
	#[cfg(not(any(target_os = "macos", target_os = "windows")))]
	{
		format!("lib{safe_name}.so")
	}
}
