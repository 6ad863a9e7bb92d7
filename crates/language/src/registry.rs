//! Per-language registry with shared lazy initialization.
//!
//! Each language is initialized at most once per process: the first `load`
//! reads the rule file and initializes the parser on a blocking task, and any
//! concurrent caller awaits the same [`OnceCell`]. The outcome, including a
//! failure, is cached for the process lifetime so a broken language is never
//! retried and never blocks other languages.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use tree_sitter::Parser;

use crate::grammar::{Grammar, GrammarLoadError, grammar_path};
use crate::parser::{ParserAsset, ParserInitError, ParserSource, parser_library_path};

/// Terminal per-language initialization failures.
#[derive(Error, Debug)]
pub enum LanguageError {
	#[error(transparent)]
	Grammar(#[from] GrammarLoadError),

	#[error(transparent)]
	Parser(#[from] ParserInitError),

	/// Not in the configured language set.
	#[error("language not enabled: {0}")]
	Disabled(String),

	/// The initialization task panicked or was cancelled.
	#[error("initialization of {language} aborted: {message}")]
	Aborted { language: String, message: String },
}

/// Shared outcome of a language initialization.
pub type LoadResult = Result<Arc<LoadedLanguage>, Arc<LanguageError>>;

/// A language ready for parsing and classification.
pub struct LoadedLanguage {
	id: String,
	grammar: Arc<Grammar>,
	parser: ParserAsset,
}

impl fmt::Debug for LoadedLanguage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LoadedLanguage")
			.field("id", &self.id)
			.field("parser", &self.parser)
			.finish_non_exhaustive()
	}
}

impl LoadedLanguage {
	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn grammar(&self) -> &Arc<Grammar> {
		&self.grammar
	}

	/// Creates a fresh parser for a document of this language.
	pub fn new_parser(&self) -> Result<Parser, ParserInitError> {
		self.parser.new_parser(&self.id)
	}
}

struct Builtin {
	parser: ParserSource,
	/// Inline rule text; `None` reads the rule file from the runtime directory.
	rules: Option<String>,
}

/// Registry of languages known to the engine.
pub struct LanguageRegistry {
	runtime: PathBuf,
	builtins: FxHashMap<String, Builtin>,
	enabled: RwLock<Vec<String>>,
	slots: Mutex<FxHashMap<String, Arc<OnceCell<LoadResult>>>>,
	initializations: AtomicUsize,
}

impl fmt::Debug for LanguageRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LanguageRegistry")
			.field("runtime", &self.runtime)
			.field("enabled", &*self.enabled.read())
			.finish_non_exhaustive()
	}
}

impl LanguageRegistry {
	pub fn new<I, S>(runtime: impl Into<PathBuf>, enabled: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			runtime: runtime.into(),
			builtins: FxHashMap::default(),
			enabled: RwLock::new(enabled.into_iter().map(Into::into).collect()),
			slots: Mutex::new(FxHashMap::default()),
			initializations: AtomicUsize::new(0),
		}
	}

	/// Registers a parser linked into the binary, with optional inline rules.
	pub fn register_builtin(&mut self, id: impl Into<String>, parser: ParserSource, rules: Option<String>) {
		self.builtins.insert(id.into(), Builtin { parser, rules });
	}

	pub fn runtime(&self) -> &Path {
		&self.runtime
	}

	/// Replaces the configured language set. Already-initialized languages stay cached.
	pub fn set_enabled<I, S>(&self, enabled: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		*self.enabled.write() = enabled.into_iter().map(Into::into).collect();
	}

	pub fn is_enabled(&self, id: &str) -> bool {
		self.enabled.read().iter().any(|l| l == id)
	}

	fn has_grammar(&self, id: &str) -> bool {
		self.builtins.get(id).is_some_and(|b| b.rules.is_some()) || grammar_path(&self.runtime, id).exists()
	}

	fn has_parser(&self, id: &str) -> bool {
		self.builtins.contains_key(id) || parser_library_path(&self.runtime, id).exists()
	}

	/// Languages enabled by configuration that have both a rule file and a parser.
	pub fn available_languages(&self) -> Vec<String> {
		let mut langs: Vec<String> = self
			.enabled
			.read()
			.iter()
			.filter(|id| self.has_grammar(id) && self.has_parser(id))
			.cloned()
			.collect();
		langs.sort();
		langs.dedup();
		langs
	}

	/// Number of initializations actually run (not cache hits).
	pub fn initializations(&self) -> usize {
		self.initializations.load(Ordering::Relaxed)
	}

	fn slot(&self, id: &str) -> Arc<OnceCell<LoadResult>> {
		Arc::clone(self.slots.lock().entry(id.to_string()).or_default())
	}

	/// Returns the cached outcome without starting initialization.
	pub fn get(&self, id: &str) -> Option<LoadResult> {
		self.slots.lock().get(id).and_then(|cell| cell.get().cloned())
	}

	/// Loads a language, sharing one initialization among concurrent callers.
	pub async fn load(self: &Arc<Self>, id: &str) -> LoadResult {
		if !self.is_enabled(id) {
			return Err(Arc::new(LanguageError::Disabled(id.to_string())));
		}

		let cell = self.slot(id);
		cell.get_or_init(|| {
			let this = Arc::clone(self);
			let id = id.to_string();
			async move {
				let task_id = id.clone();
				let result = match tokio::task::spawn_blocking(move || this.initialize(&task_id)).await {
					Ok(result) => result,
					Err(e) => Err(LanguageError::Aborted {
						language: id.clone(),
						message: e.to_string(),
					}),
				};
				match result {
					Ok(lang) => {
						info!(language = %id, "language.ready");
						Ok(Arc::new(lang))
					}
					Err(error) => {
						warn!(language = %id, %error, "language.failed");
						Err(Arc::new(error))
					}
				}
			}
		})
		.await
		.clone()
	}

	fn initialize(&self, id: &str) -> Result<LoadedLanguage, LanguageError> {
		self.initializations.fetch_add(1, Ordering::Relaxed);

		let builtin = self.builtins.get(id);
		let grammar = match builtin.and_then(|b| b.rules.as_deref()) {
			Some(rules) => Grammar::parse(id, rules)?,
			None => Grammar::load(&self.runtime, id)?,
		};
		let parser = match builtin {
			Some(b) => ParserAsset::load(id, &b.parser)?,
			None => ParserAsset::load_from_runtime(&self.runtime, id)?,
		};

		Ok(LoadedLanguage {
			id: id.to_string(),
			grammar: Arc::new(grammar),
			parser,
		})
	}
}
