// Grammar loading runs inside hosts that own stdout/stderr; use tracing only.
#![deny(clippy::print_stderr)]

//! Language assets for the highlighting engine.
//!
//! # Architecture
//!
//! * [`grammar`]: Rule tables mapping node types and scope patterns to terms
//! * [`scope`]: Scope pattern keys (`parent > child[0]`)
//! * [`parser`]: Tree-sitter parser assets, builtin or from shared libraries
//! * [`registry`]: Lazily initialized, per-language cache of grammar + parser
//!
//! A runtime directory holds the on-disk assets:
//!
//! ```text
//! <runtime>/grammars/<language>.json
//! <runtime>/parsers/lib<language>.so
//! ```

pub mod grammar;
pub mod parser;
pub mod registry;
pub mod scope;

pub use grammar::{Grammar, GrammarLoadError, Term, grammar_path, installed_grammars, runtime_dir};
pub use parser::{ParserAsset, ParserInitError, ParserSource, parser_library_path};
pub use registry::{LanguageError, LanguageRegistry, LoadResult, LoadedLanguage};
pub use scope::{OrderQualifier, PatternError, ScopePattern, Segment};
pub use tree_sitter;
