//! tinct command-line front end.
//!
//! Classifies a single file the way the engine would and prints the result,
//! one `row:col-row:col term` line per annotation.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use tinct_config::Config;
use tinct_highlight::classify_tree;
use tinct_language::{Grammar, LanguageRegistry};
use tinct_syntax::split_multiline;
use tracing::{debug, info, warn};

/// tinct command line arguments.
#[derive(Parser, Debug)]
#[command(name = "tinct")]
#[command(about = "Semantic syntax highlighting from grammar rule tables")]
struct Args {
	/// Config file (defaults to the user config directory)
	#[arg(short, long, value_name = "PATH", global = true)]
	config: Option<PathBuf>,

	/// Runtime directory holding grammars and parsers
	#[arg(short, long, value_name = "DIR", global = true)]
	runtime: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Classify a file and print its annotations
	Highlight {
		file: PathBuf,

		/// Language identifier; guessed from the extension when omitted
		#[arg(short, long, value_name = "ID")]
		language: Option<String>,

		/// Split multi-line annotations into one range per line
		#[arg(long)]
		split_lines: bool,
	},
	/// Print the derived properties of a grammar rule table
	Grammar { language: String },
	/// List configured languages with a grammar and a parser installed
	Languages,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let mut config = match &args.config {
		Some(path) => Config::load(path)?,
		None => Config::discover()?,
	};
	for warning in &config.warnings {
		warn!(%warning, "config");
	}
	if let Some(runtime) = args.runtime {
		config.runtime = runtime;
	}
	debug!(runtime = %config.runtime.display(), "runtime directory");

	match args.command {
		Command::Highlight {
			file,
			language,
			split_lines,
		} => highlight(&config, &file, language, split_lines).await,
		Command::Grammar { language } => grammar(&config, &language),
		Command::Languages => languages(&config),
	}
}

async fn highlight(config: &Config, file: &Path, language: Option<String>, split_lines: bool) -> anyhow::Result<()> {
	let language = match language {
		Some(id) => id,
		None => language_for_path(file)
			.map(str::to_string)
			.with_context(|| format!("cannot guess the language of {}; pass --language", file.display()))?,
	};
	if !config.is_language_enabled(&language) {
		bail!("language '{language}' is not enabled in the configuration");
	}

	let text = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;

	let registry = Arc::new(LanguageRegistry::new(config.runtime.clone(), config.languages.iter()));
	let loaded = registry.load(&language).await.map_err(|e| anyhow!("loading {language}: {e}"))?;
	info!(language = %language, bytes = text.len(), "parsing");

	let mut parser = loaded.new_parser()?;
	let tree = parser
		.parse(&text, None)
		.with_context(|| format!("parsing {} produced no tree", file.display()))?;

	let enabled = config.enabled_terms();
	let mut annotations = classify_tree(&tree.root_node(), loaded.grammar());
	annotations.retain(|a| enabled.contains(&a.term));
	annotations.sort_by_key(|a| (a.range.start, a.range.end));

	let mut out = io::stdout().lock();
	for annotation in &annotations {
		if split_lines {
			for range in split_multiline(annotation.range, &text) {
				writeln!(out, "{range} {}", annotation.term)?;
			}
		} else {
			writeln!(out, "{annotation}")?;
		}
	}
	Ok(())
}

fn grammar(config: &Config, language: &str) -> anyhow::Result<()> {
	let grammar = Grammar::load(&config.runtime, language)?;
	let mut out = io::stdout().lock();
	writeln!(out, "language:       {}", grammar.language())?;
	writeln!(out, "max_depth:      {}", grammar.max_depth())?;
	writeln!(out, "uses_order:     {}", grammar.uses_order())?;
	writeln!(out, "simple_terms:   {}", grammar.simple_len())?;
	writeln!(out, "complex_terms:  {}", grammar.complex_len())?;
	writeln!(out, "complex_scopes: {}", grammar.scopes_len())?;
	let grammar_terms = grammar.terms();
	let terms: Vec<&str> = grammar_terms.iter().map(|t| t.as_str()).collect();
	writeln!(out, "terms:          {}", terms.join(" "))?;
	Ok(())
}

fn languages(config: &Config) -> anyhow::Result<()> {
	let registry = LanguageRegistry::new(config.runtime.clone(), config.languages.iter());
	let mut out = io::stdout().lock();
	for id in registry.available_languages() {
		writeln!(out, "{id}")?;
	}
	Ok(())
}

fn language_for_path(path: &Path) -> Option<&'static str> {
	let ext = path.extension()?.to_str()?;
	Some(match ext {
		"c" | "h" => "c",
		"cc" | "cpp" | "cxx" | "hh" | "hpp" | "hxx" => "cpp",
		"js" | "mjs" | "cjs" | "jsx" => "javascript",
		"ts" | "mts" | "cts" | "tsx" => "typescript",
		_ => return None,
	})
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("debug")
		} else {
			EnvFilter::new("info")
		}
	});

	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
		.init();
}
