//! The highlighting engine context.
//!
//! [`HighlightEngine`] groups the document cache, the language registry and
//! both debounced stages into one explicitly owned value. Handlers are
//! synchronous and take the current [`Instant`], so a host can drive the engine
//! from its own event loop (calling [`HighlightEngine::fire_due`] at
//! [`HighlightEngine::next_deadline`]) or hand it to [`HighlightEngine::run`].
//!
//! Stages:
//! - rebuild: classify every visible document whose annotation cache is stale,
//!   then mark it refresh-pending
//! - refresh: push cached buckets to every visible editor of a refresh-pending
//!   document, then clear all markers
//!
//! Documents whose language is still initializing wait in a loading set with
//! their latest text; they are parsed once [`HighlightEngine::language_ready`]
//! delivers the language.

mod run;
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Instant;

use lsp_types::SemanticToken;
use rustc_hash::{FxHashMap, FxHashSet};
use tinct_config::Config;
use tinct_highlight::{Annotation, Legend};
use tinct_language::{LanguageRegistry, LoadResult, LoadedLanguage, Term};
use tracing::{debug, trace, warn};

use crate::document::{Document, DocumentTreeCache, EditOutcome};
use crate::event::{DocumentId, HostEvent, TextEdit, VisibleEditor};
use crate::render::DecorationSink;
use crate::scheduling::{Stage, StageTimers};
use crate::semantic_tokens::encode_semantic_tokens;
use crate::stats::SchedulerStats;

/// A document waiting for its language to initialize.
#[derive(Debug)]
struct LoadingDocument {
	language: String,
	text: String,
}

pub struct HighlightEngine {
	registry: Arc<LanguageRegistry>,
	legend: Legend,
	enabled_terms: FxHashSet<Term>,
	cache: DocumentTreeCache,
	loading: FxHashMap<DocumentId, LoadingDocument>,
	/// Languages whose initialization has been requested.
	requested: FxHashSet<String>,
	/// Requested languages not yet handed to a loader.
	load_queue: Vec<String>,
	visible: Vec<VisibleEditor>,
	refresh_pending: FxHashSet<DocumentId>,
	timers: StageTimers,
	stats: SchedulerStats,
}

impl HighlightEngine {
	pub fn new(registry: Arc<LanguageRegistry>, config: &Config) -> Self {
		registry.set_enabled(config.languages.iter().cloned());
		Self {
			registry,
			legend: Legend::default(),
			enabled_terms: config.enabled_terms(),
			cache: DocumentTreeCache::new(),
			loading: FxHashMap::default(),
			requested: FxHashSet::default(),
			load_queue: Vec::new(),
			visible: Vec::new(),
			refresh_pending: FxHashSet::default(),
			timers: StageTimers::new(config.debounce),
			stats: SchedulerStats::new(),
		}
	}

	/// Dispatches a host event.
	pub fn handle(&mut self, event: HostEvent, now: Instant) {
		match event {
			HostEvent::Opened { doc, language, text } => self.open(doc, &language, text, now),
			HostEvent::Changed { doc, text, edits } => self.change(&doc, text, &edits, now),
			HostEvent::Closed { doc } => self.close(&doc),
			HostEvent::VisibleEditorsChanged(editors) => self.set_visible_editors(editors, now),
			HostEvent::ConfigChanged(config) => self.set_config(&config, now),
		}
	}

	/// Starts tracking a document. Disabled languages are ignored.
	pub fn open(&mut self, doc: DocumentId, language: &str, text: String, now: Instant) {
		if !self.registry.is_enabled(language) {
			debug!(doc = %doc, language, "document.language.disabled");
			return;
		}
		self.loading.remove(&doc);

		match self.registry.get(language) {
			Some(Ok(lang)) => self.track(doc, lang, text, now),
			Some(Err(_)) => debug!(doc = %doc, language, "document.language.unavailable"),
			None => {
				if self.requested.insert(language.to_string()) {
					self.load_queue.push(language.to_string());
				}
				trace!(doc = %doc, language, "document.loading");
				self.loading.insert(
					doc,
					LoadingDocument {
						language: language.to_string(),
						text,
					},
				);
			}
		}
	}

	fn track(&mut self, doc: DocumentId, lang: Arc<LoadedLanguage>, text: String, now: Instant) {
		let visible = self.is_visible(&doc);
		match self.cache.open(doc.clone(), lang, text) {
			Ok(()) => {
				self.stats.parses += 1;
				if visible {
					self.timers.arm(Stage::Rebuild, now);
				}
			}
			Err(error) => warn!(doc = %doc, %error, "document.open.failed"),
		}
	}

	/// Applies a batch of edits; `text` is the document after the batch.
	pub fn change(&mut self, doc: &DocumentId, text: String, edits: &[TextEdit], now: Instant) {
		if let Some(loading) = self.loading.get_mut(doc) {
			if !edits.is_empty() {
				loading.text = text;
			}
			return;
		}

		match self.cache.edit(doc, text, edits) {
			EditOutcome::Applied => {
				self.stats.parses += 1;
				if self.is_visible(doc) {
					self.timers.arm(Stage::Rebuild, now);
				}
			}
			EditOutcome::Empty => {}
			EditOutcome::Stale => self.stats.stale_events += 1,
		}
	}

	/// Forgets a document, including any pending rebuild or refresh for it.
	pub fn close(&mut self, doc: &DocumentId) {
		let was_loading = self.loading.remove(doc).is_some();
		let was_open = self.cache.close(doc);
		self.refresh_pending.remove(doc);
		if !was_loading && !was_open {
			trace!(doc = %doc, "document.close.stale");
			self.stats.stale_events += 1;
		}
	}

	/// Replaces the set of on-screen editors.
	///
	/// Editors not previously visible mark their document refresh-pending; the
	/// rebuild stage is armed if such a document already has a tree.
	pub fn set_visible_editors(&mut self, editors: Vec<VisibleEditor>, now: Instant) {
		if editors == self.visible {
			return;
		}

		let mut needs_rebuild = false;
		for editor in &editors {
			if self.visible.contains(editor) {
				continue;
			}
			self.refresh_pending.insert(editor.doc.clone());
			needs_rebuild |= self.cache.contains(&editor.doc);
		}
		trace!(editors = editors.len(), "editors.visible");
		self.visible = editors;

		if needs_rebuild {
			self.timers.arm(Stage::Rebuild, now);
		}
		self.timers.arm(Stage::Refresh, now);
	}

	/// Applies a new configuration.
	///
	/// Language changes only affect documents opened afterwards. A change in
	/// the enabled terms refreshes every visible editor.
	pub fn set_config(&mut self, config: &Config, now: Instant) {
		self.registry.set_enabled(config.languages.iter().cloned());
		self.timers.set_delay(config.debounce);

		let terms = config.enabled_terms();
		if terms == self.enabled_terms {
			return;
		}
		self.enabled_terms = terms;
		for editor in &self.visible {
			self.refresh_pending.insert(editor.doc.clone());
		}
		if !self.visible.is_empty() {
			self.timers.arm(Stage::Refresh, now);
		}
	}

	/// Languages the host should initialize and report through
	/// [`language_ready`](Self::language_ready). Each language is returned once.
	pub fn take_load_requests(&mut self) -> Vec<String> {
		std::mem::take(&mut self.load_queue)
	}

	/// Delivers the outcome of a language initialization.
	///
	/// On success every document waiting for it is parsed with its latest text.
	/// On failure they are dropped. A failure the registry cached is terminal;
	/// otherwise the next document of that language requests it again.
	pub fn language_ready(&mut self, language: &str, result: LoadResult, now: Instant) {
		let waiting: Vec<DocumentId> = self
			.loading
			.iter()
			.filter(|(_, l)| l.language == language)
			.map(|(doc, _)| doc.clone())
			.collect();

		match result {
			Ok(lang) => {
				for doc in waiting {
					if let Some(loading) = self.loading.remove(&doc) {
						self.track(doc, Arc::clone(&lang), loading.text, now);
					}
				}
			}
			Err(error) => {
				for doc in &waiting {
					self.loading.remove(doc);
				}
				// uncached failures (language disabled mid-load) may be requested again
				if self.registry.get(language).is_none() {
					self.requested.remove(language);
				}
				debug!(language, %error, dropped = waiting.len(), "language.documents.dropped");
			}
		}
	}

	/// Earliest pending stage deadline.
	pub fn next_deadline(&self) -> Option<Instant> {
		self.timers.next_deadline()
	}

	/// Runs every stage whose deadline has passed, rebuild before refresh.
	pub fn fire_due<S>(&mut self, now: Instant, sink: &mut S)
	where
		S: DecorationSink + ?Sized,
	{
		if self.timers.get_mut(Stage::Rebuild).take_due(now) {
			self.rebuild(now);
		}
		if self.timers.get_mut(Stage::Refresh).take_due(now) {
			self.refresh(sink);
		}
	}

	fn rebuild(&mut self, now: Instant) {
		let mut seen = FxHashSet::default();
		let mut rebuilt = 0;
		for editor in &self.visible {
			let doc = &editor.doc;
			if !seen.insert(doc) || !self.cache.contains(doc) || self.cache.is_fresh(doc) {
				continue;
			}
			self.cache.build(doc, &self.legend);
			self.refresh_pending.insert(doc.clone());
			rebuilt += 1;
		}

		self.stats.record_rebuild(rebuilt);
		debug!(documents = rebuilt, "stage.rebuild");
		if rebuilt > 0 {
			self.timers.arm(Stage::Refresh, now);
		}
	}

	fn refresh<S>(&mut self, sink: &mut S)
	where
		S: DecorationSink + ?Sized,
	{
		let mut refreshed = 0;
		for editor in &self.visible {
			if !self.refresh_pending.contains(&editor.doc) {
				continue;
			}
			let Some(built) = self.cache.get(&editor.doc).and_then(Document::built) else {
				continue;
			};
			sink.apply(editor, &built.buckets.filtered(&self.enabled_terms));
			refreshed += 1;
		}
		self.refresh_pending.clear();

		self.stats.record_refresh(refreshed);
		debug!(editors = refreshed, "stage.refresh");
	}

	/// Enabled-term annotations of `doc`, classifying first if the cache is stale.
	///
	/// Returns `None` for documents without a tree.
	pub fn annotations(&mut self, doc: &DocumentId) -> Option<Vec<Annotation>> {
		let built = self.cache.build(doc, &self.legend)?;
		Some(
			built
				.annotations
				.iter()
				.filter(|a| self.enabled_terms.contains(&a.term))
				.cloned()
				.collect(),
		)
	}

	/// Semantic-token stream for `doc`, as answered to an annotation request.
	pub fn semantic_tokens(&mut self, doc: &DocumentId) -> Option<Vec<SemanticToken>> {
		let annotations = self.annotations(doc)?;
		let text = self.cache.get(doc)?.text();
		Some(encode_semantic_tokens(&annotations, &self.legend, text))
	}

	pub fn registry(&self) -> &Arc<LanguageRegistry> {
		&self.registry
	}

	pub fn legend(&self) -> &Legend {
		&self.legend
	}

	pub fn stats(&self) -> SchedulerStats {
		self.stats
	}

	pub fn cache(&self) -> &DocumentTreeCache {
		&self.cache
	}

	pub fn visible_editors(&self) -> &[VisibleEditor] {
		&self.visible
	}

	pub fn is_visible(&self, doc: &DocumentId) -> bool {
		self.visible.iter().any(|e| &e.doc == doc)
	}

	pub fn is_loading(&self, doc: &DocumentId) -> bool {
		self.loading.contains_key(doc)
	}

	pub fn is_refresh_pending(&self, doc: &DocumentId) -> bool {
		self.refresh_pending.contains(doc)
	}
}
