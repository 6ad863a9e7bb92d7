use std::time::Duration;

use parking_lot::Mutex;
use tinct_highlight::TermBuckets;
use tinct_language::ParserSource;
use tokio::sync::mpsc;
use tokio::time::sleep;

use super::*;
use crate::event::EditorId;

const JSON_RULES: &str = r#"{
	// keys of objects are variables, other strings are strings
	simpleTerms: {
		"string_content": "string",
		"number": "number",
		"comment": "comment",
		"true": "keyword_constant",
	},
	complexTerms: ["string_content"],
	complexScopes: { "pair > string > string_content": "variable" },
}"#;

fn ms(n: u64) -> Duration {
	Duration::from_millis(n)
}

fn config(languages: &[&str]) -> Config {
	Config {
		languages: languages.iter().map(|s| s.to_string()).collect(),
		debounce: ms(20),
		..Config::default()
	}
}

fn registry() -> Arc<LanguageRegistry> {
	let mut reg = LanguageRegistry::new("/nonexistent", ["json"]);
	reg.register_builtin(
		"json",
		ParserSource::Builtin(tree_sitter_json::LANGUAGE),
		Some(JSON_RULES.to_string()),
	);
	Arc::new(reg)
}

/// Engine whose json language is already initialized.
async fn ready_engine(languages: &[&str]) -> HighlightEngine {
	let reg = registry();
	let engine = HighlightEngine::new(Arc::clone(&reg), &config(languages));
	reg.load("json").await.unwrap();
	engine
}

#[derive(Default)]
struct Recorder {
	calls: Vec<(EditorId, TermBuckets)>,
}

impl DecorationSink for Recorder {
	fn apply(&mut self, editor: &VisibleEditor, buckets: &TermBuckets) {
		self.calls.push((editor.id, buckets.clone()));
	}
}

impl Recorder {
	fn editors(&self) -> Vec<u64> {
		self.calls.iter().map(|(id, _)| id.0).collect()
	}
}

fn ranges(buckets: &TermBuckets, term: &str) -> usize {
	buckets.get(term).map_or(0, <[_]>::len)
}

/// Inserts `s` just before the final byte of `text`.
fn insert_before_end(text: &mut String, s: &str) -> TextEdit {
	let at = text.len() - 1;
	let (next, edit) = TextEdit::apply(text, at..at, s).unwrap();
	*text = next;
	edit
}

#[tokio::test]
async fn test_burst_of_edits_rebuilds_once() {
	let mut engine = ready_engine(&["json"]).await;
	let t0 = Instant::now();
	let doc = DocumentId::from("file:///a.json");
	let mut text = "[1]".to_string();

	engine.open(doc.clone(), "json", text.clone(), t0);
	engine.set_visible_editors(vec![VisibleEditor::new(1, doc.clone())], t0);
	for (i, at) in [2, 7, 12].into_iter().enumerate() {
		let edit = insert_before_end(&mut text, &format!(", {i}"));
		engine.change(&doc, text.clone(), &[edit], t0 + ms(at));
	}
	assert_eq!(text, "[1, 0, 1, 2]");

	let mut sink = Recorder::default();
	engine.fire_due(t0 + ms(20), &mut sink);
	assert_eq!(engine.stats().rebuild_passes, 0);
	assert!(sink.calls.is_empty());

	engine.fire_due(t0 + ms(32), &mut sink);
	assert_eq!(engine.stats().rebuild_passes, 1);
	assert_eq!(engine.stats().documents_rebuilt, 1);
	assert!(engine.is_refresh_pending(&doc));
	assert!(sink.calls.is_empty());

	engine.fire_due(t0 + ms(52), &mut sink);
	assert_eq!(sink.editors(), [1]);
	assert_eq!(ranges(&sink.calls[0].1, "number"), 4);
	assert_eq!(engine.stats().rebuild_passes, 1);
	assert_eq!(engine.stats().parses, 4);
	assert_eq!(engine.next_deadline(), None);
	assert!(!engine.is_refresh_pending(&doc));
}

#[tokio::test]
async fn test_close_mid_pending_rebuild_skips_its_editors() {
	let mut engine = ready_engine(&["json"]).await;
	let t0 = Instant::now();
	let a = DocumentId::from("file:///a.json");
	let b = DocumentId::from("file:///b.json");

	engine.open(a.clone(), "json", "[1]".into(), t0);
	engine.open(b.clone(), "json", "[2]".into(), t0);
	engine.set_visible_editors(
		vec![
			VisibleEditor::new(1, a.clone()),
			VisibleEditor::new(2, a.clone()),
			VisibleEditor::new(3, b.clone()),
		],
		t0,
	);
	let mut text = "[1]".to_string();
	let edit = insert_before_end(&mut text, ", 5");
	engine.change(&a, text, &[edit], t0 + ms(1));
	engine.close(&a);
	assert!(!engine.is_refresh_pending(&a));

	let mut sink = Recorder::default();
	engine.fire_due(t0 + ms(100), &mut sink);
	engine.fire_due(t0 + ms(200), &mut sink);
	assert_eq!(sink.editors(), [3]);
	assert_eq!(engine.stats().documents_rebuilt, 1);
	assert!(!engine.cache().contains(&a));
}

#[tokio::test]
async fn test_newly_visible_editor_gets_cached_buckets() {
	let mut engine = ready_engine(&["json"]).await;
	let t0 = Instant::now();
	let doc = DocumentId::from("file:///a.json");
	let mut sink = Recorder::default();

	engine.open(doc.clone(), "json", r#"{"k": true}"#.into(), t0);
	engine.set_visible_editors(vec![VisibleEditor::new(1, doc.clone())], t0);
	engine.fire_due(t0 + ms(20), &mut sink);
	engine.fire_due(t0 + ms(40), &mut sink);
	assert_eq!(sink.editors(), [1]);

	// same set again is not a change
	engine.set_visible_editors(vec![VisibleEditor::new(1, doc.clone())], t0 + ms(50));
	assert_eq!(engine.next_deadline(), None);

	let both = vec![VisibleEditor::new(1, doc.clone()), VisibleEditor::new(2, doc.clone())];
	engine.set_visible_editors(both, t0 + ms(50));
	assert!(engine.is_refresh_pending(&doc));
	engine.fire_due(t0 + ms(70), &mut sink);
	assert_eq!(sink.editors(), [1, 1, 2]);
	// cache was fresh; no second classification
	assert_eq!(engine.stats().documents_rebuilt, 1);

	let (_, buckets) = &sink.calls[2];
	assert_eq!(ranges(buckets, "variable"), 1);
	assert_eq!(ranges(buckets, "keyword_constant"), 1);
	assert_eq!(buckets.get("function"), Some(&[][..]));
}

#[tokio::test]
async fn test_hidden_document_is_not_rebuilt() {
	let mut engine = ready_engine(&["json"]).await;
	let t0 = Instant::now();
	let doc = DocumentId::from("file:///hidden.json");
	engine.open(doc.clone(), "json", "[1]".into(), t0);
	assert_eq!(engine.next_deadline(), None);

	let mut text = "[1]".to_string();
	let edit = insert_before_end(&mut text, ", 2");
	engine.change(&doc, text, &[edit], t0 + ms(1));
	assert_eq!(engine.next_deadline(), None);
	assert!(!engine.cache().is_fresh(&doc));
}

#[tokio::test]
async fn test_documents_wait_for_their_language() {
	let reg = registry();
	let mut engine = HighlightEngine::new(Arc::clone(&reg), &config(&["json"]));
	let t0 = Instant::now();
	let a = DocumentId::from("file:///a.json");
	let b = DocumentId::from("file:///b.json");

	engine.set_visible_editors(vec![VisibleEditor::new(1, a.clone())], t0);
	engine.open(a.clone(), "json", "[1]".into(), t0);
	engine.open(b.clone(), "json", "{}".into(), t0);
	assert!(engine.is_loading(&a));
	assert!(!engine.cache().contains(&a));

	let mut text = "[1]".to_string();
	let edit = insert_before_end(&mut text, ", 2");
	engine.change(&a, text.clone(), &[edit], t0 + ms(1));

	let requests = engine.take_load_requests();
	assert_eq!(requests, ["json"]);
	assert!(engine.take_load_requests().is_empty());

	let result = reg.load("json").await;
	engine.language_ready("json", result, t0 + ms(5));
	assert!(!engine.is_loading(&a));
	assert!(!engine.is_loading(&b));
	assert_eq!(engine.cache().get(&a).unwrap().text(), text);
	assert_eq!(engine.cache().len(), 2);

	let mut sink = Recorder::default();
	engine.fire_due(t0 + ms(25), &mut sink);
	engine.fire_due(t0 + ms(45), &mut sink);
	assert_eq!(sink.editors(), [1]);
	assert_eq!(ranges(&sink.calls[0].1, "number"), 2);
}

#[tokio::test]
async fn test_failed_language_drops_documents() {
	let reg = registry();
	let mut engine = HighlightEngine::new(Arc::clone(&reg), &config(&["json", "c"]));
	let t0 = Instant::now();
	let doc = DocumentId::from("file:///main.c");

	engine.open(doc.clone(), "c", "int x;".into(), t0);
	assert!(engine.is_loading(&doc));
	assert_eq!(engine.take_load_requests(), ["c"]);

	let result = reg.load("c").await;
	assert!(result.is_err());
	engine.language_ready("c", result, t0);
	assert!(!engine.is_loading(&doc));
	assert!(!engine.cache().contains(&doc));

	// terminal: a later open neither loads nor tracks
	let other = DocumentId::from("file:///other.c");
	engine.open(other.clone(), "c", "int y;".into(), t0);
	assert!(!engine.is_loading(&other));
	assert!(engine.take_load_requests().is_empty());

	// other languages are unaffected
	reg.load("json").await.unwrap();
	let json = DocumentId::from("file:///ok.json");
	engine.open(json.clone(), "json", "[]".into(), t0);
	assert!(engine.cache().contains(&json));
}

#[tokio::test]
async fn test_language_disabled_mid_load_can_be_requested_again() {
	let reg = registry();
	let mut engine = HighlightEngine::new(Arc::clone(&reg), &config(&["json"]));
	let t0 = Instant::now();
	let a = DocumentId::from("file:///a.json");
	let b = DocumentId::from("file:///b.json");

	engine.open(a.clone(), "json", "[1]".into(), t0);
	assert_eq!(engine.take_load_requests(), ["json"]);

	engine.set_config(&config(&[]), t0);
	let result = reg.load("json").await;
	assert!(result.is_err());
	engine.language_ready("json", result, t0);
	assert!(!engine.is_loading(&a));
	assert!(reg.get("json").is_none());

	engine.set_config(&config(&["json"]), t0);
	engine.open(b.clone(), "json", "[2]".into(), t0);
	assert!(engine.is_loading(&b));
	assert_eq!(engine.take_load_requests(), ["json"]);

	let result = reg.load("json").await;
	engine.language_ready("json", result, t0);
	assert!(!engine.is_loading(&b));
	assert!(engine.cache().contains(&b));
}

#[tokio::test]
async fn test_disabled_language_and_stale_events_are_ignored() {
	let mut engine = ready_engine(&["json"]).await;
	let t0 = Instant::now();
	let py = DocumentId::from("file:///x.py");

	engine.open(py.clone(), "python", "x = 1".into(), t0);
	assert!(!engine.is_loading(&py));
	assert!(engine.take_load_requests().is_empty());

	let (text, edit) = TextEdit::apply("x = 1", 4..5, "2").unwrap();
	engine.change(&py, text, &[edit], t0);
	engine.close(&py);
	assert_eq!(engine.stats().stale_events, 2);
	assert_eq!(engine.next_deadline(), None);
}

#[tokio::test]
async fn test_comment_toggle_refreshes_visible_editors() {
	let mut engine = ready_engine(&["json"]).await;
	let t0 = Instant::now();
	let doc = DocumentId::from("file:///c.json");
	let mut sink = Recorder::default();

	engine.open(doc.clone(), "json", "// note\n[1]".into(), t0);
	engine.set_visible_editors(vec![VisibleEditor::new(7, doc.clone())], t0);
	engine.fire_due(t0 + ms(20), &mut sink);
	engine.fire_due(t0 + ms(40), &mut sink);
	assert_eq!(ranges(&sink.calls[0].1, "comment"), 1);

	let mut quiet = config(&["json"]);
	quiet.highlight_comments = false;
	engine.handle(HostEvent::ConfigChanged(Box::new(quiet.clone())), t0 + ms(50));
	engine.fire_due(t0 + ms(70), &mut sink);
	assert_eq!(sink.editors(), [7, 7]);
	assert!(sink.calls[1].1.get("comment").is_none());
	assert_eq!(ranges(&sink.calls[1].1, "number"), 1);

	// unchanged terms do not refresh
	engine.set_config(&quiet, t0 + ms(80));
	assert_eq!(engine.next_deadline(), None);
}

#[tokio::test]
async fn test_annotation_request_builds_on_demand() {
	let mut engine = ready_engine(&["json"]).await;
	let t0 = Instant::now();
	let doc = DocumentId::from("file:///r.json");
	engine.open(doc.clone(), "json", "// c\n{\"k\": 10}".into(), t0);

	let all = engine.annotations(&doc).unwrap();
	let terms: Vec<&str> = all.iter().map(|a| a.term.as_str()).collect();
	assert_eq!(terms, ["comment", "variable", "number"]);
	assert!(engine.cache().is_fresh(&doc));

	let tokens = engine.semantic_tokens(&doc).unwrap();
	assert_eq!(tokens.len(), 3);
	assert_eq!(tokens[1].delta_line, 1);
	assert_eq!(tokens[1].token_type, engine.legend().index_of("variable").unwrap());

	let mut quiet = config(&["json"]);
	quiet.terms = vec![Term::from("number")];
	engine.set_config(&quiet, t0);
	let only = engine.annotations(&doc).unwrap();
	assert_eq!(only.len(), 1);
	assert_eq!(only[0].term.as_str(), "number");

	assert!(engine.annotations(&DocumentId::from("file:///none")).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_debounces_edits() {
	let engine = ready_engine(&["json"]).await;
	let (tx, rx) = mpsc::channel(16);
	let calls = Arc::new(Mutex::new(Vec::new()));
	let sink = {
		let calls = Arc::clone(&calls);
		move |editor: &VisibleEditor, buckets: &TermBuckets| calls.lock().push((editor.id, ranges(buckets, "number")))
	};
	let handle = tokio::spawn(engine.run(rx, sink));

	let doc = DocumentId::from("file:///run.json");
	let mut text = "[1]".to_string();
	tx.send(HostEvent::Opened {
		doc: doc.clone(),
		language: "json".into(),
		text: text.clone(),
	})
	.await
	.unwrap();
	tx.send(HostEvent::VisibleEditorsChanged(vec![VisibleEditor::new(1, doc.clone())]))
		.await
		.unwrap();
	for i in 0..3 {
		let edit = insert_before_end(&mut text, &format!(", {i}"));
		tx.send(HostEvent::Changed {
			doc: doc.clone(),
			text: text.clone(),
			edits: vec![edit],
		})
		.await
		.unwrap();
		sleep(ms(5)).await;
	}

	sleep(ms(500)).await;
	drop(tx);
	let engine = handle.await.unwrap();

	assert_eq!(*calls.lock(), [(EditorId(1), 4)]);
	assert_eq!(engine.stats().rebuild_passes, 1);
	assert_eq!(engine.stats().editors_refreshed, 1);
}

#[tokio::test]
async fn test_run_loop_loads_languages() {
	let reg = registry();
	let engine = HighlightEngine::new(Arc::clone(&reg), &config(&["json"]));
	let (tx, rx) = mpsc::channel(16);
	let calls = Arc::new(Mutex::new(Vec::new()));
	let sink = {
		let calls = Arc::clone(&calls);
		move |editor: &VisibleEditor, _: &TermBuckets| calls.lock().push(editor.id)
	};
	let handle = tokio::spawn(engine.run(rx, sink));

	let doc = DocumentId::from("file:///late.json");
	tx.send(HostEvent::VisibleEditorsChanged(vec![VisibleEditor::new(4, doc.clone())]))
		.await
		.unwrap();
	tx.send(HostEvent::Opened {
		doc,
		language: "json".into(),
		text: "[true]".into(),
	})
	.await
	.unwrap();

	let mut iters = 0;
	while calls.lock().is_empty() && iters < 200 {
		sleep(ms(10)).await;
		iters += 1;
	}
	drop(tx);
	let engine = handle.await.unwrap();

	assert_eq!(*calls.lock(), [EditorId(4)]);
	assert_eq!(reg.initializations(), 1);
	assert_eq!(engine.stats().parses, 1);
}
