//! Async driver: host events, language loads and stage deadlines on one task.

use std::sync::Arc;
use std::time::Instant;

use tinct_language::{LanguageRegistry, LoadResult};
use tokio::sync::mpsc;

use super::HighlightEngine;
use crate::event::HostEvent;
use crate::render::DecorationSink;

type LoadDone = (String, LoadResult);

impl HighlightEngine {
	/// Processes events until the host side of `events` is dropped.
	///
	/// All engine state is touched from this single task; only language
	/// initialization runs elsewhere and reports back through a channel.
	/// Returns the engine so callers can inspect its final state.
	pub async fn run<S>(mut self, mut events: mpsc::Receiver<HostEvent>, mut sink: S) -> Self
	where
		S: DecorationSink,
	{
		let (load_tx, mut load_rx) = mpsc::unbounded_channel::<LoadDone>();
		loop {
			for language in self.take_load_requests() {
				spawn_load(Arc::clone(&self.registry), language, load_tx.clone());
			}

			let deadline = self.next_deadline();
			tokio::select! {
				event = events.recv() => match event {
					Some(event) => self.handle(event, now()),
					None => break,
				},
				Some((language, result)) = load_rx.recv() => {
					self.language_ready(&language, result, now());
				}
				() = sleep_until(deadline) => self.fire_due(now(), &mut sink),
			}
		}
		tracing::debug!(stats = ?self.stats, "engine.stopped");
		self
	}
}

fn spawn_load(registry: Arc<LanguageRegistry>, language: String, tx: mpsc::UnboundedSender<LoadDone>) {
	tracing::trace!(language = %language, "language.load.spawn");
	tokio::spawn(async move {
		let result = registry.load(&language).await;
		// receiver gone means the engine stopped
		let _ = tx.send((language, result));
	});
}

/// Current time on tokio's clock.
fn now() -> Instant {
	tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
		None => std::future::pending().await,
	}
}
