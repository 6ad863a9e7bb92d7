//! Scheduler counters.

/// Work performed by the scheduler since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
	/// Rebuild stage firings.
	pub rebuild_passes: u64,
	/// Documents classified across all rebuild passes.
	pub documents_rebuilt: u64,
	/// Refresh stage firings.
	pub refresh_passes: u64,
	/// Editors that received buckets across all refresh passes.
	pub editors_refreshed: u64,
	/// Full and incremental parses.
	pub parses: u64,
	/// Events ignored because their document is not tracked.
	pub stale_events: u64,
}

impl SchedulerStats {
	pub fn new() -> Self {
		Self::default()
	}

	pub(crate) fn record_rebuild(&mut self, documents: usize) {
		self.rebuild_passes += 1;
		self.documents_rebuilt += documents as u64;
	}

	pub(crate) fn record_refresh(&mut self, editors: usize) {
		self.refresh_passes += 1;
		self.editors_refreshed += editors as u64;
	}
}
