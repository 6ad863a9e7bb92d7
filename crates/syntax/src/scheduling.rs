//! Single-shot debounce timers for the two scheduler stages.

use std::fmt;
use std::time::{Duration, Instant};

/// The two debounced units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Re-classify visible documents whose annotation cache is stale.
	Rebuild,
	/// Push cached buckets to editors of refresh-pending documents.
	Refresh,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Rebuild => "rebuild",
			Self::Refresh => "refresh",
		})
	}
}

/// A cancellable single-shot deadline.
///
/// Re-arming replaces the pending deadline, so at most one firing is ever
/// scheduled per timer.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
	delay: Duration,
	deadline: Option<Instant>,
}

impl DebounceTimer {
	pub fn new(delay: Duration) -> Self {
		Self { delay, deadline: None }
	}

	pub fn delay(&self) -> Duration {
		self.delay
	}

	/// Changes the delay for future arms; a pending deadline is kept.
	pub fn set_delay(&mut self, delay: Duration) {
		self.delay = delay;
	}

	/// Schedules a firing `delay` after `now`, cancelling any pending one.
	pub fn arm(&mut self, now: Instant) {
		self.deadline = Some(now + self.delay);
	}

	pub fn cancel(&mut self) {
		self.deadline = None;
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	#[inline]
	pub fn is_armed(&self) -> bool {
		self.deadline.is_some()
	}

	/// Returns true if the deadline has passed.
	#[inline]
	pub fn is_due(&self, now: Instant) -> bool {
		self.deadline.is_some_and(|d| now >= d)
	}

	/// Disarms and returns true if due; otherwise leaves the timer untouched.
	pub fn take_due(&mut self, now: Instant) -> bool {
		if self.is_due(now) {
			self.deadline = None;
			true
		} else {
			false
		}
	}
}

/// Rebuild and refresh timers sharing one delay.
#[derive(Debug, Clone)]
pub struct StageTimers {
	rebuild: DebounceTimer,
	refresh: DebounceTimer,
}

impl StageTimers {
	pub fn new(delay: Duration) -> Self {
		Self {
			rebuild: DebounceTimer::new(delay),
			refresh: DebounceTimer::new(delay),
		}
	}

	pub fn get(&self, stage: Stage) -> &DebounceTimer {
		match stage {
			Stage::Rebuild => &self.rebuild,
			Stage::Refresh => &self.refresh,
		}
	}

	pub fn get_mut(&mut self, stage: Stage) -> &mut DebounceTimer {
		match stage {
			Stage::Rebuild => &mut self.rebuild,
			Stage::Refresh => &mut self.refresh,
		}
	}

	pub fn arm(&mut self, stage: Stage, now: Instant) {
		tracing::trace!(%stage, "stage.armed");
		self.get_mut(stage).arm(now);
	}

	pub fn set_delay(&mut self, delay: Duration) {
		self.rebuild.set_delay(delay);
		self.refresh.set_delay(delay);
	}

	/// Earliest pending deadline across both stages.
	pub fn next_deadline(&self) -> Option<Instant> {
		match (self.rebuild.deadline(), self.refresh.deadline()) {
			(Some(a), Some(b)) => Some(a.min(b)),
			(a, b) => a.or(b),
		}
	}
}
