// self
use crate::_prelude::*;

/// Thread-safe counters for handler refresh outcomes.
#[derive(Debug, Default)]
pub struct HandlerMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
	supersessions: AtomicU64,
}
impl HandlerMetrics {
	/// Returns the number of refresh cycles started.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles that concluded with an accepted token.
	pub fn successes(&self) -> u64 {
		self.successes.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles that concluded with a terminal failure.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns the number of cycle results discarded because an external token superseded them.
	pub fn supersessions(&self) -> u64 {
		self.supersessions.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.successes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_supersession(&self) {
		self.supersessions.fetch_add(1, Ordering::Relaxed);
	}
}
