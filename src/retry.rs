//! Retry strategy contract and the default exponential backoff implementation.
//!
//! The cycle owns scheduling; the strategy only tracks consecutive failures and computes the
//! next delay. A monotonically non-decreasing backoff is expected but not enforced here.

// self
use crate::_prelude::*;

/// Strategy hook that tracks consecutive failures and computes backoff delays.
///
/// Implementors are required to be `Send + Sync`; the handler calls every method through a
/// shared reference, so state lives behind interior mutability.
pub trait RetryStrategy
where
	Self: Send + Sync,
{
	/// Returns the number of consecutive failures recorded since the last reset.
	fn consecutive_failures(&self) -> u32;

	/// Records one failed provider attempt.
	fn record_failure(&self);

	/// Resets the failure counter; called whenever a cycle concludes for any reason.
	fn reset(&self);

	/// Computes the delay to schedule before the next attempt, based on the failures recorded
	/// so far.
	fn next_delay(&self) -> Duration;
}

/// Doubling backoff with a cap, starting from a base delay.
///
/// With the defaults the delay sequence is 500ms, 1s, 2s, 4s, ... capped at 30s.
#[derive(Debug)]
pub struct ExponentialBackoff {
	base_delay: Duration,
	max_delay: Duration,
	failures: AtomicU32,
}
impl ExponentialBackoff {
	/// Creates a strategy with the provided base and cap.
	pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
		Self { base_delay, max_delay, failures: AtomicU32::new(0) }
	}
}
impl Default for ExponentialBackoff {
	fn default() -> Self {
		Self::new(Duration::from_millis(500), Duration::from_secs(30))
	}
}
impl RetryStrategy for ExponentialBackoff {
	fn consecutive_failures(&self) -> u32 {
		self.failures.load(Ordering::Relaxed)
	}

	fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	fn reset(&self) {
		self.failures.store(0, Ordering::Relaxed);
	}

	fn next_delay(&self) -> Duration {
		let failures = self.consecutive_failures().saturating_sub(1).min(31);
		let scaled = self.base_delay.saturating_mul(1_u32 << failures);

		scaled.min(self.max_delay)
	}
}
