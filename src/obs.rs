//! Optional observability helpers for handler events.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `token_sentry.handler` with the `event`
//!   (operation) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `token_sentry_event_total` counter for every
//!   attempt/success/failure/supersession, labeled by `event` + `outcome`.
//!
//! A superseded refresh cycle records the `superseded` outcome here; the handler itself stays
//! silent about discarded results, so this is the one place the race becomes visible.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Handler operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerEvent {
	/// Provider-facing refresh cycle.
	Refresh,
	/// External token injection via `set_token`.
	Set,
	/// Explicit waiter cancellation.
	Cancel,
}
impl HandlerEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			HandlerEvent::Refresh => "refresh",
			HandlerEvent::Set => "set",
			HandlerEvent::Cancel => "cancel",
		}
	}
}
impl Display for HandlerEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventOutcome {
	/// Entry to a handler operation.
	Attempt,
	/// Terminal success applied to the handler state.
	Success,
	/// Terminal failure applied to the handler state.
	Failure,
	/// Cycle result discarded because an external token superseded it.
	Superseded,
}
impl EventOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			EventOutcome::Attempt => "attempt",
			EventOutcome::Success => "success",
			EventOutcome::Failure => "failure",
			EventOutcome::Superseded => "superseded",
		}
	}
}
impl Display for EventOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
