//! The retry/backoff loop driving one refresh cycle.
//!
//! A cycle is a spawned task that sequentially attempts the provider until success, attempt
//! exhaustion, or supersession. It holds the handler state only weakly, so handler teardown
//! ends the loop even while a provider call is still outstanding. The pending backoff delay is
//! the only cancellable step; a dispatched provider call runs to completion and its result is
//! discarded by the snapshot compare in [`conclude`].

// self
use crate::{
	_prelude::*,
	handler::{CycleHandle, HandlerShared},
	obs::{self, EventOutcome, HandlerEvent, HandlerSpan},
	provider::ProviderError,
	waiters::{self, TokenOutcome},
};

pub(super) fn spawn(shared: Weak<HandlerShared>, handle: CycleHandle) {
	tokio::spawn(run(shared, handle));
}

async fn run(shared: Weak<HandlerShared>, handle: CycleHandle) {
	let span = HandlerSpan::new(HandlerEvent::Refresh, "refresh_cycle");

	span.instrument(async move {
		let mut first_attempt = true;
		let mut last_failure: Option<ProviderError> = None;

		loop {
			let Some(strong) = shared.upgrade() else { return };
			let failures = strong.retry.consecutive_failures();

			if failures >= strong.max_refresh_attempts {
				conclude(
					&strong,
					&handle,
					Err(Error::TooManyAttempts { attempts: failures, last: last_failure }),
				);

				return;
			}

			let delay =
				if first_attempt { Duration::ZERO } else { strong.retry.next_delay() };

			first_attempt = false;

			drop(strong);

			if !delay.is_zero() {
				tokio::select! {
					_ = handle.cancel.notified() => return,
					_ = tokio::time::sleep(delay) => {},
				}
			}

			let Some(strong) = shared.upgrade() else { return };

			// The delay may have been outrun by a cancellation that fired between the timer
			// elapsing and this check; a stale cycle must not reach the provider again.
			if !is_current(&strong, &handle) {
				return;
			}

			let provider = strong.provider.read().clone();

			drop(strong);

			match provider.fetch_token().await {
				Ok(token) => {
					let Some(strong) = shared.upgrade() else { return };

					conclude(&strong, &handle, Ok(token));

					return;
				},
				Err(err) => {
					let Some(strong) = shared.upgrade() else { return };

					// Recorded under the flight lock: a supersession resets the counter while
					// holding it, so a stale cycle can never deposit a failure on top of that
					// reset.
					if !record_failure_if_current(&strong, &handle) {
						return;
					}

					last_failure = Some(err);
				},
			}
		}
	})
	.await
}

fn is_current(shared: &HandlerShared, handle: &CycleHandle) -> bool {
	shared.flight.lock().cycle.as_ref().map(|cycle| cycle.id) == Some(handle.id)
}

/// Increments the failure counter only while the cycle still owns the refresh slot, atomically
/// with that ownership check.
fn record_failure_if_current(shared: &HandlerShared, handle: &CycleHandle) -> bool {
	let flight = shared.flight.lock();
	let ours = flight.cycle.as_ref().map(|cycle| cycle.id) == Some(handle.id);

	if ours {
		shared.retry.record_failure();
	}

	ours
}

/// Applies a cycle's terminal outcome, unless the cycle was superseded.
///
/// Under the flight lock the current token is compared with the snapshot taken at cycle start:
/// a mismatch means an external `set_token` settled the waiters mid-cycle and the outcome is
/// discarded wholesale. An accepted provider token equal to the token current at completion is
/// converted into the stale-token failure before it is applied.
fn conclude(shared: &HandlerShared, handle: &CycleHandle, outcome: TokenOutcome) {
	let applied = {
		let mut flight = shared.flight.lock();
		let ours = flight.cycle.as_ref().map(|cycle| cycle.id) == Some(handle.id);

		if !ours || flight.current_token != handle.snapshot {
			if ours {
				flight.cycle = None;
				shared.retry.reset();
			}

			None
		} else {
			let outcome = match outcome {
				Ok(token) if Some(&token) == flight.current_token.as_ref() =>
					Err(Error::stale_token()),
				other => other,
			};

			flight.current_token = outcome.as_ref().ok().cloned();
			flight.cycle = None;
			shared.retry.reset();

			Some((outcome, shared.waiters.drain()))
		}
	};

	match applied {
		Some((outcome, drained)) => {
			match &outcome {
				Ok(_) => {
					shared.metrics.record_success();
					obs::record_handler_event(HandlerEvent::Refresh, EventOutcome::Success);
				},
				Err(_) => {
					shared.metrics.record_failure();
					obs::record_handler_event(HandlerEvent::Refresh, EventOutcome::Failure);
				},
			}

			waiters::resolve_all(drained, &outcome);
		},
		None => {
			shared.metrics.record_supersession();
			obs::record_handler_event(HandlerEvent::Refresh, EventOutcome::Superseded);
		},
	}
}
