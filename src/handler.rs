//! Token handler façade: single-flight refresh coordination, waiter resolution, and the
//! deterministic race between refresh cycles and externally supplied tokens.
//!
//! [`TokenHandler`] exposes `set_token`/`refresh_token`/`add_token_waiter`/`remove_token_waiter`/
//! `cancel_token_waiters` over one mutex-guarded flight state. A refresh cycle exists exactly
//! while the flight state's cycle slot is occupied; the slot is test-and-set under the lock, so N
//! concurrent `refresh_token` calls collapse into a single provider-facing loop. `set_token` is
//! the fast path: it applies immediately, cancels a pending backoff delay, and leaves any
//! dispatched provider call to be discarded by the cycle's snapshot compare.

mod cycle;
mod metrics;

pub use metrics::HandlerMetrics;

// crates.io
use tokio::sync::{Notify, oneshot};
// self
use crate::{
	_prelude::*,
	auth::Token,
	obs::{self, EventOutcome, HandlerEvent, HandlerSpan},
	provider::ConnectionProvider,
	retry::{ExponentialBackoff, RetryStrategy},
	waiters::{self, TokenOutcome, WaiterId, WaiterRegistry},
};

/// Composes the waiter registry, single-flight coordinator, and retry loop around one current
/// token.
///
/// The handler is cheap to clone; clones share state. Refresh cycles run as spawned Tokio tasks,
/// so every operation that can start one must be called from within a Tokio runtime. When the
/// last clone drops, all still-registered waiters resolve with
/// [`Error::HandlerDestroyed`](crate::error::Error::HandlerDestroyed).
#[derive(Clone)]
pub struct TokenHandler {
	shared: Arc<HandlerShared>,
}
impl TokenHandler {
	/// Attempt budget applied when the builder does not override it.
	pub const DEFAULT_MAX_REFRESH_ATTEMPTS: u32 = 5;

	/// Returns a builder for the provided connection provider.
	pub fn builder(provider: Arc<dyn ConnectionProvider>) -> TokenHandlerBuilder {
		TokenHandlerBuilder::new(provider)
	}

	/// Creates a handler with the default retry strategy and attempt budget.
	pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
		Self::builder(provider).build()
	}

	/// Returns a copy of the current token, if one is held.
	pub fn current_token(&self) -> Option<Token> {
		self.shared.flight.lock().current_token.clone()
	}

	/// Returns `true` while a refresh cycle is in flight.
	pub fn refresh_in_progress(&self) -> bool {
		self.shared.flight.lock().cycle.is_some()
	}

	/// Returns the shared event counters.
	pub fn metrics(&self) -> &HandlerMetrics {
		&self.shared.metrics
	}

	/// Swaps the connection provider, e.g. when the active user changes.
	///
	/// An in-flight cycle is not cancelled; when it concludes, its result races against whatever
	/// token is then current.
	pub fn set_connection_provider(&self, provider: Arc<dyn ConnectionProvider>) {
		*self.shared.provider.write() = provider;
	}

	/// Registers a completion callback for the next token resolution.
	///
	/// Fast path: when a token is held and no refresh is in flight, the callback fires
	/// immediately with that token and nothing is stored; the returned id is still usable with
	/// [`TokenHandler::remove_token_waiter`] for API symmetry. Adding a waiter never triggers a
	/// provider call.
	pub fn add_token_waiter(
		&self,
		callback: impl FnOnce(TokenOutcome) + Send + 'static,
	) -> WaiterId {
		let flight = self.shared.flight.lock();
		let settled = if flight.cycle.is_none() { flight.current_token.clone() } else { None };
		// Registration happens under the flight lock; a concluding cycle drains the registry
		// under the same lock, so a waiter that observed the cycle always joins its drain.
		let Some(token) = settled else {
			return self.shared.waiters.insert(Box::new(callback));
		};
		let id = self.shared.waiters.mint_id();

		drop(flight);
		callback(Ok(token));

		id
	}

	/// Removes a registered waiter; its callback will never be invoked by a later resolution.
	///
	/// Silent no-op when the id is unknown or already resolved.
	pub fn remove_token_waiter(&self, id: WaiterId) {
		self.shared.waiters.remove(id);
	}

	/// Registers `callback` as a waiter and starts a refresh cycle unless one is already
	/// running.
	///
	/// Both the test-and-set of the in-progress flag and the waiter registration happen inside
	/// one flight-lock critical section. A concluding cycle drains the registry under the same
	/// lock, so a joiner either lands in that drain or observes the slot already empty and
	/// starts the next cycle itself; no callback can slip between a conclusion and its drain.
	pub fn refresh_token(&self, callback: impl FnOnce(TokenOutcome) + Send + 'static) -> WaiterId {
		let (id, started) = {
			let mut flight = self.shared.flight.lock();
			let started = if flight.cycle.is_some() {
				None
			} else {
				let handle = CycleHandle {
					id: self.shared.cycle_seq.fetch_add(1, Ordering::Relaxed),
					snapshot: flight.current_token.clone(),
					cancel: Arc::new(Notify::new()),
				};

				flight.cycle = Some(handle.clone());

				Some(handle)
			};

			(self.shared.waiters.insert(Box::new(callback)), started)
		};

		if let Some(handle) = started {
			self.shared.metrics.record_attempt();
			obs::record_handler_event(HandlerEvent::Refresh, EventOutcome::Attempt);
			cycle::spawn(Arc::downgrade(&self.shared), handle);
		}

		id
	}

	/// Installs an externally supplied token, superseding any in-flight refresh cycle.
	///
	/// Fails with the wrong-owner [`Error::InvalidToken`](crate::error::Error::InvalidToken)
	/// when the provider is bound to a different identity; neither the current token nor the
	/// registry is touched in that case. Otherwise the token becomes current, the failure
	/// counter resets, a pending backoff delay is cancelled, and every waiter resolves with the
	/// token.
	pub fn set_token(&self, token: Token) -> Result<()> {
		let _span = HandlerSpan::new(HandlerEvent::Set, "set_token").entered();

		if let Some(bound) = self.shared.provider.read().bound_user()
			&& bound != token.owner
		{
			obs::record_handler_event(HandlerEvent::Set, EventOutcome::Failure);

			return Err(Error::wrong_owner(bound, token.owner));
		}

		self.shared.apply_terminal(Ok(token));
		obs::record_handler_event(HandlerEvent::Set, EventOutcome::Success);

		Ok(())
	}

	/// Resolves every registered waiter with `error` and drops the current token.
	///
	/// Also cancels a pending backoff delay and clears the in-progress flag. Idempotent:
	/// calling it with an empty registry resolves zero callbacks.
	pub fn cancel_token_waiters(&self, error: Error) {
		let _span = HandlerSpan::new(HandlerEvent::Cancel, "cancel_waiters").entered();

		self.shared.apply_terminal(Err(error));
		obs::record_handler_event(HandlerEvent::Cancel, EventOutcome::Success);
	}

	/// Awaits the next token resolution.
	///
	/// Resolves immediately when a token is held and no refresh is in flight; never triggers a
	/// provider call by itself.
	pub async fn token(&self) -> TokenOutcome {
		let (tx, rx) = oneshot::channel();
		let _ = self.add_token_waiter(move |outcome| {
			let _ = tx.send(outcome);
		});

		rx.await.unwrap_or(Err(Error::HandlerDestroyed))
	}

	/// Requests a refresh (joining an in-flight cycle when one exists) and awaits its outcome.
	pub async fn refresh(&self) -> TokenOutcome {
		let (tx, rx) = oneshot::channel();
		let _ = self.refresh_token(move |outcome| {
			let _ = tx.send(outcome);
		});

		rx.await.unwrap_or(Err(Error::HandlerDestroyed))
	}
}
impl Debug for TokenHandler {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let flight = self.shared.flight.lock();

		f.debug_struct("TokenHandler")
			.field("token_held", &flight.current_token.is_some())
			.field("refresh_in_progress", &flight.cycle.is_some())
			.field("pending_waiters", &self.shared.waiters.len())
			.finish()
	}
}

/// Builder for [`TokenHandler`].
pub struct TokenHandlerBuilder {
	provider: Arc<dyn ConnectionProvider>,
	retry: Option<Arc<dyn RetryStrategy>>,
	max_refresh_attempts: u32,
}
impl TokenHandlerBuilder {
	fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
		Self {
			provider,
			retry: None,
			max_refresh_attempts: TokenHandler::DEFAULT_MAX_REFRESH_ATTEMPTS,
		}
	}

	/// Sets or replaces the retry strategy consulted by refresh cycles.
	pub fn retry_strategy(mut self, strategy: Arc<dyn RetryStrategy>) -> Self {
		self.retry = Some(strategy);

		self
	}

	/// Overrides the per-cycle attempt budget.
	pub fn max_refresh_attempts(mut self, attempts: u32) -> Self {
		self.max_refresh_attempts = attempts;

		self
	}

	/// Consumes the builder and produces a [`TokenHandler`].
	pub fn build(self) -> TokenHandler {
		TokenHandler {
			shared: Arc::new(HandlerShared {
				flight: Mutex::new(FlightState { current_token: None, cycle: None }),
				waiters: WaiterRegistry::default(),
				provider: RwLock::new(self.provider),
				retry: self.retry.unwrap_or_else(|| Arc::new(ExponentialBackoff::default())),
				max_refresh_attempts: self.max_refresh_attempts,
				metrics: HandlerMetrics::default(),
				cycle_seq: AtomicU64::new(0),
			}),
		}
	}
}

/// State shared between handler clones and spawned cycle tasks.
///
/// Cycle tasks hold this only weakly; teardown therefore happens as soon as the last handler
/// clone drops, regardless of a provider call still running.
pub(crate) struct HandlerShared {
	pub(crate) flight: Mutex<FlightState>,
	pub(crate) waiters: WaiterRegistry,
	pub(crate) provider: RwLock<Arc<dyn ConnectionProvider>>,
	pub(crate) retry: Arc<dyn RetryStrategy>,
	pub(crate) max_refresh_attempts: u32,
	pub(crate) metrics: HandlerMetrics,
	cycle_seq: AtomicU64,
}
impl HandlerShared {
	/// Applies a terminal outcome that did not come from a cycle (`set_token`, cancellation):
	/// installs or clears the token, resets the failure counter, cancels a pending delay,
	/// clears the in-progress flag, and resolves every waiter.
	fn apply_terminal(&self, outcome: TokenOutcome) {
		let drained = {
			let mut flight = self.flight.lock();

			if let Some(cycle) = flight.cycle.take() {
				cycle.cancel.notify_one();
			}

			flight.current_token = outcome.as_ref().ok().cloned();
			self.retry.reset();

			self.waiters.drain()
		};

		waiters::resolve_all(drained, &outcome);
	}
}
impl Drop for HandlerShared {
	fn drop(&mut self) {
		if let Some(cycle) = self.flight.get_mut().cycle.take() {
			cycle.cancel.notify_one();
		}

		waiters::resolve_all(self.waiters.drain(), &Err(Error::HandlerDestroyed));
	}
}

/// Current token plus the occupancy of the refresh slot; the slot doubles as the "a refresh is
/// running" flag.
pub(crate) struct FlightState {
	pub(crate) current_token: Option<Token>,
	pub(crate) cycle: Option<CycleHandle>,
}

/// Identity of one refresh cycle: its sequence id, the token snapshot taken at cycle start, and
/// the cancellation signal for its pending backoff delay.
#[derive(Clone)]
pub(crate) struct CycleHandle {
	pub(crate) id: u64,
	pub(crate) snapshot: Option<Token>,
	pub(crate) cancel: Arc<Notify>,
}
