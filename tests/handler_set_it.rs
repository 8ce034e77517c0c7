mod common;

// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicUsize, Ordering},
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::oneshot;
// self
use common::{MockProvider, handler_for, token, user};
use token_sentry::{
	error::{Error, InvalidTokenReason},
	waiters::TokenOutcome,
};

#[tokio::test]
async fn set_token_supersedes_an_in_flight_cycle() {
	let provider = MockProvider::new(None).gated().succeed_with(token("user-1", "from-provider"));
	let (handler, provider) = handler_for(provider);
	let (tx, rx) = oneshot::channel();

	handler.refresh_token(move |outcome| {
		let _ = tx.send(outcome);
	});
	common::wait_until(|| provider.calls() == 1).await;

	// The external token resolves the waiter immediately, while the provider call is still
	// outstanding.
	handler.set_token(token("user-1", "injected")).expect("Unbound provider accepts any owner.");

	let resolved = rx
		.await
		.expect("Waiter should resolve via set_token.")
		.expect("set_token resolves waiters with success.");

	assert_eq!(resolved, token("user-1", "injected"));

	// Let the stale cycle finish; its successful result must be discarded wholesale.
	provider.release();
	common::wait_until(|| handler.metrics().supersessions() == 1).await;

	assert_eq!(handler.current_token(), Some(token("user-1", "injected")));
	assert!(!handler.refresh_in_progress());
	assert_eq!(handler.metrics().successes(), 0);
}

#[tokio::test(start_paused = true)]
async fn set_token_cancels_a_pending_backoff_delay() {
	let provider = MockProvider::new(None).fail_times(1, "flaky");
	let (handler, provider) = handler_for(provider);
	let (tx, rx) = oneshot::channel();

	handler.refresh_token(move |outcome| {
		let _ = tx.send(outcome);
	});
	common::wait_until(|| provider.calls() == 1).await;
	handler.set_token(token("user-1", "injected")).expect("Unbound provider accepts any owner.");

	assert_eq!(
		rx.await
			.expect("Waiter should resolve via set_token.")
			.expect("set_token resolves waiters with success."),
		token("user-1", "injected"),
	);

	// Outlive the 500ms backoff by a wide margin: the cancelled cycle must not retry.
	tokio::time::sleep(std::time::Duration::from_secs(5)).await;

	assert_eq!(provider.calls(), 1);
	assert!(!handler.refresh_in_progress());
	assert_eq!(handler.current_token(), Some(token("user-1", "injected")));
}

#[tokio::test]
async fn set_token_rejects_a_wrong_owner_without_touching_state() {
	let provider = MockProvider::new(Some(user("user-a")));
	let (handler, _provider) = handler_for(provider);
	let pending = Arc::new(AtomicBool::new(false));
	let observed = pending.clone();
	let _ = handler.add_token_waiter(move |_| {
		observed.store(true, Ordering::SeqCst);
	});
	let err = handler
		.set_token(token("user-b", "stolen"))
		.expect_err("A token for another identity must be rejected.");

	match err {
		Error::InvalidToken { reason: InvalidTokenReason::WrongOwner { expected, provided } } => {
			assert_eq!(expected, user("user-a"));
			assert_eq!(provided, user("user-b"));
		},
		other => panic!("Expected a wrong-owner rejection, got {other:?}"),
	}

	assert_eq!(handler.current_token(), None);
	assert!(!pending.load(Ordering::SeqCst), "The registry must stay untouched on rejection.");
}

#[tokio::test]
async fn cancel_resolves_every_waiter_once_and_is_idempotent() {
	let (handler, _provider) = handler_for(MockProvider::new(None));
	let resolutions = Arc::new(AtomicUsize::new(0));

	handler.set_token(token("user-1", "valid")).expect("Unbound provider accepts any owner.");

	{
		let resolutions = resolutions.clone();

		// With a cycle in flight, even the refresh waiter ends up cancelled.
		handler.refresh_token(move |outcome| {
			assert!(matches!(outcome, Err(Error::Cancelled { .. })));
			resolutions.fetch_add(1, Ordering::SeqCst);
		});
	}

	for _ in 0..5 {
		let resolutions = resolutions.clone();

		handler.add_token_waiter(move |outcome| {
			match outcome {
				Err(Error::Cancelled { reason }) => assert_eq!(reason, "logout"),
				other => panic!("Expected the cancellation error, got {other:?}"),
			}

			resolutions.fetch_add(1, Ordering::SeqCst);
		});
	}

	handler.cancel_token_waiters(Error::cancelled("logout"));

	// Five explicit waiters plus the one registered by refresh_token.
	assert_eq!(resolutions.load(Ordering::SeqCst), 6);
	assert_eq!(handler.current_token(), None);
	assert!(!handler.refresh_in_progress());

	handler.cancel_token_waiters(Error::cancelled("logout"));

	assert_eq!(resolutions.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn teardown_resolves_pending_waiters_with_handler_destroyed() {
	let (handler, _provider) = handler_for(MockProvider::new(None));
	let outcomes: Arc<Mutex<Vec<TokenOutcome>>> = Arc::new(Mutex::new(Vec::new()));

	for _ in 0..5 {
		let outcomes = outcomes.clone();

		handler.add_token_waiter(move |outcome| {
			outcomes.lock().push(outcome);
		});
	}

	drop(handler);

	let outcomes = outcomes.lock();

	assert_eq!(outcomes.len(), 5);

	for outcome in outcomes.iter() {
		assert!(matches!(outcome, Err(Error::HandlerDestroyed)));
	}
}

#[tokio::test]
async fn removed_waiters_never_observe_a_resolution() {
	let (handler, _provider) = handler_for(MockProvider::new(None));
	let fired = Arc::new(AtomicBool::new(false));
	let observed = fired.clone();
	let id = handler.add_token_waiter(move |_| {
		observed.store(true, Ordering::SeqCst);
	});

	handler.remove_token_waiter(id);
	handler.set_token(token("user-1", "valid")).expect("Unbound provider accepts any owner.");

	assert!(!fired.load(Ordering::SeqCst));
}

#[tokio::test]
async fn async_conveniences_bridge_waiters() {
	let (handler, provider) = handler_for(MockProvider::new(None).succeed_with(token("user-1", "fresh")));
	let fresh = handler.refresh().await.expect("Provider success should reach the awaiter.");

	assert_eq!(fresh, token("user-1", "fresh"));

	// A settled token satisfies `token()` immediately, with no provider traffic.
	let settled = handler.token().await.expect("Settled token should resolve immediately.");

	assert_eq!(settled, fresh);
	assert_eq!(provider.calls(), 1);
}
