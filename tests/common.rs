//! Shared fixtures for handler integration tests: a scripted connection provider and small
//! constructors for tokens and handlers.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::Notify;
// self
use token_sentry::{
	auth::{Token, UserId},
	handler::TokenHandler,
	provider::{ConnectionProvider, ProviderError, ProviderFuture},
};

/// Connection provider that replays a scripted sequence of outcomes.
///
/// When gated, every `fetch_token` call waits for one [`MockProvider::release`] before
/// resolving, which lets tests hold a cycle mid-flight while they race `set_token` against it.
pub struct MockProvider {
	bound: Option<UserId>,
	script: Mutex<VecDeque<Result<Token, ProviderError>>>,
	calls: AtomicUsize,
	gate: Option<Arc<Notify>>,
}
impl MockProvider {
	pub fn new(bound: Option<UserId>) -> Self {
		Self { bound, script: Mutex::new(VecDeque::new()), calls: AtomicUsize::new(0), gate: None }
	}

	/// Makes every fetch wait for one [`MockProvider::release`] call before resolving.
	pub fn gated(mut self) -> Self {
		self.gate = Some(Arc::new(Notify::new()));

		self
	}

	/// Appends a successful fetch outcome to the script.
	pub fn succeed_with(self, token: Token) -> Self {
		self.script.lock().push_back(Ok(token));

		self
	}

	/// Appends `count` failing fetch outcomes to the script.
	pub fn fail_times(self, count: usize, message: &str) -> Self {
		{
			let mut script = self.script.lock();

			for _ in 0..count {
				script.push_back(Err(ProviderError::new(message)));
			}
		}

		self
	}

	/// Lets exactly one gated fetch proceed.
	pub fn release(&self) {
		if let Some(gate) = &self.gate {
			gate.notify_one();
		}
	}

	/// Returns how many times `fetch_token` was invoked.
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl ConnectionProvider for MockProvider {
	fn bound_user(&self) -> Option<UserId> {
		self.bound.clone()
	}

	fn fetch_token(&self) -> ProviderFuture<'_> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let outcome = self
			.script
			.lock()
			.pop_front()
			.unwrap_or_else(|| Err(ProviderError::new("mock script exhausted")));
		let gate = self.gate.clone();

		Box::pin(async move {
			if let Some(gate) = gate {
				gate.notified().await;
			}

			outcome
		})
	}
}

pub fn user(value: &str) -> UserId {
	UserId::new(value).expect("User fixture should be valid.")
}

pub fn token(owner: &str, secret: &str) -> Token {
	Token::new(user(owner), secret)
}

pub fn handler_for(provider: MockProvider) -> (TokenHandler, Arc<MockProvider>) {
	let provider = Arc::new(provider);
	let handler = TokenHandler::new(provider.clone());

	(handler, provider)
}

/// Yields until `condition` holds, panicking after a bounded number of scheduler passes.
pub async fn wait_until(condition: impl Fn() -> bool) {
	for _ in 0..1_000 {
		if condition() {
			return;
		}

		tokio::task::yield_now().await;
	}

	panic!("Condition was not reached within the yield budget.");
}
