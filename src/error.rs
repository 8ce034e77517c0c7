//! Handler-level error types shared across the façade, cycle, and waiter registry.
//!
//! Every terminal outcome fans out to all registered waiters, so [`Error`] is `Clone`:
//! provider failures are carried as the message-preserving [`ProviderError`](crate::provider::ProviderError)
//! rather than boxed sources.

// self
use crate::{_prelude::*, auth::UserId, provider::ProviderError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical handler error exposed by public APIs and waiter resolutions.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// A token was rejected before or after a refresh.
	#[error("Token was rejected: {reason}")]
	InvalidToken {
		/// Why the token could not be accepted.
		reason: InvalidTokenReason,
	},
	/// The retry budget for one refresh cycle is exhausted.
	#[error("Token refresh gave up after {attempts} consecutive failures.")]
	TooManyAttempts {
		/// Consecutive provider failures observed when the guard tripped.
		attempts: u32,
		/// Last provider failure of the cycle, when one was observed.
		#[source]
		last: Option<ProviderError>,
	},
	/// The handler was torn down while waiters were still registered.
	#[error("Token handler was destroyed.")]
	HandlerDestroyed,
	/// Waiters were cancelled explicitly by the handler's owner.
	#[error("Token waiters were cancelled: {reason}.")]
	Cancelled {
		/// Owner-supplied reason forwarded to every waiter.
		reason: String,
	},
}
impl Error {
	/// Builds the wrong-owner rejection raised by `set_token`.
	pub fn wrong_owner(expected: UserId, provided: UserId) -> Self {
		Self::InvalidToken { reason: InvalidTokenReason::WrongOwner { expected, provided } }
	}

	/// Builds the stale-token rejection raised when the provider returns the token it was asked
	/// to replace.
	pub fn stale_token() -> Self {
		Self::InvalidToken { reason: InvalidTokenReason::Stale }
	}

	/// Builds an explicit cancellation carrying an owner-supplied reason.
	pub fn cancelled(reason: impl Into<String>) -> Self {
		Self::Cancelled { reason: reason.into() }
	}
}

/// Rejection causes grouped under [`Error::InvalidToken`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum InvalidTokenReason {
	/// The token's owning identity does not match the provider's bound identity.
	#[error("token belongs to `{provided}` but the connection provider is bound to `{expected}`.")]
	WrongOwner {
		/// Identity the current connection provider is bound to.
		expected: UserId,
		/// Owning identity carried by the rejected token.
		provided: UserId,
	},
	/// The provider returned a token equal to the one it was asked to replace; a provider that
	/// never rotates is treated as malfunctioning, not successful.
	#[error("the provider returned the token it was asked to replace.")]
	Stale,
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn too_many_attempts_exposes_last_provider_failure_as_source() {
		let last = ProviderError::new("connection reset");
		let err = Error::TooManyAttempts { attempts: 3, last: Some(last.clone()) };
		let source = StdError::source(&err)
			.expect("Exhaustion should expose the last provider failure as its source.");

		assert_eq!(source.to_string(), last.to_string());
		assert!(err.to_string().contains("3 consecutive failures"));
	}

	#[test]
	fn wrong_owner_message_names_both_identities() {
		let expected = UserId::new("user-a").expect("Identity fixture should be valid.");
		let provided = UserId::new("user-b").expect("Identity fixture should be valid.");
		let err = Error::wrong_owner(expected, provided);

		assert!(err.to_string().contains("user-a"));
		assert!(err.to_string().contains("user-b"));
	}
}
