//! Connection provider contract consumed by the refresh cycle.
//!
//! The provider is the opaque remote call that actually mints a token. The handler holds it as a
//! swappable `Arc<dyn ConnectionProvider>`; swapping it (for example when the active user
//! changes) does not cancel an in-flight cycle; the cycle's conclusion races against whatever
//! token is then current.

// self
use crate::{
	_prelude::*,
	auth::{Token, UserId},
};

/// Boxed future returned by [`ConnectionProvider::fetch_token`].
pub type ProviderFuture<'a> = Pin<Box<dyn Future<Output = Result<Token, ProviderError>> + 'a + Send>>;

/// Remote token source contract.
///
/// There is no cancellation hook: a fetch already dispatched runs to completion and the handler
/// discards its result when the cycle was superseded.
pub trait ConnectionProvider
where
	Self: Send + Sync,
{
	/// Returns the identity this provider is currently bound to, if any.
	///
	/// `set_token` rejects tokens owned by anyone else; an unbound provider accepts every owner.
	fn bound_user(&self) -> Option<UserId>;

	/// Fetches a fresh token from the remote service.
	fn fetch_token(&self) -> ProviderFuture<'_>;
}

/// Cloneable provider failure carried through retry attempts.
///
/// Terminal exhaustion fans the last failure out to every waiter, so the payload is a plain
/// message rather than a boxed source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("Connection provider failed: {message}.")]
pub struct ProviderError {
	/// Human-readable failure payload.
	pub message: String,
}
impl ProviderError {
	/// Creates a provider failure from any displayable payload.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}
