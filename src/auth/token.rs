//! Immutable token model tied to one owning identity.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, UserId},
};

/// Opaque credential bound to exactly one owning identity.
///
/// Tokens are immutable once created and compare by value: the snapshot-compare race resolution
/// in the handler relies on equality meaning "the same credential", nothing weaker. The handler
/// never inspects the secret beyond that.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Identity the credential was minted for.
	pub owner: UserId,
	/// Credential material; callers must avoid logging it.
	pub secret: TokenSecret,
}
impl Token {
	/// Creates a token for the provided owner.
	pub fn new(owner: UserId, secret: impl Into<String>) -> Self {
		Self { owner, secret: TokenSecret::new(secret) }
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token").field("owner", &self.owner).field("secret", &"<redacted>").finish()
	}
}
