//! Single-flight token lifecycle handler: collapse concurrent refreshes into one cycle, resolve
//! waiter queues exactly once, and settle races with externally supplied tokens deterministically.
//!
//! The crate centers on [`handler::TokenHandler`], a façade over three cooperating pieces:
//!
//! - a waiter registry ([`waiters`]) that stores completion callbacks keyed by opaque ids and
//!   drains them exactly once per terminal outcome,
//! - a single-flight coordinator that test-and-sets an in-progress flag so any number of
//!   concurrent refresh requests collapse into one provider-facing cycle, and
//! - a retry/backoff loop that drives the external [`provider::ConnectionProvider`] until
//!   success, attempt exhaustion, or supersession by an externally injected token.
//!
//! Supersession is resolved with a snapshot compare rather than hard cancellation: a cycle
//! records the current token at start, and a conclusion that no longer matches the live token is
//! discarded wholesale because [`handler::TokenHandler::set_token`] already resolved the waiters.
//! The only cancellable unit of work is a pending backoff delay.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod handler;
pub mod obs;
pub mod provider;
pub mod retry;
pub mod waiters;

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::{
			Arc, Weak,
			atomic::{AtomicU32, AtomicU64, Ordering},
		},
		time::Duration,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;

	pub use crate::error::{Error, Result};
}

#[cfg(test)] use serde_json as _;
