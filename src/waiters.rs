//! Waiter registry: completion callbacks keyed by opaque ids, drained exactly once per outcome.

// self
use crate::{_prelude::*, auth::Token};

/// Outcome delivered to each waiter: the freshly resolved token, or the terminal error of the
/// cycle/cancellation that resolved it.
pub type TokenOutcome = Result<Token>;

/// Boxed completion callback stored by the registry.
pub type Waiter = Box<dyn FnOnce(TokenOutcome) + Send>;

/// Opaque identifier for a registered waiter, unique per handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaiterId(u64);

type WaiterMap = HashMap<WaiterId, Waiter>;

/// Thread-safe mapping from waiter ids to completion callbacks.
///
/// Reads and writes are mutually exclusive behind one mutex. [`WaiterRegistry::drain`] takes
/// every stored waiter atomically; invoking the drained callbacks happens at the call site,
/// outside the lock, so a callback that re-enters the handler cannot deadlock. An insert racing
/// a drain either joins that drain or waits for the next one, never both.
#[derive(Default)]
pub struct WaiterRegistry {
	waiters: Mutex<WaiterMap>,
	next_id: AtomicU64,
}
impl WaiterRegistry {
	/// Mints a fresh waiter id without storing anything.
	///
	/// Used by the fast path that resolves a callback immediately but still hands back a usable
	/// id for API symmetry.
	pub fn mint_id(&self) -> WaiterId {
		WaiterId(self.next_id.fetch_add(1, Ordering::Relaxed))
	}

	/// Stores a waiter under a freshly minted id.
	pub fn insert(&self, waiter: Waiter) -> WaiterId {
		let id = self.mint_id();

		self.waiters.lock().insert(id, waiter);

		id
	}

	/// Removes the entry if present; silent no-op otherwise. Never invokes the callback.
	pub fn remove(&self, id: WaiterId) {
		self.waiters.lock().remove(&id);
	}

	/// Atomically takes every stored waiter, leaving the registry empty.
	pub fn drain(&self) -> Vec<Waiter> {
		let mut guard = self.waiters.lock();

		guard.drain().map(|(_, waiter)| waiter).collect()
	}

	/// Returns the number of currently registered waiters.
	pub fn len(&self) -> usize {
		self.waiters.lock().len()
	}

	/// Returns `true` when no waiter is registered.
	pub fn is_empty(&self) -> bool {
		self.waiters.lock().is_empty()
	}
}
impl Debug for WaiterRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WaiterRegistry").field("len", &self.len()).finish()
	}
}

/// Invokes every drained waiter with a clone of the outcome.
pub(crate) fn resolve_all(waiters: Vec<Waiter>, outcome: &TokenOutcome) {
	for waiter in waiters {
		waiter(outcome.clone());
	}
}
