//! Per-sender single-flight gate.
//!
//! Two transfers from the same sender that read the nonce concurrently can
//! both see the same value. Callers that may run transfers in parallel hold a
//! [`SenderPermit`] around each pipeline invocation so that at most one
//! transfer per sender is in flight. Different senders never wait on each other.

use alloy::primitives::Address;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<Address, Arc<Mutex<()>>>;

/// Hands out at most one permit per sender address at a time.
#[derive(Clone, Default)]
pub struct SenderGate {
    locks: Arc<LockMap>,
}

impl SenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other transfer from `sender` is in flight.
    pub async fn acquire(&self, sender: Address) -> SenderPermit {
        let lock = self.lock_for(sender);
        let guard = lock.lock_owned().await;
        tracing::trace!(sender = %sender, "Sender permit acquired");
        self.permit(sender, guard)
    }

    /// Take the permit only if `sender` is idle.
    pub fn try_acquire(&self, sender: Address) -> Option<SenderPermit> {
        let lock = self.lock_for(sender);
        let guard = lock.try_lock_owned().ok()?;
        Some(self.permit(sender, guard))
    }

    /// Number of senders with a permit held or awaited.
    pub fn active_senders(&self) -> usize {
        self.locks.len()
    }

    fn lock_for(&self, sender: Address) -> Arc<Mutex<()>> {
        self.locks
            .entry(sender)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn permit(&self, sender: Address, guard: OwnedMutexGuard<()>) -> SenderPermit {
        SenderPermit {
            sender,
            guard: Some(guard),
            locks: self.locks.clone(),
        }
    }
}

/// Proof that the holder is the only in-flight transfer for `sender`.
pub struct SenderPermit {
    sender: Address,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl SenderPermit {
    pub fn sender(&self) -> Address {
        self.sender
    }
}

impl Drop for SenderPermit {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Forget the entry unless someone else already holds a handle to it.
        self.locks
            .remove_if(&self.sender, |_, lock| Arc::strong_count(lock) == 1);
    }
}
