//! DB write guard: the handshake between queue processing and auto-lock.
//!
//! Auto-lock can close the vault's underlying storage at any moment; a queue
//! write straddling that teardown could corrupt the vault or drop jobs. The
//! guard arbitrates exactly one writer category (the queue processor) against
//! one closer category (auto-lock):
//!
//! - the processor calls [`acquire`](DbWriteGuard::acquire) /
//!   [`release`](DbWriteGuard::release) around each drain cycle;
//! - auto-lock calls [`wait_for_write_complete`](DbWriteGuard::wait_for_write_complete)
//!   before closing storage and [`clear_lock_request`](DbWriteGuard::clear_lock_request)
//!   once its lock sequence has finished, success or failure.
//!
//! Once a lock has been requested no new write may begin until the request is
//! cleared. The wait is bounded by a timeout so a stuck writer can never
//! block auto-lock indefinitely. This is deliberately not a general mutex:
//! concurrent processor invocations are serialised elsewhere, by the
//! trigger's reentrancy flag.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

/// Default upper bound on how long auto-lock waits for an in-flight write.
pub const DEFAULT_WRITE_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct GuardState {
    write_in_progress: bool,
    lock_requested: bool,
    waiter: Option<oneshot::Sender<()>>,
}

/// Shared write guard instance.
///
/// Owned by the composition root and handed to both the queue processor and
/// the auto-lock component; clones share state.
#[derive(Debug, Clone)]
pub struct DbWriteGuard {
    inner: Arc<GuardInner>,
}

#[derive(Debug)]
struct GuardInner {
    state: Mutex<GuardState>,
    wait_timeout: Duration,
}

impl Default for DbWriteGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl DbWriteGuard {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_WRITE_WAIT_TIMEOUT)
    }

    pub fn with_timeout(wait_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                state: Mutex::new(GuardState::default()),
                wait_timeout,
            }),
        }
    }

    /// Attempt to start a write.
    ///
    /// Returns false iff a lock has been requested; in that case the caller
    /// should skip its cycle and try again on a later trigger.
    pub fn acquire(&self) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        if state.lock_requested {
            return false;
        }
        state.write_in_progress = true;
        true
    }

    /// Finish a write and wake a pending waiter, if any.
    pub fn release(&self) {
        let waiter = {
            let mut state = self.inner.state.lock().unwrap();
            state.write_in_progress = false;
            state.waiter.take()
        };
        if let Some(tx) = waiter {
            let _ = tx.send(());
        }
    }

    /// Called by auto-lock before closing storage.
    ///
    /// Closes the door to new [`acquire`](Self::acquire) calls, then resolves
    /// once no write is in progress - immediately, on
    /// [`release`](Self::release), or after the configured timeout if the
    /// writer is stuck.
    pub async fn wait_for_write_complete(&self) {
        let rx = {
            let mut state = self.inner.state.lock().unwrap();
            state.lock_requested = true;

            if !state.write_in_progress {
                return;
            }

            let (tx, rx) = oneshot::channel();
            state.waiter = Some(tx);
            rx
        };

        if tokio::time::timeout(self.inner.wait_timeout, rx).await.is_err() {
            // Timed out: drop the stale waiter slot so a later release does
            // not resolve against a wait that already gave up.
            self.inner.state.lock().unwrap().waiter = None;
        }
    }

    /// Reopen the door for future writes. Called in auto-lock's cleanup path.
    pub fn clear_lock_request(&self) {
        self.inner.state.lock().unwrap().lock_requested = false;
    }

    /// Whether a write is currently in flight.
    pub fn write_in_progress(&self) -> bool {
        self.inner.state.lock().unwrap().write_in_progress
    }
}
