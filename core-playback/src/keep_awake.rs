//! Reference-counted keep-awake wrapper over the platform [`WakeLock`].
//!
//! Several controllers can briefly overlap in `Playing` (the broadcast is
//! advisory), so the platform lock is held while at least one hold exists:
//! acquired on the first hold, released when the last hold goes away.

use bridge_traits::WakeLock;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

struct Inner {
    lock: Arc<dyn WakeLock>,
    holders: Mutex<usize>,
}

/// Shared keep-awake handle. Cloning shares the same counter.
#[derive(Clone)]
pub struct KeepAwake {
    inner: Arc<Inner>,
}

impl KeepAwake {
    pub fn new(lock: Arc<dyn WakeLock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                lock,
                holders: Mutex::new(0),
            }),
        }
    }

    /// Take a hold, acquiring the platform lock on the first one.
    pub fn acquire(&self) -> KeepAwakeHold {
        let mut holders = self.inner.holders.lock();
        *holders += 1;
        if *holders == 1 {
            debug!("Acquiring platform wake lock");
            self.inner.lock.acquire();
        }
        trace!(holders = *holders, "Keep-awake hold taken");
        KeepAwakeHold {
            inner: Some(Arc::clone(&self.inner)),
        }
    }

    pub fn holders(&self) -> usize {
        *self.inner.holders.lock()
    }

    pub fn is_held(&self) -> bool {
        self.holders() > 0
    }
}

impl fmt::Debug for KeepAwake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeepAwake")
            .field("holders", &self.holders())
            .finish()
    }
}

/// One outstanding keep-awake request. Released on [`release`](Self::release)
/// or drop, whichever comes first.
pub struct KeepAwakeHold {
    inner: Option<Arc<Inner>>,
}

impl KeepAwakeHold {
    /// Idempotent.
    pub fn release(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        let mut holders = inner.holders.lock();
        *holders = holders.saturating_sub(1);
        trace!(holders = *holders, "Keep-awake hold released");
        if *holders == 0 {
            debug!("Releasing platform wake lock");
            inner.lock.release();
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }
}

impl Drop for KeepAwakeHold {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for KeepAwakeHold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeepAwakeHold")
            .field("active", &self.is_active())
            .finish()
    }
}
