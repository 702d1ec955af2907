//! Keep-awake for desktop platforms

use bridge_traits::power::WakeLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Desktop wake lock
///
/// Desktop sessions rarely sleep mid-playback, so this only tracks the
/// requested state. Hosts that need a real idle inhibitor implement
/// [`WakeLock`] themselves.
#[derive(Debug, Default)]
pub struct DesktopWakeLock {
    held: AtomicBool,
}

impl DesktopWakeLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl WakeLock for DesktopWakeLock {
    fn acquire(&self) {
        if !self.held.swap(true, Ordering::SeqCst) {
            debug!("Keep-awake acquired");
        }
    }

    fn release(&self) {
        if self.held.swap(false, Ordering::SeqCst) {
            debug!("Keep-awake released");
        }
    }
}
