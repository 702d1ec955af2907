//! Keep-awake abstraction.

/// Process-wide primitive that keeps the device from sleeping while held.
///
/// Both calls are synchronous and must be idempotent: `release` without a
/// prior `acquire` is a no-op, as is a second `acquire` while held.
///
/// # Platform Support
///
/// - **iOS**: `UIApplication.isIdleTimerDisabled`
/// - **Android**: `FLAG_KEEP_SCREEN_ON` / `PowerManager.WakeLock`
/// - **Desktop**: screensaver/idle inhibitors
pub trait WakeLock: Send + Sync {
    fn acquire(&self);

    fn release(&self);
}
