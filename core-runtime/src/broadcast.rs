//! # Playback Broadcast
//!
//! Process-wide, single-topic publish/subscribe channel carrying one signal:
//! "something else is about to play".
//!
//! ## Overview
//!
//! Every audio attachment in the message list is independent; there is no
//! registry owning them all. Mutual exclusion comes from this channel alone:
//!
//! ```text
//! ┌──────────────┐  publish()   ┌──────────────────┐   listener()   ┌──────────────┐
//! │ Controller B ├─────────────>│ PlaybackBroadcast├───────────────>│ Controller A │
//! │ (starting)   │              │  (listener list) │                │ (playing)    │
//! └──────────────┘              └──────────────────┘                └──────────────┘
//! ```
//!
//! A controller publishes right before it starts playing and subscribes only
//! while it is playing, so at any time the listener list holds at most the
//! currently playing controllers. Delivery is synchronous, in subscription
//! order, on the publisher's thread.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::broadcast::PlaybackBroadcast;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let broadcast = PlaybackBroadcast::new();
//! let paused = Arc::new(AtomicUsize::new(0));
//!
//! let counter = Arc::clone(&paused);
//! let handle = broadcast.subscribe(move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! assert_eq!(broadcast.publish(), 1);
//! assert!(broadcast.unsubscribe(handle));
//! assert!(!broadcast.unsubscribe(handle)); // idempotent
//! assert_eq!(broadcast.publish(), 0);
//! assert_eq!(paused.load(Ordering::SeqCst), 1);
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::trace;

/// Default initial capacity of the listener list.
pub const DEFAULT_LISTENER_CAPACITY: usize = 4;

/// Callback invoked on every publish while subscribed.
pub type BroadcastListener = Arc<dyn Fn() + Send + Sync>;

/// Identifies one subscription on one [`PlaybackBroadcast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

struct Registry {
    next_id: u64,
    listeners: Vec<(u64, BroadcastListener)>,
}

/// Single-topic signal channel. Cloning shares the same listener list.
#[derive(Clone)]
pub struct PlaybackBroadcast {
    registry: Arc<Mutex<Registry>>,
}

static GLOBAL: OnceLock<PlaybackBroadcast> = OnceLock::new();

impl PlaybackBroadcast {
    /// Creates an isolated broadcast channel.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LISTENER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::with_capacity(capacity),
            })),
        }
    }

    /// The process-wide channel shared by every attachment in the app.
    pub fn global() -> &'static PlaybackBroadcast {
        GLOBAL.get_or_init(PlaybackBroadcast::new)
    }

    /// Notifies every current listener, in subscription order.
    ///
    /// Returns the number of listeners notified. Listeners run after the
    /// internal lock is released, so they may subscribe or unsubscribe.
    pub fn publish(&self) -> usize {
        let snapshot: Vec<BroadcastListener> = self
            .registry
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        trace!(listeners = snapshot.len(), "Publishing playback broadcast");

        for listener in &snapshot {
            listener();
        }
        snapshot.len()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));
        SubscriptionHandle(id)
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(id, _)| *id != handle.0);
        registry.listeners.len() != before
    }

    /// Subscribes and returns a guard that unsubscribes when dropped.
    pub fn subscribe_scoped<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = self.subscribe(listener);
        Subscription {
            broadcast: self.clone(),
            handle: Some(handle),
        }
    }

    pub fn is_subscribed(&self, handle: SubscriptionHandle) -> bool {
        self.registry
            .lock()
            .listeners
            .iter()
            .any(|(id, _)| *id == handle.0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }
}

impl Default for PlaybackBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PlaybackBroadcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackBroadcast")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Scoped subscription: released on [`unsubscribe`](Self::unsubscribe) or drop.
pub struct Subscription {
    broadcast: PlaybackBroadcast,
    handle: Option<SubscriptionHandle>,
}

impl Subscription {
    /// `None` once released.
    pub fn handle(&self) -> Option<SubscriptionHandle> {
        self.handle
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.broadcast.unsubscribe(handle);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener(counter: &Arc<AtomicUsize>) -> impl Fn() + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let broadcast = PlaybackBroadcast::new();
        assert_eq!(broadcast.subscriber_count(), 0);
        assert_eq!(broadcast.publish(), 0);
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let broadcast = PlaybackBroadcast::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        broadcast.subscribe(counting_listener(&a));
        broadcast.subscribe(counting_listener(&b));

        assert_eq!(broadcast.publish(), 2);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let broadcast = PlaybackBroadcast::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            broadcast.subscribe(move || order.lock().push(name));
        }

        broadcast.publish();
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let broadcast = PlaybackBroadcast::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = broadcast.subscribe(counting_listener(&counter));

        assert!(broadcast.is_subscribed(handle));
        assert!(broadcast.unsubscribe(handle));
        assert!(!broadcast.unsubscribe(handle));
        assert!(!broadcast.is_subscribed(handle));

        broadcast.publish();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_scoped_subscription_released_on_drop() {
        let broadcast = PlaybackBroadcast::new();
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let subscription = broadcast.subscribe_scoped(counting_listener(&counter));
            assert!(subscription.is_active());
            assert_eq!(broadcast.subscriber_count(), 1);
        }
        assert_eq!(broadcast.subscriber_count(), 0);
        assert_eq!(broadcast.publish(), 0);
    }

    #[test]
    fn test_scoped_unsubscribe_then_drop() {
        let broadcast = PlaybackBroadcast::new();
        let mut subscription = broadcast.subscribe_scoped(|| {});
        let other = broadcast.subscribe(|| {});

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());
        drop(subscription);

        // The unrelated subscription survives.
        assert!(broadcast.is_subscribed(other));
        assert_eq!(broadcast.subscriber_count(), 1);
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let broadcast = PlaybackBroadcast::new();
        let slot: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));

        let inner_broadcast = broadcast.clone();
        let inner_slot = Arc::clone(&slot);
        let handle = broadcast.subscribe(move || {
            if let Some(handle) = inner_slot.lock().take() {
                inner_broadcast.unsubscribe(handle);
            }
        });
        *slot.lock() = Some(handle);

        assert_eq!(broadcast.publish(), 1);
        assert_eq!(broadcast.subscriber_count(), 0);
    }

    #[test]
    fn test_clones_share_listeners() {
        let broadcast = PlaybackBroadcast::new();
        let clone = broadcast.clone();
        let counter = Arc::new(AtomicUsize::new(0));
        clone.subscribe(counting_listener(&counter));

        assert_eq!(broadcast.publish(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_global_is_shared() {
        let a = PlaybackBroadcast::global();
        let b = PlaybackBroadcast::global();
        assert!(Arc::ptr_eq(&a.registry, &b.registry));
    }
}
