//! Typed publish/subscribe bus
//!
//! Listeners run synchronously, in registration order, on the publishing
//! thread. The listener list is snapshotted before delivery, so a listener
//! may subscribe or unsubscribe from inside its own call; the change takes
//! effect from the next publish.
//!
//! A listener that returns an error is logged and skipped; the remaining
//! listeners still receive the payload.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{trace, warn};

/// A registered callback
pub type Listener<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

struct BusInner<T> {
    listeners: RwLock<Vec<(u64, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> BusInner<T> {
    fn remove(&self, id: u64) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }
}

/// Publish/subscribe bus for a single payload type
///
/// Cloning yields another handle to the same listener set.
pub struct EventBus<T> {
    inner: Arc<BusInner<T>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// What happened during one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Listeners that returned Ok
    pub delivered: usize,
    /// Listeners that returned an error
    pub failed: usize,
}

impl<T> EventBus<T> {
    /// Create a bus with no listeners
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener
    ///
    /// The returned handle removes exactly this listener. It does not
    /// unsubscribe on drop.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<T>
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener<T> = Arc::new(listener);
        self.inner.listeners.write().push((id, listener));
        trace!(listener = id, "bus listener registered");

        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `payload` to every current listener
    pub fn publish(&self, payload: T) -> PublishReport {
        let snapshot: Vec<(u64, Listener<T>)> = self.inner.listeners.read().clone();
        let mut report = PublishReport::default();

        for (id, listener) in snapshot {
            match listener(&payload) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(listener = id, "bus listener failed: {:#}", e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

/// Handle returned by [`EventBus::subscribe`]
pub struct Subscription<T> {
    id: u64,
    bus: Weak<BusInner<T>>,
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl<T> Subscription<T> {
    /// Remove the listener; returns false if it was already gone
    pub fn unsubscribe(&self) -> bool {
        match self.bus.upgrade() {
            Some(bus) => {
                let removed = bus.remove(self.id);
                if removed {
                    trace!(listener = self.id, "bus listener removed");
                }
                removed
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    type Seen = Arc<Mutex<Vec<(&'static str, u32)>>>;

    fn recorder(bus: &EventBus<u32>, name: &'static str, seen: &Seen) -> Subscription<u32> {
        let seen = seen.clone();
        bus.subscribe(move |value| {
            seen.lock().push((name, *value));
            Ok(())
        })
    }

    #[test]
    fn test_publish_in_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _a = recorder(&bus, "a", &seen);
        let _b = recorder(&bus, "b", &seen);

        let report = bus.publish(7);

        assert_eq!(report, PublishReport { delivered: 2, failed: 0 });
        assert_eq!(*seen.lock(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let a = recorder(&bus, "a", &seen);
        let _b = recorder(&bus, "b", &seen);

        bus.publish(1);
        assert!(a.unsubscribe());
        bus.publish(2);

        assert_eq!(*seen.lock(), vec![("a", 1), ("b", 1), ("b", 2)]);
    }

    #[test]
    fn test_double_unsubscribe() {
        let bus = EventBus::<u32>::new();
        let sub = bus.subscribe(|_| Ok(()));
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_same_closure_registered_twice() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = recorder(&bus, "x", &seen);
        let _second = recorder(&bus, "x", &seen);

        first.unsubscribe();
        bus.publish(3);

        assert_eq!(*seen.lock(), vec![("x", 3)]);
    }

    #[test]
    fn test_unsubscribe_after_bus_dropped() {
        let bus = EventBus::<u32>::new();
        let sub = bus.subscribe(|_| Ok(()));
        drop(bus);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _bad = bus.subscribe(|_: &u32| anyhow::bail!("renderer unavailable"));
        let _good = recorder(&bus, "good", &seen);

        let report = bus.publish(9);

        assert_eq!(report, PublishReport { delivered: 1, failed: 1 });
        assert_eq!(*seen.lock(), vec![("good", 9)]);
    }

    #[test]
    fn test_reentrant_subscribe_applies_to_next_publish() {
        let bus = EventBus::<u32>::new();
        let late_calls = Arc::new(Mutex::new(0));

        let inner_bus = bus.clone();
        let calls = late_calls.clone();
        let _outer = bus.subscribe(move |_| {
            let calls = calls.clone();
            // Handle dropped; the listener stays registered
            let _ = inner_bus.subscribe(move |_| {
                *calls.lock() += 1;
                Ok(())
            });
            Ok(())
        });

        let report = bus.publish(1);
        assert_eq!(report.delivered, 1);
        assert_eq!(*late_calls.lock(), 0);

        bus.publish(2);
        assert_eq!(*late_calls.lock(), 1);
    }

    #[test]
    fn test_listener_can_unsubscribe_itself() {
        let bus = EventBus::<u32>::new();
        let slot: Arc<Mutex<Option<Subscription<u32>>>> = Arc::new(Mutex::new(None));
        let count = Arc::new(Mutex::new(0));

        let slot_in = slot.clone();
        let count_in = count.clone();
        let sub = bus.subscribe(move |_| {
            *count_in.lock() += 1;
            if let Some(sub) = slot_in.lock().as_ref() {
                sub.unsubscribe();
            }
            Ok(())
        });
        *slot.lock() = Some(sub);

        bus.publish(1);
        bus.publish(2);

        assert_eq!(*count.lock(), 1);
        assert_eq!(bus.listener_count(), 0);
    }
}
