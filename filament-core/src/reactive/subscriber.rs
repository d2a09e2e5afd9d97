//! Subscriber identity and subscription handles.
//!
//! Every observer registered on a source gets a [`SubscriberId`]. The
//! registration is represented by a [`Subscription`], which is the only way
//! to take the observer back out again.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Each observer registered on a signal, live value or adapter gets a unique
/// ID. Sources key their observer tables by it so that unsubscribing is O(1)
/// and never confuses two identical closures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A live registration of an observer on a source.
///
/// Calling [`Subscription::unsubscribe`] detaches the observer. It is
/// idempotent: the detach closure runs at most once.
///
/// Dropping a subscription does *not* unsubscribe. Bindings hand their
/// subscriptions to a [`Teardown`](crate::Teardown), which owns the decision
/// of when to release them.
pub struct Subscription {
    id: SubscriberId,
    detach: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    /// Create a subscription that runs `detach` on first unsubscribe.
    pub fn new<F>(id: SubscriberId, detach: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            id,
            detach: RefCell::new(Some(Box::new(detach))),
        }
    }

    /// A subscription with nothing to release.
    ///
    /// Returned by completed sources.
    pub fn empty() -> Self {
        Self {
            id: SubscriberId::new(),
            detach: RefCell::new(None),
        }
    }

    /// Get the ID of the observer this subscription registered.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Detach the observer from its source.
    pub fn unsubscribe(&self) {
        // Take first so a re-entrant unsubscribe sees `None`.
        let detach = self.detach.borrow_mut().take();
        if let Some(detach) = detach {
            detach();
        }
    }

    /// Whether the observer is still attached.
    pub fn is_active(&self) -> bool {
        self.detach.borrow().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn unsubscribe_runs_detach_once() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();

        let subscription = Subscription::new(SubscriberId::new(), move || {
            calls_clone.set(calls_clone.get() + 1);
        });
        assert!(subscription.is_active());

        subscription.unsubscribe();
        subscription.unsubscribe();

        assert_eq!(calls.get(), 1);
        assert!(!subscription.is_active());
    }

    #[test]
    fn dropping_does_not_unsubscribe() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();

        drop(Subscription::new(SubscriberId::new(), move || {
            calls_clone.set(calls_clone.get() + 1);
        }));

        assert_eq!(calls.get(), 0);
    }
}
