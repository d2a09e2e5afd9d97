//! Signal Implementation
//!
//! A Signal is the fundamental push-based cell. It holds a value and a table
//! of observers, and notifies them synchronously whenever the value is set.
//!
//! # How Signals Work
//!
//! 1. Subscribing registers an observer and immediately delivers the
//!    current value to it.
//!
//! 2. Setting the value notifies every observer, in subscription order.
//!
//! 3. Observers may unsubscribe themselves or each other during a
//!    notification; removed observers are skipped for the rest of it.
//!
//! # Threading
//!
//! Signals are single-threaded (`Rc` + `RefCell`). The rendering engine
//! lives on one thread and binds DOM handles inside observers, so nothing
//! here needs to be `Send`.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::source::{Observer, Source};
use super::subscriber::{SubscriberId, Subscription};

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

type ObserverTable<T> = Rc<RefCell<IndexMap<SubscriberId, Observer<T>>>>;

/// A reactive cell holding a value of type T.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T>
where
    T: Clone + 'static,
{
    /// Unique identifier for this signal.
    id: u64,

    /// The current value.
    value: Rc<RefCell<T>>,

    /// Registered observers, in subscription order.
    observers: ObserverTable<T>,
}

impl<T> Signal<T>
where
    T: Clone + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_signal_id(),
            value: Rc::new(RefCell::new(value)),
            observers: Rc::new(RefCell::new(IndexMap::new())),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Set a new value and notify observers.
    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = value.clone();
        self.notify(&value);
    }

    /// Update the value using a function.
    ///
    /// This is useful for updates that depend on the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.value.borrow();
            f(&guard)
        };
        self.set(new_value);
    }

    /// Get the number of registered observers.
    pub fn subscriber_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Drop every observer. Their subscriptions become no-ops.
    pub(crate) fn clear_observers(&self) {
        self.observers.borrow_mut().clear();
    }

    /// Notify all observers of `value`.
    fn notify(&self, value: &T) {
        // Snapshot, so observers may (un)subscribe while we iterate.
        let snapshot: Vec<(SubscriberId, Observer<T>)> = self
            .observers
            .borrow()
            .iter()
            .map(|(id, observer)| (*id, Rc::clone(observer)))
            .collect();

        for (id, observer) in snapshot {
            if self.observers.borrow().contains_key(&id) {
                observer(value);
            }
        }
    }
}

impl<T> Source<T> for Signal<T>
where
    T: Clone + 'static,
{
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let id = SubscriberId::new();
        self.observers
            .borrow_mut()
            .insert(id, Rc::clone(&observer));

        let observers = Rc::downgrade(&self.observers);
        let subscription = Subscription::new(id, move || {
            if let Some(observers) = observers.upgrade() {
                observers.borrow_mut().shift_remove(&id);
            }
        });

        // Deliver the current value synchronously.
        let current = self.get();
        observer(&current);

        subscription
    }

    fn current(&self) -> Option<T> {
        Some(self.get())
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Rc::clone(&self.value),
            observers: Rc::clone(&self.observers),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &*self.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn subscribe_delivers_current_then_changes() {
        let signal = Signal::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let _sub = signal.subscribe(Rc::new(move |v: &i32| seen_clone.borrow_mut().push(*v)));
        signal.set(2);
        signal.set(3);

        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn signal_unsubscribe() {
        let signal = Signal::new(0);
        let call_count = Rc::new(Cell::new(0));
        let call_count_clone = call_count.clone();

        let sub = signal.subscribe(Rc::new(move |_: &i32| {
            call_count_clone.set(call_count_clone.get() + 1);
        }));
        assert_eq!(signal.subscriber_count(), 1);

        signal.set(1);
        assert_eq!(call_count.get(), 2);

        sub.unsubscribe();
        signal.set(2);
        // Should not have been called again
        assert_eq!(call_count.get(), 2);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn observer_removed_mid_notification_is_skipped() {
        let signal = Signal::new(0);
        let second_calls = Rc::new(Cell::new(0));

        // The first observer tears down the second one on any non-initial value.
        let second: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let second_clone = second.clone();
        let _first = signal.subscribe(Rc::new(move |v: &i32| {
            if *v > 0 {
                if let Some(sub) = second_clone.borrow().as_ref() {
                    sub.unsubscribe();
                }
            }
        }));

        let calls = second_calls.clone();
        *second.borrow_mut() = Some(signal.subscribe(Rc::new(move |_: &i32| {
            calls.set(calls.get() + 1);
        })));
        assert_eq!(second_calls.get(), 1);

        signal.set(1);
        assert_eq!(second_calls.get(), 1);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1.id(), signal2.id());
    }
}
