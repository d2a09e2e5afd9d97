//! Live Values
//!
//! A [`LiveValue`] is the per-row cell handed to keyed list item templates.
//! It is both subscribable (for declarative bindings inside the row) and
//! synchronously readable (for event handlers that need the row's *current*
//! item at interaction time, not the one captured when the handler was
//! created).
//!
//! The list reconciler pushes new items into it instead of rebuilding the
//! row, and completes it when the row is finally destroyed.

use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;

use super::signal::Signal;
use super::source::{Observer, Source};
use super::subscriber::Subscription;

/// A subscribable, snapshot-readable cell with completion.
pub struct LiveValue<T>
where
    T: Clone + 'static,
{
    cell: Signal<T>,
    completed: Rc<Cell<bool>>,
}

impl<T> LiveValue<T>
where
    T: Clone + 'static,
{
    /// Create a live value holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            cell: Signal::new(value),
            completed: Rc::new(Cell::new(false)),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    /// Push a new value to every observer. Ignored once completed.
    pub fn set(&self, value: T) {
        if self.completed.get() {
            tracing::trace!(signal = self.cell.id(), "push to completed live value ignored");
            return;
        }
        self.cell.set(value);
    }

    /// Complete the cell: drop all observers and refuse further pushes.
    pub fn complete(&self) {
        if !self.completed.replace(true) {
            self.cell.clear_observers();
        }
    }

    /// Whether [`LiveValue::complete`] has been called.
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    /// Number of attached observers.
    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }

    /// Identity comparison: do both handles point at the same cell?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.cell.id() == other.cell.id()
    }
}

impl<T> Source<T> for LiveValue<T>
where
    T: Clone + 'static,
{
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        if self.completed.get() {
            return Subscription::empty();
        }
        self.cell.subscribe(observer)
    }

    fn current(&self) -> Option<T> {
        Some(self.cell.get())
    }
}

impl<T> Clone for LiveValue<T>
where
    T: Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            completed: Rc::clone(&self.completed),
        }
    }
}

impl<T> Debug for LiveValue<T>
where
    T: Clone + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveValue")
            .field("value", &self.get())
            .field("completed", &self.is_completed())
            .finish()
    }
}
