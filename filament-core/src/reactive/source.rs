//! The Source Abstraction
//!
//! Everything the engine binds to is a [`Source`]: a push-based producer of
//! values that can be subscribed to and unsubscribed from. Sources that hold
//! a value (signals, live values) additionally answer [`Source::current`],
//! which string rendering and event handlers rely on.
//!
//! # Delivery Contract
//!
//! - Delivery is synchronous, inside the call that produced the value.
//! - A source with a current value delivers it synchronously on subscribe.
//! - After [`Subscription::unsubscribe`] returns, the observer is never
//!   called again, even if the unsubscribe happened mid-notification.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use super::subscriber::Subscription;

/// A callback receiving each emitted value by reference.
pub type Observer<T> = Rc<dyn Fn(&T)>;

/// A subscribable, cancellable source of values.
pub trait Source<T: 'static> {
    /// Register an observer. Returns the handle that removes it again.
    fn subscribe(&self, observer: Observer<T>) -> Subscription;

    /// Synchronously read the latest value, if the source holds one.
    fn current(&self) -> Option<T> {
        None
    }
}

impl<T, S> Source<T> for Rc<S>
where
    T: 'static,
    S: Source<T> + ?Sized,
{
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        (**self).subscribe(observer)
    }

    fn current(&self) -> Option<T> {
        (**self).current()
    }
}

/// Combinators available on every source.
pub trait SourceExt<T: 'static>: Source<T> + Sized {
    /// Derive a source that transforms every value with `f`.
    fn map<U, F>(self, f: F) -> Map<Self, T, F>
    where
        F: Fn(&T) -> U + 'static,
    {
        Map {
            source: self,
            f: Rc::new(f),
            _input: PhantomData,
        }
    }

    /// Derive a source that suppresses consecutive equal values.
    fn distinct(self) -> Distinct<Self>
    where
        T: Clone + PartialEq,
    {
        Distinct { source: self }
    }
}

impl<T: 'static, S: Source<T>> SourceExt<T> for S {}

/// A source transformed by a function. See [`SourceExt::map`].
pub struct Map<S, T, F> {
    source: S,
    f: Rc<F>,
    _input: PhantomData<fn(&T)>,
}

impl<S: Clone, T, F> Clone for Map<S, T, F> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            f: Rc::clone(&self.f),
            _input: PhantomData,
        }
    }
}

impl<S, T, U, F> Source<U> for Map<S, T, F>
where
    S: Source<T>,
    T: 'static,
    U: 'static,
    F: Fn(&T) -> U + 'static,
{
    fn subscribe(&self, observer: Observer<U>) -> Subscription {
        let f = Rc::clone(&self.f);
        self.source
            .subscribe(Rc::new(move |value: &T| observer(&f(value))))
    }

    fn current(&self) -> Option<U> {
        self.source.current().map(|value| (self.f)(&value))
    }
}

/// A source that drops consecutive duplicates. See [`SourceExt::distinct`].
#[derive(Clone)]
pub struct Distinct<S> {
    source: S,
}

impl<S, T> Source<T> for Distinct<S>
where
    S: Source<T>,
    T: Clone + PartialEq + 'static,
{
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        // One "last seen" cell per subscriber, not per source.
        let last: RefCell<Option<T>> = RefCell::new(None);
        self.source.subscribe(Rc::new(move |value: &T| {
            {
                let mut last = last.borrow_mut();
                if last.as_ref() == Some(value) {
                    return;
                }
                *last = Some(value.clone());
            }
            observer(value);
        }))
    }

    fn current(&self) -> Option<T> {
        self.source.current()
    }
}
