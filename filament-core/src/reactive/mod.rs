//! Reactive Primitives
//!
//! This module holds the push-based sources the rendering engine consumes.
//! The engine itself never tracks dependencies; it only needs "something it
//! can subscribe to, unsubscribe from, and (sometimes) read synchronously".
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is a container for mutable state. Subscribing delivers the
//! current value; every `set` delivers the new one.
//!
//! ## Live Values
//!
//! A [`LiveValue`] is a signal with completion, handed to each row of a keyed
//! list so that the row can be updated in place.
//!
//! ## Sources
//!
//! [`Source`] is the boundary trait. Stores, routers and forms produce
//! sources; templates consume them. [`SourceExt`] adds `map` and `distinct`.

mod live;
mod signal;
mod source;
mod subscriber;

pub use live::LiveValue;
pub use signal::Signal;
pub use source::{Distinct, Map, Observer, Source, SourceExt};
pub use subscriber::{SubscriberId, Subscription};
