//! Events and listeners.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::node::Node;

/// Identifies one registered listener, for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) kind: String,
    pub(crate) callback: Rc<dyn Fn(&Event)>,
}

impl Listener {
    pub(crate) fn new(kind: String, callback: Rc<dyn Fn(&Event)>) -> Self {
        Self {
            id: ListenerId::next(),
            kind,
            callback,
        }
    }
}

/// An event delivered to listeners.
#[derive(Debug, Clone)]
pub struct Event {
    kind: String,
    target: Node,
}

impl Event {
    pub fn new(kind: impl Into<String>, target: Node) -> Self {
        Self {
            kind: kind.into(),
            target,
        }
    }

    /// The event name, e.g. `"click"`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The node the event was dispatched at.
    pub fn target(&self) -> &Node {
        &self.target
    }
}
