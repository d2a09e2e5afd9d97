//! Component Lifecycle
//!
//! A thin wrapper over a render result: hooks that run when the content is
//! first placed in a parent, and hooks that run when it is torn down.
//!
//! Destroy hooks join the result's teardown. Mount hooks wait on the result
//! until it is inserted, either by [`mount`] or by a controller placing it
//! after an anchor. Statically nested components hand their mount hooks up
//! to the enclosing result, so one `mount` call fires all of them in
//! document order.

use crate::dom::Node;
use crate::error::{self, EngineError};
use crate::result::RenderResult;

type Hook = Box<dyn FnOnce()>;

/// Hook registry handed to a component's body.
#[derive(Default)]
pub struct Lifecycle {
    mount: Vec<Hook>,
    destroy: Vec<Hook>,
}

impl Lifecycle {
    /// Run `hook` once, right after the content is inserted.
    pub fn on_mount<F>(&mut self, hook: F)
    where
        F: FnOnce() + 'static,
    {
        self.mount.push(Box::new(hook));
    }

    /// Run `hook` once, when the content is torn down.
    pub fn on_destroy<F>(&mut self, hook: F)
    where
        F: FnOnce() + 'static,
    {
        self.destroy.push(Box::new(hook));
    }
}

/// Build a component: `body` renders the content and registers hooks.
pub fn component<F>(body: F) -> RenderResult
where
    F: FnOnce(&mut Lifecycle) -> RenderResult,
{
    let mut lifecycle = Lifecycle::default();
    let result = body(&mut lifecycle);

    for hook in lifecycle.mount {
        result.queue_mount_hook(hook);
    }
    for hook in lifecycle.destroy {
        result.teardown().add(move || {
            error::guard(hook, |message| EngineError::HookPanicked {
                hook: "destroy",
                message,
            });
        });
    }
    result
}

/// Append `result` to `parent` and fire its pending mount hooks.
pub fn mount(parent: &Node, result: &RenderResult) {
    tracing::trace!(site = ?result.call_site(), "mounting result");
    result.mount(parent);
}

// ---- Tests ----
