//! Animation Primitives
//!
//! An [`Animation`] takes one element and returns a future that resolves when
//! the effect is over. The built-in primitives write inline style and wait for
//! the element's end event (`transitionend` / `transitioncancel`, or
//! `animationend` / `animationcancel`).
//!
//! # Timeout Fallback
//!
//! A missing stylesheet or a host that never fires the end event must not
//! hang a mount or teardown. Every primitive races its event against
//! `duration + grace` with [`tokio::time::timeout`], where the grace period
//! comes from [`EngineConfig::animation_grace_ms`](crate::EngineConfig).
//! Listeners are removed when the wait finishes or when the future is dropped
//! (an aborted leave).

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use tokio::sync::oneshot;

use crate::dom::style::{remove_style_property, set_style_property, style_property};
use crate::dom::{ListenerId, Node};
use crate::render::Renderer;

/// An element transition, started by the conditional and list controllers.
#[derive(Clone)]
pub struct Animation(Rc<dyn Fn(&Node) -> LocalBoxFuture<'static, ()>>);

impl Animation {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(&Node) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self(Rc::new(move |node: &Node| f(node).boxed_local()))
    }

    /// Start the animation on `node`.
    pub fn run(&self, node: &Node) -> LocalBoxFuture<'static, ()> {
        (self.0)(node)
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Animation(..)")
    }
}

const TRANSITION_EVENTS: &[&str] = &["transitionend", "transitioncancel"];
const ANIMATION_EVENTS: &[&str] = &["animationend", "animationcancel"];

/// Removes the end-event listeners however the wait finishes.
struct ListenerGuard {
    node: Node,
    ids: Vec<ListenerId>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            self.node.remove_event_listener(id);
        }
    }
}

/// Puts inline style properties back to their values from before the
/// animation while armed. Entry animations always restore; exit animations
/// disarm once they finish, so only an aborted exit is undone.
struct StyleRestore {
    node: Node,
    prior: Vec<(&'static str, Option<String>)>,
    armed: bool,
}

impl StyleRestore {
    fn new(node: &Node, properties: &'static [&'static str]) -> Self {
        Self {
            node: node.clone(),
            prior: properties
                .iter()
                .map(|&property| (property, style_property(node, property)))
                .collect(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StyleRestore {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        for (property, value) in &self.prior {
            match value {
                Some(value) => set_style_property(&self.node, property, value),
                None => remove_style_property(&self.node, property),
            }
        }
    }
}

/// Resolve on the first of `events` on `node`, or after `limit`.
async fn wait_for_end(node: Node, events: &'static [&'static str], limit: Duration) {
    let (tx, rx) = oneshot::channel::<()>();
    let tx = Rc::new(RefCell::new(Some(tx)));
    let ids = events
        .iter()
        .map(|kind| {
            let tx = tx.clone();
            node.add_event_listener(*kind, move |_| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(());
                }
            })
        })
        .collect();
    let _guard = ListenerGuard {
        node: node.clone(),
        ids,
    };

    if tokio::time::timeout(limit, rx).await.is_err() {
        tracing::debug!(
            node = node.id().raw(),
            limit_ms = limit.as_millis() as u64,
            "no end event; animation timed out"
        );
    }
}

fn limit(duration: Duration) -> Duration {
    duration + Renderer::current().animation_grace()
}

fn transition(node: &Node, property: &str, duration: Duration) {
    set_style_property(
        node,
        "transition",
        &format!("{property} {}ms ease", duration.as_millis()),
    );
}

/// Fade from transparent to opaque.
pub fn fade_in(duration: Duration) -> Animation {
    Animation::new(move |node: &Node| {
        let node = node.clone();
        async move {
            let _restore = StyleRestore::new(&node, &["transition", "opacity"]);
            set_style_property(&node, "opacity", "0");
            transition(&node, "opacity", duration);
            set_style_property(&node, "opacity", "1");
            wait_for_end(node.clone(), TRANSITION_EVENTS, limit(duration)).await;
        }
    })
}

/// Fade from opaque to transparent. The final style stays on the element,
/// which is about to be detached.
pub fn fade_out(duration: Duration) -> Animation {
    Animation::new(move |node: &Node| {
        let node = node.clone();
        async move {
            let restore = StyleRestore::new(&node, &["transition", "opacity"]);
            transition(&node, "opacity", duration);
            set_style_property(&node, "opacity", "0");
            wait_for_end(node, TRANSITION_EVENTS, limit(duration)).await;
            restore.disarm();
        }
    })
}

/// Slide down into place from `offset_px` above.
pub fn slide_in(duration: Duration, offset_px: i32) -> Animation {
    Animation::new(move |node: &Node| {
        let node = node.clone();
        async move {
            let _restore = StyleRestore::new(&node, &["transition", "transform"]);
            set_style_property(&node, "transform", &format!("translateY({}px)", -offset_px));
            transition(&node, "transform", duration);
            set_style_property(&node, "transform", "none");
            wait_for_end(node.clone(), TRANSITION_EVENTS, limit(duration)).await;
        }
    })
}

/// Slide up by `offset_px`.
pub fn slide_out(duration: Duration, offset_px: i32) -> Animation {
    Animation::new(move |node: &Node| {
        let node = node.clone();
        async move {
            let restore = StyleRestore::new(&node, &["transition", "transform"]);
            transition(&node, "transform", duration);
            set_style_property(&node, "transform", &format!("translateY({}px)", -offset_px));
            wait_for_end(node, TRANSITION_EVENTS, limit(duration)).await;
            restore.disarm();
        }
    })
}

/// Run the stylesheet `@keyframes` animation `name`.
pub fn keyframes(name: impl Into<String>, duration: Duration) -> Animation {
    let name: Rc<str> = name.into().into();
    Animation::new(move |node: &Node| {
        let node = node.clone();
        let name = name.clone();
        async move {
            let _restore = StyleRestore::new(&node, &["animation"]);
            set_style_property(
                &node,
                "animation",
                &format!("{name} {}ms", duration.as_millis()),
            );
            wait_for_end(node.clone(), ANIMATION_EVENTS, limit(duration)).await;
        }
    })
}

// ---- Tests ----
