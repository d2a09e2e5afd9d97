//! Rendering Entry Points
//!
//! [`render`] is the one function every template goes through. The
//! [`html!`](crate::html) macro expands to a call of it with a static
//! fragment array and a [`CallSite`] for the literal.
//!
//! Each thread has one [`Renderer`] holding the config, the current render
//! mode and the compile cache. The engine is single-threaded: results,
//! sources and nodes are all `Rc`-based and never cross threads.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::bind::{self, Binder};
use crate::config::{EngineConfig, RenderMode};
use crate::dom::Node;
use crate::result::{Region, RenderResult, Teardown};
use crate::ssr;
use crate::template::{CallSite, CompiledTemplate, TemplateCache};
use crate::value::Value;

thread_local! {
    static CURRENT: RefCell<Rc<Renderer>> = RefCell::new(Rc::new(Renderer::new(EngineConfig::default())));
}

/// Per-thread engine state.
#[derive(Debug)]
pub struct Renderer {
    config: EngineConfig,
    mode: Cell<RenderMode>,
    cache: TemplateCache,
}

impl Renderer {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            mode: Cell::new(config.mode),
            config,
            cache: TemplateCache::new(),
        }
    }

    /// This thread's renderer.
    pub fn current() -> Rc<Renderer> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Replace this thread's renderer (and with it the compile cache).
    /// Returns the previous one.
    pub fn install(config: EngineConfig) -> Rc<Renderer> {
        tracing::debug!(?config, "installing renderer");
        let next = Rc::new(Renderer::new(config));
        CURRENT.with(|current| std::mem::replace(&mut *current.borrow_mut(), next))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    pub fn mode(&self) -> RenderMode {
        self.mode.get()
    }

    pub fn animation_grace(&self) -> Duration {
        Duration::from_millis(self.config.animation_grace_ms)
    }

    /// Run `f` with the render mode switched to `mode`, restoring it after,
    /// even if `f` panics.
    pub fn with_mode<R>(&self, mode: RenderMode, f: impl FnOnce() -> R) -> R {
        struct Restore<'a>(&'a Cell<RenderMode>, RenderMode);
        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                self.0.set(self.1);
            }
        }

        let _restore = Restore(&self.mode, self.mode.replace(mode));
        f()
    }
}

/// Render one template instance.
///
/// `statics` are the literal's fragments; `values` fill the gaps between
/// them. The compiled template is cached by `site`.
pub fn render(site: CallSite, statics: &'static [&'static str], values: Vec<Value>) -> RenderResult {
    let renderer = Renderer::current();
    let mode = renderer.mode();
    let compiled = renderer.cache().get_or_compile(site, statics, mode);

    let expected = statics.len().saturating_sub(1);
    if values.len() != expected {
        tracing::warn!(%site, expected, supplied = values.len(), "value count does not match template");
    }

    match mode {
        RenderMode::String => ssr::render_markup(&compiled, site, statics, values),
        RenderMode::Dom => render_live(&compiled, site, statics, values),
    }
}

fn render_live(
    compiled: &CompiledTemplate,
    site: CallSite,
    statics: &'static [&'static str],
    values: Vec<Value>,
) -> RenderResult {
    let fragment = compiled.instantiate().unwrap_or_else(Node::fragment);
    let teardown = Teardown::new();
    let targets = bind::resolve_all(&fragment, compiled.slots());

    let mut binder = Binder::new(&values, &teardown);
    let roots = binder.bind(compiled.slots(), targets, fragment.children());
    let adopted = std::mem::take(&mut binder.adopted);

    let result = RenderResult::live(fragment, Region::new(roots), teardown, Some(site), statics, values);
    for child in &adopted {
        result.adopt_mount_hooks(child);
    }
    result
}

/// Build a template from alternating string literals and values.
///
/// ```
/// use filament_core::html;
///
/// let name = "world";
/// let greeting = html!("<p>Hello, ", name, "!</p>");
/// assert_eq!(greeting.to_html(), "<p>Hello, world!</p>");
/// ```
///
/// Attribute sigils bind events (`@click=`), properties (`.value=`) and
/// boolean attributes (`?disabled=`). Every value goes through
/// [`Value::from`](crate::Value).
#[macro_export]
macro_rules! html {
    ($first:literal $(, $value:expr, $rest:literal)*) => {{
        static STATICS: &[&str] = &[$first $(, $rest)*];
        const SITE: $crate::CallSite = $crate::CallSite::new(file!(), line!(), column!());
        $crate::render(SITE, STATICS, vec![$($crate::Value::from($value)),*])
    }};
}

// ---- Tests ----
