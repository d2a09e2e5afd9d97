//! Compile cache keyed by call site and fragment array.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::compile::CompiledTemplate;
use super::CallSite;
use crate::config::RenderMode;

/// Memoizes [`CompiledTemplate`]s by `(call site, fragments, mode)`.
///
/// The fragments are compared by address, not content: every `html!`
/// expansion owns one static array, so two expansions that share a
/// `line!()`/`column!()` (both produced by one outer macro) still get
/// separate entries.
///
/// Single-threaded: the cache holds `Rc`s and parsed nodes, so it is `!Send`
/// and each thread owns its own (see [`crate::Renderer`]). Entries live until
/// [`clear`](Self::clear); the number of call sites in a program bounds its
/// size.
type Key = (CallSite, usize, RenderMode);

#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RefCell<HashMap<Key, Rc<CompiledTemplate>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled template for `site`, compiling on first use.
    pub fn get_or_compile(
        &self,
        site: CallSite,
        statics: &[&str],
        mode: RenderMode,
    ) -> Rc<CompiledTemplate> {
        let key = (site, statics.as_ptr() as usize, mode);
        if let Some(found) = self.entries.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            return found.clone();
        }

        self.misses.set(self.misses.get() + 1);
        let compiled = Rc::new(CompiledTemplate::compile(site, statics, mode));
        self.entries.borrow_mut().insert(key, compiled.clone());
        compiled
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
        self.hits.set(0);
        self.misses.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static STATICS: &[&str] = &["<p>", "</p>"];
    static OTHER: &[&str] = &["<b>", "</b>"];

    #[test]
    fn compiles_once_per_call_site() {
        let cache = TemplateCache::new();
        let site = CallSite::new("cache.rs", 10, 5);

        let first = cache.get_or_compile(site, STATICS, RenderMode::Dom);
        let second = cache.get_or_compile(site, STATICS, RenderMode::Dom);

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!((cache.hits(), cache.misses(), cache.len()), (1, 1, 1));
    }

    #[test]
    fn keyed_by_site_not_content() {
        let cache = TemplateCache::new();

        cache.get_or_compile(CallSite::new("cache.rs", 1, 1), STATICS, RenderMode::Dom);
        cache.get_or_compile(CallSite::new("cache.rs", 2, 1), STATICS, RenderMode::Dom);
        cache.get_or_compile(CallSite::new("cache.rs", 2, 1), STATICS, RenderMode::String);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn shared_site_with_different_fragments_compiles_separately() {
        let cache = TemplateCache::new();
        let site = CallSite::new("cache.rs", 7, 9);

        let first = cache.get_or_compile(site, STATICS, RenderMode::Dom);
        let second = cache.get_or_compile(site, OTHER, RenderMode::Dom);

        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(second.markup(), "<b><!--fl:0--></b>");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_resets() {
        let cache = TemplateCache::new();
        cache.get_or_compile(CallSite::new("cache.rs", 1, 1), STATICS, RenderMode::Dom);

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 0);
    }
}
