//! Template Compilation
//!
//! A template is the list of static fragments of one `html!` call site. It
//! is compiled once per call site and render mode, then reused:
//!
//! 1. The scanner joins the fragments, injecting a marker per interpolation and
//!    rewriting attribute sigils.
//! 2. [`CompiledTemplate::compile`] parses the result into a fragment (DOM
//!    mode only) and records a [`SlotRecord`] for every marker it finds.
//! 3. [`TemplateCache`] memoizes step 1 and 2 by [`CallSite`].

mod cache;
mod compile;
pub(crate) mod scan;

pub use cache::TemplateCache;
pub use compile::{CompiledTemplate, NodePath, SlotKind, SlotRecord};

use std::fmt;

/// Stable identity of one template literal in the source.
///
/// The `html!` macro builds this from `file!()`, `line!()` and `column!()`,
/// so two renders of the same literal share a compiled template no matter
/// what values they interpolate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    file: &'static str,
    line: u32,
    column: u32,
}

impl CallSite {
    pub const fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
