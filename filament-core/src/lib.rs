//! Filament Core
//!
//! This crate provides a reactive template rendering engine. A markup
//! literal with interpolated values becomes a live region of a document tree
//! that stays in sync with push-based sources and is torn down through one
//! handle.
//!
//! It implements:
//!
//! - A markup-aware template compiler with a per-call-site cache
//! - A path-based slot binder and text dispatcher
//! - A conditional controller with animated, cancellable transitions
//! - A keyed list reconciler that can resurrect rows mid-removal
//! - String rendering and hydration of server markup
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: signals, live values and the `Source` boundary trait
//! - `dom`: the in-memory document tree templates render into
//! - `template`: marker scanner, compiler and compile cache
//! - `bind`: slot binding, conditionals and keyed lists
//! - `render` / `ssr` / `hydrate`: the three ways to turn a template into output
//! - `animate` / `task`: animation primitives and the cancellable tasks they run in
//! - `component`: mount and destroy hooks around a render result
//!
//! # Example
//!
//! ```rust
//! use filament_core::{html, when, Node, Signal};
//!
//! let count = Signal::new(0);
//! let open = Signal::new(false);
//!
//! let view = html!(
//!     "<div><p>count: ", count.clone(), "</p>",
//!     when(open.clone(), || html!("<aside>details</aside>")),
//!     "</div>"
//! );
//! let root = Node::element("main");
//! view.mount(&root);
//!
//! count.set(5);
//! open.set(true);
//! assert_eq!(root.query("aside").map(|n| n.text_content()), Some("details".into()));
//!
//! view.unmount();
//! assert_eq!(count.subscriber_count(), 0);
//! ```
//!
//! Animations run as local tasks, so anything that uses them needs a
//! `tokio::task::LocalSet`.

pub mod animate;
pub mod bind;
pub mod component;
pub mod config;
pub mod dom;
pub mod error;
pub mod hydrate;
pub mod reactive;
pub mod render;
pub mod result;
pub mod ssr;
pub mod task;
pub mod template;
pub mod value;

pub use animate::Animation;
pub use bind::{each, when, Conditional, KeyedList};
pub use component::{component, mount, Lifecycle};
pub use config::{EngineConfig, RenderMode};
pub use dom::{Event, Node};
pub use error::{ConfigError, EngineError, HydrationError};
pub use hydrate::hydrate;
pub use reactive::{LiveValue, Signal, Source, SourceExt, Subscription};
pub use render::{render, Renderer};
pub use result::{RenderResult, Teardown};
pub use ssr::{render_string, render_to_string};
pub use template::CallSite;
pub use value::{on, raw_html, raw_html_reactive, Primitive, Value};
