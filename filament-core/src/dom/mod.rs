//! In-Memory Document Tree
//!
//! The engine renders into this tree rather than a browser DOM, which keeps
//! it testable headlessly: structural assertions, node identity, listener
//! counts and event dispatch are all plain method calls.
//!
//! - [`Node`]: element, text, comment and fragment handles
//! - [`Event`] / [`ListenerId`]: listener registration and dispatch
//! - [`Node::parse_fragment`]: the lenient markup parser templates use
//! - [`escape_text`] / [`escape_attribute`]: serialization escaping
//! - [`style`]: inline style manipulation for animations

mod event;
mod node;
mod parse;
mod serialize;
pub mod style;

pub use event::{Event, ListenerId};
pub use node::{Node, NodeId, NodeKind};
pub(crate) use parse::is_raw_text_element;
pub use serialize::{escape_attribute, escape_text};
