//! Errors and the Error Channel
//!
//! Rendering itself never fails: a slot that cannot be bound is skipped and
//! logged. What can go wrong at runtime is user code the engine calls on the
//! caller's behalf (event handlers, lifecycle hooks, teardown cleanups).
//! Those calls are wrapped in [`guard`], and a panic becomes an
//! [`EngineError`] delivered to the per-thread error channel instead of
//! unwinding through the engine and skipping sibling work.
//!
//! The channel defaults to logging with `tracing::error!`; tests and hosts
//! install their own with [`set_error_handler`].

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use thiserror::Error;

/// Failures surfaced through the error channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("slot {index} path {path:?} did not resolve in the cloned template")]
    UnresolvedSlot { index: usize, path: Vec<usize> },

    #[error("event handler for '{event}' panicked: {message}")]
    HandlerPanicked { event: String, message: String },

    #[error("teardown cleanup panicked: {message}")]
    CleanupPanicked { message: String },

    #[error("{hook} hook panicked: {message}")]
    HookPanicked { hook: &'static str, message: String },
}

/// Failures of [`crate::hydrate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HydrationError {
    #[error("render result has no call site; only results from render() can be hydrated")]
    MissingCallSite,

    #[error("container has no node at path {path:?} for slot {index}")]
    Mismatch { index: usize, path: Vec<usize> },
}

/// Failures loading an [`crate::EngineConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("raw html wrapper '{0}' is not a valid tag name")]
    InvalidWrapper(String),
}

type ErrorHandler = Rc<dyn Fn(&EngineError)>;

thread_local! {
    static HANDLER: RefCell<Option<ErrorHandler>> = const { RefCell::new(None) };
}

/// Install the error channel for this thread, returning the previous one.
pub fn set_error_handler<F>(handler: F) -> Option<Rc<dyn Fn(&EngineError)>>
where
    F: Fn(&EngineError) + 'static,
{
    HANDLER.with(|slot| slot.borrow_mut().replace(Rc::new(handler)))
}

/// Restore the default (logging) error channel.
pub fn reset_error_handler() {
    HANDLER.with(|slot| slot.borrow_mut().take());
}

/// Deliver `error` to this thread's error channel.
pub fn report(error: EngineError) {
    // Clone out of the cell so the handler may itself reinstall a handler.
    let handler = HANDLER.with(|slot| slot.borrow().clone());
    match handler {
        Some(handler) => {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(&error))).is_err() {
                tracing::error!(%error, "error handler panicked");
            }
        }
        None => tracing::error!(%error, "engine error"),
    }
}

/// Run `f`, converting a panic into a report built by `describe`.
pub(crate) fn guard<R>(f: impl FnOnce() -> R, describe: impl FnOnce(String) -> EngineError) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            report(describe(panic_message(payload.as_ref())));
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_reports_panics_to_installed_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        set_error_handler(move |e| sink.borrow_mut().push(e.clone()));

        let out = guard(
            || -> i32 { panic!("boom") },
            |message| EngineError::CleanupPanicked { message },
        );

        assert_eq!(out, None);
        assert_eq!(
            *seen.borrow(),
            vec![EngineError::CleanupPanicked {
                message: "boom".into()
            }]
        );
        reset_error_handler();
    }

    #[test]
    fn guard_passes_values_through() {
        let out = guard(|| 7, |message| EngineError::CleanupPanicked { message });
        assert_eq!(out, Some(7));
    }

    #[test]
    fn error_messages() {
        let err = EngineError::HandlerPanicked {
            event: "click".into(),
            message: "bad".into(),
        };
        assert_eq!(err.to_string(), "event handler for 'click' panicked: bad");
    }
}
