//! Cancellable local tasks.
//!
//! Animations are the engine's only suspension points. Each one runs as a
//! task on the current [`tokio::task::LocalSet`], wrapped in
//! [`futures_util::future::abortable`] so the controller that started it can
//! cancel it through a [`CancelToken`].
//!
//! An abort issued before the task next polls always wins: the wrapped future
//! is never polled again, so its continuation never runs. Controllers also
//! compare the token id stored on their state before acting on a completion,
//! which covers a completion racing a newer token.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::{abortable, AbortHandle};

/// Handle to one spawned task.
#[derive(Debug, Clone)]
pub struct CancelToken {
    id: u64,
    handle: AbortHandle,
}

impl CancelToken {
    fn next_id() -> u64 {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        COUNTER.fetch_add(1, Ordering::Relaxed)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Abort the task. Idempotent.
    pub fn cancel(&self) {
        if !self.handle.is_aborted() {
            tracing::trace!(token = self.id, "cancelling task");
        }
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_aborted()
    }
}

/// Spawn the future built by `make` on the current `LocalSet`.
///
/// `make` receives the new token's id, so a continuation can check that it
/// still owns the state it is about to touch.
///
/// # Panics
///
/// Panics when called outside a `LocalSet`, like `tokio::task::spawn_local`.
pub fn spawn<F, Fut>(make: F) -> CancelToken
where
    F: FnOnce(u64) -> Fut,
    Fut: Future<Output = ()> + 'static,
{
    let id = CancelToken::next_id();
    let (task, handle) = abortable(make(id));
    tokio::task::spawn_local(async move {
        if task.await.is_err() {
            tracing::trace!(token = id, "task aborted");
        }
    });
    CancelToken { id, handle }
}

// ---- Tests ----
