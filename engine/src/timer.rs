//! Timer primitives on the Tokio runtime.
//!
//! Every scheduled callback is backed by a spawned task, and every handle is
//! a [`TimerHandle`]. One handle type covers one-shot delays and next-tick
//! callbacks alike, so cancellation can never be applied to the wrong kind
//! of timer.

use std::time::Duration;

use tokio::task::AbortHandle;

/// Cancellable handle to a scheduled callback.
///
/// Cloning shares the same timer. Dropping a handle does not cancel it.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    abort: AbortHandle,
}

impl TimerHandle {
    /// Cancel the timer. Idempotent; a no-op once the callback has run.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// Whether the callback has run or the timer was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Run `callback` once, after at least `delay`.
///
/// Must be called from within a Tokio runtime.
pub fn schedule_once<F>(delay: Duration, callback: F) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        callback();
    });
    TimerHandle {
        abort: task.abort_handle(),
    }
}

/// Run `callback` on a later scheduler tick, never inline.
///
/// Must be called from within a Tokio runtime.
pub fn next_tick<F>(callback: F) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::task::yield_now().await;
        callback();
    });
    TimerHandle {
        abort: task.abort_handle(),
    }
}
