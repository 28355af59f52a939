//! The completion handle passed to every startup method.

use std::fmt;

use tokio::sync::mpsc;

use ignite_types::{ItemKey, Phase};

use crate::timer::TimerHandle;

/// Messages delivered to a scheduler's driver task.
#[derive(Debug)]
pub(crate) enum DriverMessage {
    Completed { phase: Phase, key: ItemKey },
    Drained(Phase),
}

/// Proof that a startup item finished its logical work.
///
/// Calling [`complete`](Self::complete) is the only way an item advances.
/// The handle is consumed, so an item completes at most once. It can be
/// moved into spawned tasks and completed from any thread.
#[must_use = "a startup item only advances when its completion handle is completed"]
pub struct Completion {
    phase: Phase,
    key: ItemKey,
    watchdog: TimerHandle,
    tx: mpsc::UnboundedSender<DriverMessage>,
    completed: bool,
}

impl Completion {
    pub(crate) fn new(
        phase: Phase,
        key: ItemKey,
        watchdog: TimerHandle,
        tx: mpsc::UnboundedSender<DriverMessage>,
    ) -> Self {
        Self {
            phase,
            key,
            watchdog,
            tx,
            completed: false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    /// Mark the item done: cancel its watchdog and hand it back to the scheduler.
    pub fn complete(mut self) {
        self.completed = true;
        self.watchdog.cancel();
        let message = DriverMessage::Completed {
            phase: self.phase,
            key: self.key.clone(),
        };
        if self.tx.send(message).is_err() {
            tracing::debug!(key = %self.key, "Scheduler gone, completion ignored");
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!(
                phase = %self.phase,
                target = %self.key.target(),
                method = %self.key.method(),
                "Completion dropped without completing; phase cannot advance"
            );
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("phase", &self.phase)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
