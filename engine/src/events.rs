//! Boot lifecycle events broadcast to observers.

use std::time::Duration;

use ignite_types::{ItemKey, Phase};

use crate::error::BootstrapError;

/// An event emitted by a running scheduler.
///
/// Observers subscribe with [`Scheduler::subscribe`](crate::Scheduler::subscribe)
/// before calling `bootstrap` to see the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootEvent {
    /// `bootstrap` accepted; the first phase starts after `delay`.
    WarmupStarted { delay: Duration },
    PhaseStarted(Phase),
    /// The item's method is about to be invoked.
    ItemStarted { phase: Phase, key: ItemKey },
    /// The item's completion handle was invoked and the item removed.
    ItemCompleted { phase: Phase, key: ItemKey },
    /// The item overran its timeout. Diagnostic only; the item stays pending.
    WatchdogExpired {
        phase: Phase,
        key: ItemKey,
        timeout: Duration,
    },
    /// The item's target lacks its method and the stall policy is active.
    Stalled { phase: Phase, key: ItemKey },
    PhaseDrained(Phase),
    /// Every phase drained and the root target resolved.
    Finished,
    Failed(BootstrapError),
}

impl BootEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed(_))
    }
}
