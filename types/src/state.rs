//! Scheduler lifecycle state and policy knobs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Phase;

/// Lifecycle of a scheduler.
///
/// `Idle → WarmingUp → Running(phase)… → Finished`. `Finished` and `Failed`
/// are terminal; leaving `Idle` is what makes `bootstrap` one-shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    WarmingUp,
    Running(Phase),
    Finished,
    Failed,
}

impl SchedulerState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    #[must_use]
    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::WarmingUp => f.write_str("warming up"),
            Self::Running(phase) => write!(f, "running {phase}"),
            Self::Finished => f.write_str("finished"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// What to do when a resolved target lacks its registered method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingMethodPolicy {
    /// Fail the bootstrap with an explicit error.
    #[default]
    Abort,
    /// Log and leave the item pending; the phase never advances.
    Stall,
}
