//! The four startup stages, in execution order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four sequential startup stages.
///
/// Declaration order is execution order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    FrameworkBeforeBoot,
    Before,
    After,
    FrameworkAfterBoot,
}

impl Phase {
    /// Every phase in execution order.
    pub const ALL: [Phase; 4] = [
        Phase::FrameworkBeforeBoot,
        Phase::Before,
        Phase::After,
        Phase::FrameworkAfterBoot,
    ];

    /// Position of this phase in [`Phase::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Phase::FrameworkBeforeBoot => 0,
            Phase::Before => 1,
            Phase::After => 2,
            Phase::FrameworkAfterBoot => 3,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Phase::FrameworkBeforeBoot => "framework_before_boot",
            Phase::Before => "before",
            Phase::After => "after",
            Phase::FrameworkAfterBoot => "framework_after_boot",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
