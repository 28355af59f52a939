//! Startup items and their identity keys.

use std::fmt;
use std::time::Duration;

use crate::{EmptyIdentifierError, MethodName, Phase, TargetId};

/// Watchdog timeout applied to items that do not set one.
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_millis(5000);

/// Identity of a startup item within its phase: target plus method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    target: TargetId,
    method: MethodName,
}

impl ItemKey {
    #[must_use]
    pub fn new(target: TargetId, method: MethodName) -> Self {
        Self { target, method }
    }

    #[must_use]
    pub fn target(&self) -> &TargetId {
        &self.target
    }

    #[must_use]
    pub fn method(&self) -> &MethodName {
        &self.method
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.method)
    }
}

/// A registered unit of startup work: call `method` on `target` during `phase`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    phase: Phase,
    key: ItemKey,
    /// `None` defers to the scheduler's configured default.
    timeout: Option<Duration>,
}

impl QueueItem {
    #[must_use]
    pub fn new(phase: Phase, target: TargetId, method: MethodName) -> Self {
        Self {
            phase,
            key: ItemKey::new(target, method),
            timeout: None,
        }
    }

    /// Build an item from raw names, validating that neither is blank.
    pub fn parse(
        phase: Phase,
        target: impl Into<String>,
        method: impl Into<String>,
    ) -> Result<Self, EmptyIdentifierError> {
        Ok(Self::new(phase, TargetId::new(target)?, MethodName::new(method)?))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    #[must_use]
    pub fn target(&self) -> &TargetId {
        self.key.target()
    }

    #[must_use]
    pub fn method(&self) -> &MethodName {
        self.key.method()
    }

    /// Explicit timeout, if one was registered.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Timeout the watchdog should use, falling back to `default`.
    #[must_use]
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }
}
