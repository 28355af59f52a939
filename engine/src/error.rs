//! Errors surfaced by the scheduler and the resolver.

use thiserror::Error;

use ignite_types::{MethodName, Phase, TargetId};

/// Failure to turn a target identifier into a live instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no provider registered for target '{0}'")]
    UnknownTarget(TargetId),
    #[error("factory for target '{target}' failed: {message}")]
    FactoryFailed { target: TargetId, message: String },
}

/// Why a bootstrap stopped before the finish signal.
///
/// Every variant is terminal: the scheduler moves to `Failed` and `done`
/// callbacks are never invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error("target '{target}' has no startup method '{method}' (phase {phase})")]
    MissingMethod {
        phase: Phase,
        target: TargetId,
        method: MethodName,
    },
    #[error("could not resolve target for {target}.{method} (phase {phase}): {source}")]
    UnresolvedTarget {
        phase: Phase,
        target: TargetId,
        method: MethodName,
        #[source]
        source: ResolveError,
    },
    #[error("could not resolve root target '{target}': {source}")]
    UnresolvedRoot {
        target: TargetId,
        #[source]
        source: ResolveError,
    },
    #[error("startup method {target}.{method} panicked (phase {phase})")]
    MethodPanicked {
        phase: Phase,
        target: TargetId,
        method: MethodName,
    },
    #[error("bootstrap must be called from within a Tokio runtime")]
    NoRuntime,
    #[error("bootstrap driver stopped before reaching a terminal state")]
    Abandoned,
}

impl BootstrapError {
    /// The phase that was running when the bootstrap failed, if any.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::MissingMethod { phase, .. }
            | Self::UnresolvedTarget { phase, .. }
            | Self::MethodPanicked { phase, .. } => Some(*phase),
            Self::UnresolvedRoot { .. } | Self::NoRuntime | Self::Abandoned => None,
        }
    }
}
