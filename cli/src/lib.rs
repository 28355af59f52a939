//! Ignite CLI library: drives a boot manifest through the scheduler.
//!
//! The binary is a thin wrapper over [`run`]; integration tests call it
//! directly under a paused clock.

pub mod manifest;

use std::fmt;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;

use ignite_engine::{BootConfig, BootEvent, BootstrapError, Scheduler};
use ignite_types::{SchedulerId, SchedulerState};

pub use manifest::{Manifest, ManifestError};

/// How a manifest run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Finished,
    Failed(BootstrapError),
    /// The deadline passed while the scheduler was still in this state.
    DeadlineExceeded(SchedulerState),
}

impl RunOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => f.write_str("finished"),
            Self::Failed(err) => write!(f, "failed: {err}"),
            Self::DeadlineExceeded(state) => write!(f, "deadline exceeded while {state}"),
        }
    }
}

/// A boot event and when it was observed, relative to `bootstrap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedEvent {
    pub at: Duration,
    pub event: BootEvent,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Every event observed, in emission order.
    pub events: Vec<TimedEvent>,
    /// Time from `bootstrap` to the outcome.
    pub elapsed: Duration,
}

impl RunReport {
    /// The observed events without their timestamps.
    pub fn events(&self) -> impl Iterator<Item = &BootEvent> {
        self.events.iter().map(|timed| &timed.event)
    }
}

/// Bootstrap `manifest` and wait for a terminal state or `deadline`.
///
/// Must be called from within a Tokio runtime.
pub async fn run(
    id: SchedulerId,
    manifest: &Manifest,
    config: BootConfig,
    deadline: Option<Duration>,
) -> RunReport {
    let scheduler = Scheduler::builder(id)
        .config(config)
        .registrations(manifest.registrations())
        .resolver(manifest.container())
        .build();

    let mut events = scheduler.subscribe();
    let started = Instant::now();
    let stop_at = deadline.map(|deadline| started + deadline);

    scheduler.done(|| tracing::info!("Boot complete"));
    scheduler.bootstrap(manifest.root.clone());

    let mut seen = Vec::new();
    let outcome = loop {
        let next = match stop_at {
            Some(stop_at) => match tokio::time::timeout_at(stop_at, events.recv()).await {
                Ok(next) => next,
                Err(_) => break RunOutcome::DeadlineExceeded(scheduler.state()),
            },
            None => events.recv().await,
        };

        match next {
            Ok(event) => {
                let outcome = match &event {
                    BootEvent::Finished => Some(RunOutcome::Finished),
                    BootEvent::Failed(err) => Some(RunOutcome::Failed(err.clone())),
                    _ => None,
                };
                seen.push(TimedEvent {
                    at: started.elapsed(),
                    event,
                });
                if let Some(outcome) = outcome {
                    break outcome;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event stream lagged; some boot events were dropped");
            }
            Err(RecvError::Closed) => {
                break match scheduler.wait().await {
                    Ok(()) => RunOutcome::Finished,
                    Err(err) => RunOutcome::Failed(err),
                };
            }
        }
    };

    RunReport {
        outcome,
        events: seen,
        elapsed: started.elapsed(),
    }
}
