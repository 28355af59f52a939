//! The driver task: owns the phase queues and advances them.
//!
//! Exactly one item is in flight at a time. Completion handles and drained
//! callbacks talk to the driver through one unbounded channel, so every
//! queue mutation happens on this task.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc;

use ignite_types::{ItemKey, MissingMethodPolicy, Phase, QueueItem, SchedulerState, TargetId};

use crate::completion::{Completion, DriverMessage};
use crate::error::BootstrapError;
use crate::events::BootEvent;
use crate::queue::PhaseQueue;
use crate::resolver::Resolver;
use crate::scheduler::Shared;
use crate::timer;
use crate::watchdog::Watchdog;

struct InFlight {
    phase: Phase,
    key: ItemKey,
    watchdog: Watchdog,
}

pub(crate) struct Driver {
    shared: Arc<Shared>,
    resolver: Arc<dyn Resolver>,
    root: TargetId,
    queues: [PhaseQueue; 4],
    tx: mpsc::UnboundedSender<DriverMessage>,
    rx: mpsc::UnboundedReceiver<DriverMessage>,
    in_flight: Option<InFlight>,
}

impl Driver {
    /// Partition `items` into the four phase queues and wire their signals.
    pub(crate) fn new(
        shared: Arc<Shared>,
        resolver: Arc<dyn Resolver>,
        items: Vec<QueueItem>,
        root: TargetId,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut queues = Phase::ALL.map(PhaseQueue::new);
        for item in items {
            queues[item.phase().index()].register(item);
        }

        for queue in &mut queues {
            let phase = queue.phase();
            queue.subscribe_size(move |pending| {
                tracing::trace!(phase = %phase, pending, "Phase queue size changed");
            });
            // Hand off on a later tick so the next phase never starts inside
            // the completion that drained this one.
            let drained_tx = tx.clone();
            queue.on_drained(move || {
                timer::next_tick(move || {
                    let _ = drained_tx.send(DriverMessage::Drained(phase));
                });
            });
        }

        Self {
            shared,
            resolver,
            root,
            queues,
            tx,
            rx,
            in_flight: None,
        }
    }

    pub(crate) async fn run(mut self) {
        tokio::time::sleep(self.shared.config.warmup()).await;

        let outcome = match self.run_phases().await {
            Ok(()) => self.resolve_root(),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => self.shared.finish(),
            Err(err) => self.shared.fail(err),
        }
    }

    async fn run_phases(&mut self) -> Result<(), BootstrapError> {
        for phase in Phase::ALL {
            self.shared.set_state(SchedulerState::Running(phase));
            self.shared.emit(BootEvent::PhaseStarted(phase));
            tracing::info!(
                scheduler = %self.shared.id,
                phase = %phase,
                pending = self.queue(phase).size(),
                "Phase started"
            );

            self.drain(phase).await?;

            tracing::info!(scheduler = %self.shared.id, phase = %phase, "Phase drained");
            self.shared.emit(BootEvent::PhaseDrained(phase));
        }
        Ok(())
    }

    /// Process `phase` until its queue reports drained.
    async fn drain(&mut self, phase: Phase) -> Result<(), BootstrapError> {
        if !self.queue_mut(phase).check_drained() {
            self.dispatch(phase)?;
        }

        // The driver holds a sender, so `recv` only yields `None` if the
        // runtime is tearing the task down.
        while let Some(message) = self.rx.recv().await {
            match message {
                DriverMessage::Completed {
                    phase: completed,
                    key,
                } => self.on_completed(completed, &key)?,
                DriverMessage::Drained(drained) if drained == phase => return Ok(()),
                DriverMessage::Drained(other) => {
                    tracing::debug!(phase = %other, "Ignoring drained signal for inactive phase");
                }
            }
        }
        Err(BootstrapError::Abandoned)
    }

    fn on_completed(&mut self, phase: Phase, key: &ItemKey) -> Result<(), BootstrapError> {
        let is_current = self
            .in_flight
            .as_ref()
            .is_some_and(|current| current.phase == phase && current.key == *key);
        if !is_current {
            tracing::debug!(phase = %phase, key = %key, "Ignoring completion for item not in flight");
            return Ok(());
        }
        if let Some(finished) = self.in_flight.take() {
            finished.watchdog.cancel();
        }

        tracing::debug!(phase = %phase, key = %key, "Startup item completed");
        self.shared.emit(BootEvent::ItemCompleted {
            phase,
            key: key.clone(),
        });

        if self.queue_mut(phase).remove(key) > 0 {
            self.dispatch(phase)?;
        }
        Ok(())
    }

    /// Start the earliest pending item of `phase`.
    fn dispatch(&mut self, phase: Phase) -> Result<(), BootstrapError> {
        let Some(item) = self.queue(phase).peek_earliest().cloned() else {
            return Ok(());
        };

        let instance = self.resolver.resolve(item.target()).map_err(|source| {
            BootstrapError::UnresolvedTarget {
                phase,
                target: item.target().clone(),
                method: item.method().clone(),
                source,
            }
        })?;

        let Some(method) = instance.startup_method(item.method()) else {
            tracing::error!(
                phase = %phase,
                target = %item.target(),
                method = %item.method(),
                "Startup method not found on target"
            );
            return match self.shared.config.missing_method {
                MissingMethodPolicy::Abort => Err(BootstrapError::MissingMethod {
                    phase,
                    target: item.target().clone(),
                    method: item.method().clone(),
                }),
                MissingMethodPolicy::Stall => {
                    self.shared.emit(BootEvent::Stalled {
                        phase,
                        key: item.key().clone(),
                    });
                    Ok(())
                }
            };
        };

        let timeout = item.timeout_or(self.shared.config.default_timeout());
        let watchdog = Watchdog::arm(phase, item.key().clone(), timeout, self.shared.events());
        let done = Completion::new(phase, item.key().clone(), watchdog.handle(), self.tx.clone());
        self.in_flight = Some(InFlight {
            phase,
            key: item.key().clone(),
            watchdog,
        });

        tracing::debug!(
            phase = %phase,
            target = %item.target(),
            method = %item.method(),
            timeout_ms = timeout.as_millis() as u64,
            "Invoking startup method"
        );
        self.shared.emit(BootEvent::ItemStarted {
            phase,
            key: item.key().clone(),
        });

        if panic::catch_unwind(AssertUnwindSafe(|| method(done))).is_err() {
            if let Some(aborted) = self.in_flight.take() {
                aborted.watchdog.cancel();
            }
            return Err(BootstrapError::MethodPanicked {
                phase,
                target: item.target().clone(),
                method: item.method().clone(),
            });
        }
        Ok(())
    }

    fn resolve_root(&self) -> Result<(), BootstrapError> {
        self.resolver
            .resolve(&self.root)
            .map(|_| ())
            .map_err(|source| BootstrapError::UnresolvedRoot {
                target: self.root.clone(),
                source,
            })
    }

    fn queue(&self, phase: Phase) -> &PhaseQueue {
        &self.queues[phase.index()]
    }

    fn queue_mut(&mut self, phase: Phase) -> &mut PhaseQueue {
        &mut self.queues[phase.index()]
    }
}
