//! Public scheduler facade: the `bootstrap` / `done` surface.
//!
//! A [`Scheduler`] is a cheap handle around shared state. `bootstrap` spawns
//! a single driver task that owns the phase queues; everything else
//! (`done`, `state`, `subscribe`, `wait`) only reads or subscribes.

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};

use ignite_config::BootConfig;
use ignite_types::{SchedulerId, SchedulerState, TargetId};

use crate::driver::Driver;
use crate::error::BootstrapError;
use crate::events::BootEvent;
use crate::registry::{RegistrationSource, Registrations};
use crate::resolver::{Container, Resolver};
use crate::signal::FinishSignal;

/// Collaborators consumed by the first `bootstrap` call.
pub(crate) struct Launch {
    pub(crate) source: Box<dyn RegistrationSource>,
    pub(crate) resolver: Arc<dyn Resolver>,
}

pub(crate) struct Shared {
    pub(crate) id: SchedulerId,
    pub(crate) config: BootConfig,
    state: watch::Sender<SchedulerState>,
    events: broadcast::Sender<BootEvent>,
    finish: FinishSignal,
    failure: Mutex<Option<BootstrapError>>,
    launch: Mutex<Option<Launch>>,
}

impl Shared {
    pub(crate) fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }

    pub(crate) fn emit(&self, event: BootEvent) {
        // No subscribers is fine; events are best-effort.
        let _ = self.events.send(event);
    }

    pub(crate) fn events(&self) -> broadcast::Sender<BootEvent> {
        self.events.clone()
    }

    fn take_launch(&self) -> Option<Launch> {
        self.launch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Fire the finish signal, then enter `Finished`.
    pub(crate) fn finish(&self) {
        let invoked = self.finish.fire().unwrap_or(0);
        tracing::info!(scheduler = %self.id, callbacks = invoked, "Bootstrap finished");
        self.set_state(SchedulerState::Finished);
        self.emit(BootEvent::Finished);
    }

    /// Record `error` and enter `Failed`. Only the first failure is kept.
    pub(crate) fn fail(&self, error: BootstrapError) {
        {
            let mut failure = self
                .failure
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if failure.is_some() || self.state.borrow().is_terminal() {
                return;
            }
            *failure = Some(error.clone());
        }
        tracing::error!(scheduler = %self.id, error = %error, "Bootstrap failed");
        self.set_state(SchedulerState::Failed);
        self.emit(BootEvent::Failed(error));
    }

    fn failure(&self) -> Option<BootstrapError> {
        self.failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Staged bootstrap scheduler.
///
/// Runs registered startup items through the four phases in order, one item
/// at a time, and fires the `done` callbacks once every phase has drained
/// and the root target resolves.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    #[must_use]
    pub fn builder(id: SchedulerId) -> SchedulerBuilder {
        SchedulerBuilder::new(id)
    }

    #[must_use]
    pub fn id(&self) -> &SchedulerId {
        &self.shared.id
    }

    #[must_use]
    pub fn config(&self) -> &BootConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.shared.state.borrow()
    }

    /// Subscribe to boot events. Subscribe before `bootstrap` to see the whole run.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BootEvent> {
        self.shared.events.subscribe()
    }

    /// Start the bootstrap. Only the first call has any effect.
    ///
    /// Queries the registration source, then spawns the driver task on the
    /// current Tokio runtime. Outside a runtime the scheduler fails with
    /// [`BootstrapError::NoRuntime`].
    pub fn bootstrap(&self, root: TargetId) -> &Self {
        let accepted = self.shared.state.send_if_modified(|state| {
            if state.is_idle() {
                *state = SchedulerState::WarmingUp;
                true
            } else {
                false
            }
        });
        if !accepted {
            tracing::debug!(
                scheduler = %self.shared.id,
                state = %self.state(),
                "Bootstrap already started, ignoring"
            );
            return self;
        }

        let Some(launch) = self.shared.take_launch() else {
            return self;
        };
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                self.shared.fail(BootstrapError::NoRuntime);
                return self;
            }
        };

        let items = launch.source.registrations(&self.shared.id);
        tracing::info!(
            scheduler = %self.shared.id,
            root = %root,
            items = items.len(),
            "Bootstrap starting"
        );
        let driver = Driver::new(Arc::clone(&self.shared), launch.resolver, items, root);
        self.shared.emit(BootEvent::WarmupStarted {
            delay: self.shared.config.warmup(),
        });

        let driver_task = runtime.spawn(driver.run());
        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move {
            if let Err(err) = driver_task.await {
                tracing::error!(scheduler = %shared.id, "Bootstrap driver stopped: {err}");
                shared.fail(BootstrapError::Abandoned);
            }
        });
        self
    }

    /// Register `callback` to run once the bootstrap finishes.
    ///
    /// Returns `false` if the bootstrap already finished; the callback is
    /// dropped without running.
    pub fn done(&self, callback: impl FnOnce() + Send + 'static) -> bool {
        let accepted = self.shared.finish.subscribe(callback);
        if !accepted {
            tracing::debug!(scheduler = %self.shared.id, "Finish signal already fired, callback dropped");
        }
        accepted
    }

    /// Wait until the bootstrap reaches a terminal state.
    pub async fn wait(&self) -> Result<(), BootstrapError> {
        let mut state = self.shared.state.subscribe();
        let reached = state
            .wait_for(|state| state.is_terminal())
            .await
            .map(|state| *state);
        match reached {
            Ok(SchedulerState::Finished) => Ok(()),
            _ => Err(self.shared.failure().unwrap_or(BootstrapError::Abandoned)),
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Scheduler`] from its collaborators.
pub struct SchedulerBuilder {
    id: SchedulerId,
    config: BootConfig,
    source: Box<dyn RegistrationSource>,
    resolver: Arc<dyn Resolver>,
}

impl SchedulerBuilder {
    fn new(id: SchedulerId) -> Self {
        Self {
            id,
            config: BootConfig::default(),
            source: Box::new(Registrations::new()),
            resolver: Arc::new(Container::new()),
        }
    }

    #[must_use]
    pub fn config(mut self, config: BootConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn registrations(mut self, source: impl RegistrationSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    #[must_use]
    pub fn resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Share a resolver that other parts of the process also use.
    #[must_use]
    pub fn shared_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn build(self) -> Scheduler {
        let (state, _) = watch::channel(SchedulerState::Idle);
        let (events, _) = broadcast::channel(self.config.event_capacity.max(1));
        Scheduler {
            shared: Arc::new(Shared {
                id: self.id,
                config: self.config,
                state,
                events,
                finish: FinishSignal::new(),
                failure: Mutex::new(None),
                launch: Mutex::new(Some(Launch {
                    source: self.source,
                    resolver: self.resolver,
                })),
            }),
        }
    }
}
