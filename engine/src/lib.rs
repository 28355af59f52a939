//! Staged bootstrap scheduler.
//!
//! Startup items are registered ahead of time as `(phase, target, method,
//! timeout)` tuples. [`Scheduler::bootstrap`] runs them through four phases
//! in fixed order:
//!
//! ```text
//! FrameworkBeforeBoot -> Before -> After -> FrameworkAfterBoot -> done()
//! ```
//!
//! Within a phase items run strictly one at a time in registration order.
//! An item only advances when its method calls [`Completion::complete`];
//! the method's own return is never observed, so a routine may finish
//! synchronously or hand the handle to a task that completes much later.
//! A per-item watchdog warns about items that overrun their timeout but
//! never aborts or retries them.

mod completion;
mod driver;
mod error;
mod events;
mod queue;
mod registry;
mod resolver;
mod scheduler;
mod signal;
pub mod timer;
mod watchdog;

pub use completion::Completion;
pub use error::{BootstrapError, ResolveError};
pub use events::BootEvent;
pub use queue::PhaseQueue;
pub use registry::{RegistrationSource, Registrations};
pub use resolver::{Component, Container, MethodTable, Resolver, StartupMethod};
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use signal::FinishSignal;

pub use ignite_config::BootConfig;
pub use ignite_types::{
    DEFAULT_ITEM_TIMEOUT, ItemKey, MethodName, MissingMethodPolicy, Phase, QueueItem, SchedulerId,
    SchedulerState, TargetId,
};
