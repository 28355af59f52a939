//! Per-item diagnostic timer.
//!
//! A watchdog only reports. When it expires it logs a warning and emits
//! [`BootEvent::WatchdogExpired`]; the item stays pending and nothing is
//! retried, skipped or re-armed.

use std::time::Duration;

use tokio::sync::broadcast;

use ignite_types::{ItemKey, Phase};

use crate::events::BootEvent;
use crate::timer::{self, TimerHandle};

#[derive(Debug)]
pub(crate) struct Watchdog {
    handle: TimerHandle,
}

impl Watchdog {
    pub(crate) fn arm(
        phase: Phase,
        key: ItemKey,
        timeout: Duration,
        events: broadcast::Sender<BootEvent>,
    ) -> Self {
        let handle = timer::schedule_once(timeout, move || {
            tracing::warn!(
                phase = %phase,
                target = %key.target(),
                method = %key.method(),
                timeout_ms = timeout.as_millis() as u64,
                "Startup item has not completed within its timeout; still waiting"
            );
            let _ = events.send(BootEvent::WatchdogExpired {
                phase,
                key,
                timeout,
            });
        });
        Self { handle }
    }

    /// Handle shared with the item's completion so completing cancels the timer.
    pub(crate) fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    pub(crate) fn cancel(&self) {
        self.handle.cancel();
    }
}
