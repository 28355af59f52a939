//! One-shot "fully booted" notification.

use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

type FinishCallback = Box<dyn FnOnce() + Send>;

/// Pending callbacks live in the `Pending` variant; firing moves to `Fired`
/// and drops the list, so nothing can be replayed.
enum Slot {
    Pending(Vec<FinishCallback>),
    Fired,
}

pub struct FinishSignal {
    slot: Mutex<Slot>,
}

impl FinishSignal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending(Vec::new())),
        }
    }

    /// Register `callback` for the signal.
    ///
    /// Returns `false` (and drops the callback) if the signal already fired.
    pub fn subscribe(&self, callback: impl FnOnce() + Send + 'static) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match &mut *slot {
            Slot::Pending(callbacks) => {
                callbacks.push(Box::new(callback));
                true
            }
            Slot::Fired => false,
        }
    }

    /// Fire the signal, invoking every registered callback in registration order.
    ///
    /// Returns the number of callbacks invoked; `None` if it had already fired.
    /// Callbacks run outside the lock, so they may call `subscribe` themselves.
    /// A panicking callback is logged and the remaining ones still run.
    pub fn fire(&self) -> Option<usize> {
        let callbacks = {
            let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match mem::replace(&mut *slot, Slot::Fired) {
                Slot::Pending(callbacks) => callbacks,
                Slot::Fired => return None,
            }
        };
        let count = callbacks.len();
        for (index, callback) in callbacks.into_iter().enumerate() {
            if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
                tracing::error!(callback = index, "Finish callback panicked; continuing with the rest");
            }
        }
        Some(count)
    }

    #[must_use]
    pub fn is_fired(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        matches!(*slot, Slot::Fired)
    }
}

impl Default for FinishSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(signal: &FinishSignal) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let hook = Arc::clone(&count);
        assert!(signal.subscribe(move || {
            hook.fetch_add(1, Ordering::SeqCst);
        }));
        count
    }

    #[test]
    fn test_fire_invokes_each_callback_once() {
        let signal = FinishSignal::new();
        let first = counter(&signal);
        let second = counter(&signal);

        assert_eq!(signal.fire(), Some(2));
        assert_eq!(signal.fire(), None);
        assert!(signal.is_fired());
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_subscription_is_never_invoked() {
        let signal = FinishSignal::new();
        assert_eq!(signal.fire(), Some(0));

        let late = Arc::new(AtomicUsize::new(0));
        let hook = Arc::clone(&late);
        assert!(!signal.subscribe(move || {
            hook.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(signal.fire(), None);
        assert_eq!(late.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callbacks_run_in_registration_order() {
        let signal = FinishSignal::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let sink = Arc::clone(&order);
            signal.subscribe(move || sink.lock().unwrap().push(n));
        }
        signal.fire();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_panicking_callback_does_not_skip_the_rest() {
        let signal = FinishSignal::new();
        let before = counter(&signal);
        signal.subscribe(|| panic!("callback failure"));
        let after = counter(&signal);

        assert_eq!(signal.fire(), Some(3));
        assert!(signal.is_fired());
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_subscribe_during_fire() {
        let signal = Arc::new(FinishSignal::new());
        let inner = Arc::clone(&signal);
        let accepted = Arc::new(Mutex::new(None));
        let record = Arc::clone(&accepted);
        signal.subscribe(move || {
            *record.lock().unwrap() = Some(inner.subscribe(|| {}));
        });

        assert_eq!(signal.fire(), Some(1));
        assert_eq!(*accepted.lock().unwrap(), Some(false));
    }
}
