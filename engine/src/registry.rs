//! Registration sources: where a scheduler gets its startup items.

use std::collections::HashMap;

use ignite_types::{EmptyIdentifierError, Phase, QueueItem, SchedulerId};

/// Supplies the startup items for a scheduler.
///
/// Queried exactly once, when `bootstrap` starts.
pub trait RegistrationSource: Send {
    fn registrations(&self, scheduler: &SchedulerId) -> Vec<QueueItem>;
}

/// An explicit, ordered list of startup items assembled at composition time.
#[derive(Debug, Clone, Default)]
pub struct Registrations {
    items: Vec<QueueItem>,
}

impl Registrations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, item: QueueItem) -> &mut Self {
        self.items.push(item);
        self
    }

    /// Register `target.method` for `phase` with the default timeout.
    pub fn add(
        &mut self,
        phase: Phase,
        target: &str,
        method: &str,
    ) -> Result<&mut Self, EmptyIdentifierError> {
        let item = QueueItem::parse(phase, target, method)?;
        Ok(self.register(item))
    }

    #[must_use]
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<QueueItem> for Registrations {
    fn from_iter<I: IntoIterator<Item = QueueItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl Extend<QueueItem> for Registrations {
    fn extend<I: IntoIterator<Item = QueueItem>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl RegistrationSource for Registrations {
    fn registrations(&self, _scheduler: &SchedulerId) -> Vec<QueueItem> {
        self.items.clone()
    }
}

/// Items scoped per scheduler; unknown schedulers get nothing.
impl RegistrationSource for HashMap<SchedulerId, Registrations> {
    fn registrations(&self, scheduler: &SchedulerId) -> Vec<QueueItem> {
        self.get(scheduler)
            .map(|registrations| registrations.items.clone())
            .unwrap_or_default()
    }
}
