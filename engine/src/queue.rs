//! Pending startup items for a single phase.
//!
//! A [`PhaseQueue`] is an insertion-ordered map from [`ItemKey`] to
//! [`QueueItem`] with a size signal attached: size listeners hear the count
//! after every mutation, and the drained callback fires exactly once, the
//! first time the queue is observed empty.

use std::collections::{BTreeMap, HashMap};
use std::{fmt, mem};

use ignite_types::{ItemKey, Phase, QueueItem};

type SizeListener = Box<dyn FnMut(usize) + Send>;
type DrainedCallback = Box<dyn FnOnce() + Send>;

/// One-shot drained notification. Firing is the state transition.
enum Drained {
    Armed(Option<DrainedCallback>),
    Fired,
}

pub struct PhaseQueue {
    phase: Phase,
    /// Insertion sequence → item. `BTreeMap` keeps registration order.
    entries: BTreeMap<u64, QueueItem>,
    /// Key → insertion sequence, for overwrite and removal by key.
    positions: HashMap<ItemKey, u64>,
    next_seq: u64,
    size_listeners: Vec<SizeListener>,
    drained: Drained,
}

impl PhaseQueue {
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            entries: BTreeMap::new(),
            positions: HashMap::new(),
            next_seq: 0,
            size_listeners: Vec::new(),
            drained: Drained::Armed(None),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Insert `item`, or overwrite the item with the same key in place.
    ///
    /// An overwritten item keeps its original position. Returns the new size.
    pub fn register(&mut self, item: QueueItem) -> usize {
        match self.positions.get(item.key()) {
            Some(&seq) => {
                tracing::debug!(
                    phase = %self.phase,
                    key = %item.key(),
                    "Startup item re-registered, last registration wins"
                );
                self.entries.insert(seq, item);
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.positions.insert(item.key().clone(), seq);
                self.entries.insert(seq, item);
            }
        }
        self.notify_size();
        self.size()
    }

    /// The earliest-registered item still pending.
    #[must_use]
    pub fn peek_earliest(&self) -> Option<&QueueItem> {
        self.entries.values().next()
    }

    /// Remove the item with `key`, returning the new size.
    ///
    /// Unknown keys leave the queue untouched. Reaching zero fires the drained
    /// callback if it has not fired yet.
    pub fn remove(&mut self, key: &ItemKey) -> usize {
        let Some(seq) = self.positions.remove(key) else {
            return self.size();
        };
        self.entries.remove(&seq);
        self.notify_size();
        self.check_drained();
        self.size()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the drained event has already been emitted.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        matches!(self.drained, Drained::Fired)
    }

    /// Add a listener that receives the count after every mutation.
    pub fn subscribe_size(&mut self, listener: impl FnMut(usize) + Send + 'static) {
        self.size_listeners.push(Box::new(listener));
    }

    /// Install the drained callback, replacing any previous one.
    ///
    /// There is no replay: installing after the event fired has no effect.
    pub fn on_drained(&mut self, callback: impl FnOnce() + Send + 'static) {
        match &mut self.drained {
            Drained::Armed(slot) => *slot = Some(Box::new(callback)),
            Drained::Fired => {
                tracing::debug!(phase = %self.phase, "Drained callback installed after drain");
            }
        }
    }

    /// Emit the drained event if the queue is empty and has not drained yet.
    ///
    /// Returns `true` when this call fired the event.
    pub fn check_drained(&mut self) -> bool {
        if !self.is_empty() || self.is_drained() {
            return false;
        }
        if let Drained::Armed(callback) = mem::replace(&mut self.drained, Drained::Fired)
            && let Some(callback) = callback
        {
            callback();
        }
        true
    }

    fn notify_size(&mut self) {
        let size = self.entries.len();
        for listener in &mut self.size_listeners {
            listener(size);
        }
    }
}

impl fmt::Debug for PhaseQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseQueue")
            .field("phase", &self.phase)
            .field("size", &self.entries.len())
            .field("drained", &self.is_drained())
            .finish_non_exhaustive()
    }
}
