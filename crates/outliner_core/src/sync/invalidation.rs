//! Store invalidation events.
//!
//! # Invariants
//! - An emitter never publishes the same revision twice in a row.
//! - A tracker only accepts revisions strictly greater than every revision it
//!   has already accepted.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Pushed whenever the note store revision changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInvalidated {
    pub store_id: u64,
}

/// Store-side publisher.
#[derive(Debug, Default)]
pub struct InvalidationEmitter {
    last_emitted: Option<u64>,
    subscribers: Vec<Sender<StoreInvalidated>>,
}

impl InvalidationEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&mut self) -> Receiver<StoreInvalidated> {
        let (sender, receiver) = channel();
        self.subscribers.push(sender);
        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn last_emitted(&self) -> Option<u64> {
        self.last_emitted
    }

    /// Publishes `store_id` unless it was the last published revision.
    ///
    /// Returns the event when one was published. Subscribers whose receiver
    /// was dropped are pruned.
    pub fn publish_if_changed(&mut self, store_id: u64) -> Option<StoreInvalidated> {
        if self.last_emitted == Some(store_id) {
            return None;
        }

        let event = StoreInvalidated { store_id };
        self.subscribers
            .retain(|subscriber| subscriber.send(event).is_ok());
        self.last_emitted = Some(store_id);
        debug!(
            "event=store_invalidated module=sync status=ok store_id={store_id} subscribers={}",
            self.subscribers.len()
        );
        Some(event)
    }
}

/// Consumer-side guard against stale notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationTracker {
    last_seen: Option<u64>,
}

impl InvalidationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest store id accepted so far.
    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }

    /// Accepts `event` if it is newer than everything seen before.
    pub fn observe(&mut self, event: StoreInvalidated) -> bool {
        match self.last_seen {
            Some(seen) if event.store_id <= seen => {
                trace!(
                    "event=store_invalidated module=sync status=ignored store_id={} last_seen={seen}",
                    event.store_id
                );
                false
            }
            _ => {
                self.last_seen = Some(event.store_id);
                true
            }
        }
    }
}
