//! Typed engine events and their fan-out.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{Map, QueueEntry};

/// What happened to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueChange {
    Added,
    AddedFirst,
    Removed,
    Cleared,
    /// Dropped at map end because the submitter left.
    Skipped,
    /// Dropped because the map left the rotation.
    Purged,
}

/// An event published by the engine.
#[derive(Debug, Clone)]
pub enum RotationEvent {
    /// The cache was refreshed from the server.
    MapsUpdated { count: usize },
    /// A map began.
    BeginMap(Arc<Map>),
    /// A map ended.
    EndMap(Arc<Map>),
    /// The queue changed. `entry` is `None` for [`QueueChange::Cleared`].
    QueueChanged {
        change: QueueChange,
        entry: Option<QueueEntry>,
    },
    /// A queued map was picked and sent to the server as the next map.
    NextMapChosen(QueueEntry),
}

/// Delivers each event to every live subscriber.
///
/// Subscribers whose receiver was dropped are forgotten on the next emit.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<mpsc::UnboundedSender<RotationEvent>>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber. It sees events emitted from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RotationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Sends `event` to everyone still listening.
    pub fn emit(&mut self, event: RotationEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers as of the last emit.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
