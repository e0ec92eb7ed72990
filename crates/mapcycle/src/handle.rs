//! The handle other parts of the controller use to reach the engine.
//!
//! The engine lives inside one Tokio task. [`EngineHandle`] sends it
//! commands over an mpsc channel; commands that answer carry a
//! `oneshot::Sender` as their reply channel.

use std::sync::Arc;

use indexmap::IndexMap;
use mapcycle_protocol::MapUid;
use mapcycle_rotation::{
    Map, QueueEntry, QueueRejection, Restructure, RotationError, RotationEvent, Submitter,
};
use tokio::sync::{mpsc, oneshot};

use crate::MapcycleError;

/// Reply channel for a command.
pub(crate) type Reply<T> = oneshot::Sender<T>;

/// Commands sent to the engine task.
pub(crate) enum Command {
    AddToQueue {
        submitter: Submitter,
        uid: MapUid,
        reply: Reply<Result<QueueEntry, QueueRejection>>,
    },
    AddFirstToQueue {
        submitter: Submitter,
        uid: MapUid,
        reply: Reply<Result<QueueEntry, QueueRejection>>,
    },
    RemoveFromQueue {
        submitter: Submitter,
        uid: MapUid,
        reply: Reply<Result<QueueEntry, QueueRejection>>,
    },
    ClearQueue {
        submitter: Submitter,
        reply: Reply<Result<usize, QueueRejection>>,
    },
    QueueBuffer {
        reply: Reply<Vec<MapUid>>,
    },
    QueuedRanking {
        reply: Reply<IndexMap<MapUid, usize>>,
    },
    Queuer {
        uid: MapUid,
        reply: Reply<Option<Submitter>>,
    },
    NextQueuedEntry {
        reply: Reply<Option<QueueEntry>>,
    },
    QueueEntries {
        reply: Reply<Vec<QueueEntry>>,
    },
    CurrentMap {
        reply: Reply<Option<Arc<Map>>>,
    },
    Maps {
        offset: Option<usize>,
        length: Option<usize>,
        reply: Reply<Vec<Arc<Map>>>,
    },
    MapsCount {
        reply: Reply<usize>,
    },
    MapByUid {
        uid: MapUid,
        reply: Reply<Option<Arc<Map>>>,
    },
    DontQueueNextMapChange {
        reply: Reply<()>,
    },
    Restructure {
        reply: Reply<Result<Restructure, RotationError>>,
    },
    Sync {
        reply: Reply<Result<usize, RotationError>>,
    },
    SkipMap {
        reply: Reply<Result<Option<QueueEntry>, RotationError>>,
    },
    JumpToMap {
        uid: MapUid,
        reply: Reply<Result<(), RotationError>>,
    },
    RestartMap {
        reply: Reply<Result<(), RotationError>>,
    },
    ReplayCurrent {
        submitter: Submitter,
        reply: Reply<Result<QueueEntry, RotationError>>,
    },
    Shuffle {
        reply: Reply<Result<usize, RotationError>>,
    },
    AddMap {
        file_name: String,
        reply: Reply<Result<Arc<Map>, RotationError>>,
    },
    RemoveMaps {
        uids: Vec<MapUid>,
        reply: Reply<Result<usize, RotationError>>,
    },
    Subscribe {
        reply: Reply<mpsc::UnboundedReceiver<RotationEvent>>,
    },
    Shutdown,
}

/// Handle to a running engine task.
///
/// Cheap to clone; it's just an `mpsc::Sender` wrapper. Every method
/// fails with [`MapcycleError::Unavailable`] once the task has stopped.
/// Maps come back as shared `Arc<Map>` snapshots; queue entries as
/// copies.
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<Command>,
}

impl EngineHandle {
    pub(crate) fn new(sender: mpsc::Sender<Command>) -> Self {
        Self { sender }
    }

    /// Sends a command built around a fresh reply channel and waits for
    /// the answer.
    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, MapcycleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| MapcycleError::Unavailable)?;
        reply_rx.await.map_err(|_| MapcycleError::Unavailable)
    }

    // -----------------------------------------------------------------------
    // Queue
    // -----------------------------------------------------------------------

    /// Queues `uid` at the back. A refusal comes back as
    /// [`MapcycleError::Rejected`].
    pub async fn add_to_queue(
        &self,
        submitter: Submitter,
        uid: MapUid,
    ) -> Result<QueueEntry, MapcycleError> {
        Ok(self
            .request(|reply| Command::AddToQueue {
                submitter,
                uid,
                reply,
            })
            .await??)
    }

    /// Queues `uid` at the front.
    pub async fn add_first_to_queue(
        &self,
        submitter: Submitter,
        uid: MapUid,
    ) -> Result<QueueEntry, MapcycleError> {
        Ok(self
            .request(|reply| Command::AddFirstToQueue {
                submitter,
                uid,
                reply,
            })
            .await??)
    }

    /// Withdraws the request for `uid`.
    pub async fn remove_from_queue(
        &self,
        submitter: Submitter,
        uid: MapUid,
    ) -> Result<QueueEntry, MapcycleError> {
        Ok(self
            .request(|reply| Command::RemoveFromQueue {
                submitter,
                uid,
                reply,
            })
            .await??)
    }

    /// Drops every request. Returns how many there were.
    pub async fn clear_queue(&self, submitter: Submitter) -> Result<usize, MapcycleError> {
        Ok(self
            .request(|reply| Command::ClearQueue { submitter, reply })
            .await??)
    }

    /// The recent-play buffer, oldest first.
    pub async fn queue_buffer(&self) -> Result<Vec<MapUid>, MapcycleError> {
        self.request(|reply| Command::QueueBuffer { reply }).await
    }

    /// Queued uids with their 1-based position.
    pub async fn queued_ranking(&self) -> Result<IndexMap<MapUid, usize>, MapcycleError> {
        self.request(|reply| Command::QueuedRanking { reply }).await
    }

    /// Who queued `uid`.
    pub async fn queuer(&self, uid: MapUid) -> Result<Option<Submitter>, MapcycleError> {
        self.request(|reply| Command::Queuer { uid, reply }).await
    }

    /// The request at the head of the queue.
    pub async fn next_queued_entry(&self) -> Result<Option<QueueEntry>, MapcycleError> {
        self.request(|reply| Command::NextQueuedEntry { reply }).await
    }

    /// Every request in order.
    pub async fn queue_entries(&self) -> Result<Vec<QueueEntry>, MapcycleError> {
        self.request(|reply| Command::QueueEntries { reply }).await
    }

    /// Makes the next map end leave the queue alone.
    pub async fn dont_queue_next_map_change(&self) -> Result<(), MapcycleError> {
        self.request(|reply| Command::DontQueueNextMapChange { reply })
            .await
    }

    /// Puts the current map at the head of the queue.
    pub async fn replay_current(&self, submitter: Submitter) -> Result<QueueEntry, MapcycleError> {
        Ok(self
            .request(|reply| Command::ReplayCurrent { submitter, reply })
            .await??)
    }

    // -----------------------------------------------------------------------
    // Maps
    // -----------------------------------------------------------------------

    /// The map that began last.
    pub async fn current_map(&self) -> Result<Option<Arc<Map>>, MapcycleError> {
        self.request(|reply| Command::CurrentMap { reply }).await
    }

    /// Up to `length` cached maps starting at `offset`. `None` means from
    /// the first map and through the last one respectively.
    pub async fn maps(
        &self,
        offset: Option<usize>,
        length: Option<usize>,
    ) -> Result<Vec<Arc<Map>>, MapcycleError> {
        self.request(|reply| Command::Maps {
            offset,
            length,
            reply,
        })
        .await
    }

    /// Number of cached maps.
    pub async fn maps_count(&self) -> Result<usize, MapcycleError> {
        self.request(|reply| Command::MapsCount { reply }).await
    }

    /// Looks up a cached map.
    pub async fn map_by_uid(&self, uid: MapUid) -> Result<Option<Arc<Map>>, MapcycleError> {
        self.request(|reply| Command::MapByUid { uid, reply }).await
    }

    // -----------------------------------------------------------------------
    // Rotation
    // -----------------------------------------------------------------------

    /// Rotates the remote list around the current map if it drifted past
    /// the threshold.
    pub async fn restructure(&self) -> Result<Restructure, MapcycleError> {
        Ok(self
            .request(|reply| Command::Restructure { reply })
            .await??)
    }

    /// Re-reads the rotation from the server.
    pub async fn sync(&self) -> Result<usize, MapcycleError> {
        Ok(self.request(|reply| Command::Sync { reply }).await??)
    }

    /// Ends the current map; the queue head plays next.
    pub async fn skip_map(&self) -> Result<Option<QueueEntry>, MapcycleError> {
        Ok(self.request(|reply| Command::SkipMap { reply }).await??)
    }

    /// Switches straight to `uid`.
    pub async fn jump_to_map(&self, uid: MapUid) -> Result<(), MapcycleError> {
        Ok(self
            .request(|reply| Command::JumpToMap { uid, reply })
            .await??)
    }

    /// Restarts the current map.
    pub async fn restart_map(&self) -> Result<(), MapcycleError> {
        Ok(self
            .request(|reply| Command::RestartMap { reply })
            .await??)
    }

    /// Randomizes the order of every map but the current one.
    pub async fn shuffle(&self) -> Result<usize, MapcycleError> {
        Ok(self.request(|reply| Command::Shuffle { reply }).await??)
    }

    /// Adds a map file to the rotation.
    pub async fn add_map(&self, file_name: impl Into<String>) -> Result<Arc<Map>, MapcycleError> {
        let file_name = file_name.into();
        Ok(self
            .request(|reply| Command::AddMap { file_name, reply })
            .await??)
    }

    /// Removes maps from the rotation in one batch.
    pub async fn remove_maps(&self, uids: Vec<MapUid>) -> Result<usize, MapcycleError> {
        Ok(self
            .request(|reply| Command::RemoveMaps { uids, reply })
            .await??)
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    /// Registers for engine events.
    pub async fn subscribe(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<RotationEvent>, MapcycleError> {
        self.request(|reply| Command::Subscribe { reply }).await
    }

    /// Tells the engine task to stop.
    pub async fn shutdown(&self) -> Result<(), MapcycleError> {
        self.sender
            .send(Command::Shutdown)
            .await
            .map_err(|_| MapcycleError::Unavailable)
    }
}
