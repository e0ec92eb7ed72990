//! The map engine: cache, lifecycle, queue and restructurer behind one
//! owner.
//!
//! [`MapEngine`] is not shared. Whoever owns it (normally the runtime's
//! actor task) calls one method at a time, so none of its state needs
//! locking. Every method that talks to the server awaits the answer
//! before returning.

use std::sync::Arc;

use mapcycle_protocol::{MapUid, PlayerId, RemoteCall};
use mapcycle_rpc::{Multicall, RemoteClient, RemoteError};
use mapcycle_session::{AuthLevel, PlayerRoster, SessionConfig, SessionError};
use rand::seq::SliceRandom;
use tokio::sync::mpsc;

use crate::{
    EventBus, LifecycleState, Map, MapCache, MapLifecycle, MapQueue, QueueChange, QueueEntry,
    QueueRejection, Restructure, RotationConfig, RotationError, RotationEvent, Submitter,
    rotate_after,
};

/// Keeps the local view of one server's rotation and runs the jukebox.
pub struct MapEngine<R: RemoteClient> {
    remote: R,
    config: RotationConfig,
    cache: MapCache,
    lifecycle: MapLifecycle,
    queue: MapQueue,
    roster: PlayerRoster,
    events: EventBus,
}

impl<R: RemoteClient> MapEngine<R> {
    /// Creates an engine for the server behind `remote`. Nothing is read
    /// from the server until [`start`](Self::start) or [`sync`](Self::sync).
    pub fn new(remote: R, config: RotationConfig, session_config: SessionConfig) -> Self {
        let config = config.validated();
        Self {
            remote,
            queue: MapQueue::new(config.queue.clone()),
            config,
            cache: MapCache::new(),
            lifecycle: MapLifecycle::new(),
            roster: PlayerRoster::new(session_config),
            events: EventBus::new(),
        }
    }

    /// Attaches to the server: reads the rotation and the players already
    /// on it, then begins the map being played so the lifecycle is active.
    ///
    /// Players found here join the roster at [`AuthLevel::Player`]; the
    /// caller may raise their level with [`player_connected`](Self::player_connected).
    pub async fn start(&mut self) -> Result<(), RotationError> {
        self.sync().await?;
        if let Err(err) = self.sync_players().await {
            tracing::warn!(error = %err, "reading the player list failed");
        }
        let current = self.remote.current_map_info().await?;
        tracing::info!(
            maps = self.cache.len(),
            players = self.roster.connected_count(),
            current = %current.uid,
            "engine attached"
        );
        self.begin_map(current.uid, false).await
    }

    /// Re-reads who is on the server and updates the roster to match.
    /// Returns the players that were not known to be connected.
    pub async fn sync_players(&mut self) -> Result<Vec<PlayerId>, RotationError> {
        let present = self.remote.player_list().await?;
        Ok(self.roster.reconcile(&present))
    }

    // -----------------------------------------------------------------------
    // Cache
    // -----------------------------------------------------------------------

    /// Re-reads the rotation from the server.
    ///
    /// On failure the cache is left as it was. Queued maps that left the
    /// rotation are dropped.
    pub async fn sync(&mut self) -> Result<usize, RotationError> {
        let count = self
            .cache
            .sync(
                &self.remote,
                self.config.sync_page_size,
                self.config.sync_max_maps,
            )
            .await?;
        tracing::info!(count, "map list synchronized");
        self.events.emit(RotationEvent::MapsUpdated { count });

        for entry in self.queue.purge_missing(&self.cache) {
            tracing::info!(
                uid = %entry.map_uid,
                submitter = %entry.submitter,
                "queued map left the rotation"
            );
            self.emit_queue(QueueChange::Purged, Some(entry));
        }
        Ok(count)
    }

    /// Reacts to the server announcing a list change. A change that only
    /// moved the next-map pointer needs no resync.
    pub async fn on_map_list_modified(
        &mut self,
        list_changed: bool,
    ) -> Result<Option<usize>, RotationError> {
        if !list_changed {
            return Ok(None);
        }
        self.sync().await.map(Some)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Handles the server announcing that `uid` began.
    ///
    /// A restart first ends the current map. A repeated begin for the
    /// active map is ignored. A begin for another map while one is still
    /// active ends that one first. Unknown maps are fetched from the
    /// server and appended to the cache.
    pub async fn begin_map(&mut self, uid: MapUid, is_restart: bool) -> Result<(), RotationError> {
        if is_restart {
            self.end_map_logged().await;
        }
        if self.lifecycle.is_active_for(&uid) {
            tracing::debug!(%uid, "duplicate map begin ignored");
            return Ok(());
        }
        let map = self.resolve(&uid).await?;
        if self.lifecycle.state() == LifecycleState::Active {
            tracing::warn!(%uid, "map began before the previous one ended");
            self.end_map_logged().await;
        }

        self.lifecycle.activate(Arc::clone(&map));
        self.queue.on_map_begin(map.uid());
        tracing::info!(
            uid = %map.uid(),
            name = %map.name(),
            restart = is_restart,
            "map began"
        );
        self.events.emit(RotationEvent::BeginMap(map));

        if self.config.restructure_on_begin {
            if let Err(err) = self.restructure().await {
                tracing::warn!(error = %err, "restructure after map begin failed");
            }
        }
        Ok(())
    }

    /// Handles the server announcing that the current map ended.
    ///
    /// Only the first call after a begin does anything: it publishes the
    /// end and lets the queue pick the next map. Returns the picked entry.
    pub async fn end_map(&mut self) -> Result<Option<QueueEntry>, RotationError> {
        let Some(map) = self.lifecycle.end() else {
            tracing::debug!("map end ignored, no active map");
            return Ok(None);
        };
        tracing::info!(uid = %map.uid(), "map ended");
        self.events.emit(RotationEvent::EndMap(map));
        self.select_next_map().await
    }

    async fn end_map_logged(&mut self) {
        if let Err(err) = self.end_map().await {
            tracing::warn!(error = %err, "map end handling failed");
        }
    }

    async fn resolve(&mut self, uid: &MapUid) -> Result<Arc<Map>, RotationError> {
        if let Some(map) = self.cache.get(uid) {
            return Ok(Arc::clone(map));
        }
        let info = self.remote.current_map_info().await?;
        if &info.uid != uid {
            tracing::warn!(%uid, reported = %info.uid, "server reports another current map");
            return Err(RotationError::NotFound(uid.clone()));
        }
        tracing::debug!(%uid, "current map not cached, appended");
        Ok(self.cache.insert(info))
    }

    /// Runs the queue's end-of-map choice and pushes the result to the
    /// server.
    async fn select_next_map(&mut self) -> Result<Option<QueueEntry>, RotationError> {
        let outcome = self.queue.on_map_end(&self.roster);
        if outcome.suppressed {
            tracing::debug!("next map already decided, queue untouched");
            return Ok(None);
        }
        for entry in outcome.skipped {
            tracing::info!(
                uid = %entry.map_uid,
                submitter = %entry.submitter,
                "submitter left, queued map skipped"
            );
            self.emit_queue(QueueChange::Skipped, Some(entry));
        }

        let Some(entry) = outcome.chosen else {
            return Ok(None);
        };
        match self.remote.set_next_map(&entry.map_uid).await {
            Ok(()) => {
                tracing::info!(
                    uid = %entry.map_uid,
                    submitter = %entry.submitter,
                    "next map set from queue"
                );
            }
            Err(RemoteError::RotationChangeInProgress) => {
                tracing::debug!(uid = %entry.map_uid, "rotation change in progress, next map not set");
            }
            Err(err) => {
                tracing::warn!(uid = %entry.map_uid, error = %err, "setting next map failed");
                return Err(err.into());
            }
        }
        self.events.emit(RotationEvent::NextMapChosen(entry.clone()));
        Ok(Some(entry))
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Records a player joining with the level the authorizer granted.
    pub fn player_connected(&mut self, player: PlayerId, level: AuthLevel) {
        self.roster.connect(player, level);
    }

    /// Records a player leaving.
    pub fn player_disconnected(&mut self, player: &PlayerId) -> Result<(), SessionError> {
        self.roster.disconnect(player)
    }

    /// Forgets players who left longer ago than the grace period.
    pub fn expire_sessions(&mut self) -> Vec<PlayerId> {
        self.roster.expire_stale()
    }

    // -----------------------------------------------------------------------
    // Queue
    // -----------------------------------------------------------------------

    /// Queues `uid` at the back on behalf of `submitter`.
    pub fn add_to_queue(
        &mut self,
        submitter: Submitter,
        uid: MapUid,
    ) -> Result<QueueEntry, QueueRejection> {
        let who = submitter.to_string();
        self.note_submitter(&submitter);
        match self.queue.add(submitter, uid, &self.cache, &self.roster) {
            Ok(entry) => {
                tracing::info!(uid = %entry.map_uid, submitter = %who, "map queued");
                self.emit_queue(QueueChange::Added, Some(entry.clone()));
                Ok(entry)
            }
            Err(rejection) => {
                tracing::debug!(submitter = %who, %rejection, "queue request refused");
                Err(rejection)
            }
        }
    }

    /// Queues `uid` at the front, ahead of every other request.
    pub fn add_first_to_queue(
        &mut self,
        submitter: Submitter,
        uid: MapUid,
    ) -> Result<QueueEntry, QueueRejection> {
        self.note_submitter(&submitter);
        let entry = self.queue.add_first(submitter, uid, &self.cache, &self.roster)?;
        tracing::info!(
            uid = %entry.map_uid,
            submitter = %entry.submitter,
            "map queued first"
        );
        self.emit_queue(QueueChange::AddedFirst, Some(entry.clone()));
        Ok(entry)
    }

    /// A player making a request is on the server, even if no connect
    /// was seen for them.
    fn note_submitter(&mut self, submitter: &Submitter) {
        if let Some(player) = submitter.player() {
            if self.roster.get(player).is_none() {
                tracing::debug!(%player, "request from unseen player, marked connected");
                self.roster.connect(player.clone(), AuthLevel::Player);
            }
        }
    }

    /// Withdraws the request for `uid`.
    pub fn remove_from_queue(
        &mut self,
        submitter: &Submitter,
        uid: &MapUid,
    ) -> Result<QueueEntry, QueueRejection> {
        let entry = self.queue.remove(uid)?;
        tracing::info!(%uid, by = %submitter, "map removed from queue");
        self.emit_queue(QueueChange::Removed, Some(entry.clone()));
        Ok(entry)
    }

    /// Drops every request. Returns how many there were.
    pub fn clear_queue(&mut self, submitter: &Submitter) -> Result<usize, QueueRejection> {
        let cleared = self.queue.clear(submitter, &self.roster)?;
        tracing::info!(count = cleared.len(), by = %submitter, "queue cleared");
        self.emit_queue(QueueChange::Cleared, None);
        Ok(cleared.len())
    }

    /// Makes the next map end leave the queue alone.
    pub fn dont_queue_next_map_change(&mut self) {
        tracing::debug!("next map change will not consume the queue");
        self.queue.dont_queue_next_map_change();
    }

    /// Puts the current map at the head of the queue.
    pub fn replay_current(&mut self, submitter: Submitter) -> Result<QueueEntry, RotationError> {
        let uid = self
            .lifecycle
            .current()
            .map(|m| m.uid().clone())
            .ok_or(RotationError::NoCurrentMap)?;
        self.add_first_to_queue(submitter, uid.clone())
            .map_err(|_| RotationError::NotFound(uid))
    }

    fn emit_queue(&mut self, change: QueueChange, entry: Option<QueueEntry>) {
        self.events
            .emit(RotationEvent::QueueChanged { change, entry });
    }

    // -----------------------------------------------------------------------
    // Rotation changes
    // -----------------------------------------------------------------------

    /// Rotates the remote list so the maps after the current one come
    /// first, once the current map sits at `restructure_threshold` or
    /// later. Below the threshold no call is made.
    pub async fn restructure(&mut self) -> Result<Restructure, RotationError> {
        let Some(position) = self
            .lifecycle
            .current()
            .and_then(|current| self.cache.index_of(current.uid()))
        else {
            return Ok(Restructure::Unchanged);
        };
        if position < self.config.restructure_threshold {
            return Ok(Restructure::Unchanged);
        }

        let order: Vec<String> = self.cache.iter().map(|m| m.file_name()).collect();
        let upcoming = rotate_after(&order, position);
        match self.remote.choose_next_maps(upcoming).await {
            Ok(accepted) => {
                tracing::info!(position, accepted, "rotation restructured");
                Ok(Restructure::Submitted(accepted))
            }
            Err(err) => {
                tracing::warn!(position, error = %err, "rotation restructure failed");
                Err(err.into())
            }
        }
    }

    /// Puts every map except the current one in random order.
    pub async fn shuffle(&mut self) -> Result<usize, RotationError> {
        let current = self
            .lifecycle
            .current()
            .map(|m| m.uid().clone())
            .ok_or(RotationError::NoCurrentMap)?;
        let mut file_names: Vec<String> = self
            .cache
            .iter()
            .filter(|m| m.uid() != &current)
            .map(|m| m.file_name())
            .collect();
        file_names.shuffle(&mut rand::rng());

        let accepted = self.remote.choose_next_maps(file_names).await?;
        tracing::info!(accepted, "rotation shuffled");
        Ok(accepted)
    }

    /// Ends the current map now. The head of the queue (if any) plays
    /// next; the resulting end event will not consume another request.
    pub async fn skip_map(&mut self) -> Result<Option<QueueEntry>, RotationError> {
        let chosen = match self.select_next_map().await {
            Ok(chosen) => chosen,
            Err(err) => {
                tracing::warn!(error = %err, "queue selection failed, skipping anyway");
                None
            }
        };
        self.queue.dont_queue_next_map_change();
        if let Err(err) = self.remote.next_map().await {
            self.queue.disarm_dont_queue();
            tracing::warn!(error = %err, "skip failed");
            return Err(err.into());
        }
        tracing::info!(next = ?chosen.as_ref().map(|e| &e.map_uid), "map skipped");
        Ok(chosen)
    }

    /// Switches straight to `uid`, bypassing the queue.
    pub async fn jump_to_map(&mut self, uid: &MapUid) -> Result<(), RotationError> {
        if !self.cache.contains(uid) {
            return Err(RotationError::NotFound(uid.clone()));
        }
        self.queue.dont_queue_next_map_change();
        if let Err(err) = self.remote.jump_to_map(uid).await {
            self.queue.disarm_dont_queue();
            tracing::warn!(%uid, error = %err, "jump failed");
            return Err(err.into());
        }
        tracing::info!(%uid, "jumped to map");
        Ok(())
    }

    /// Asks the server to restart the current map.
    pub async fn restart_map(&mut self) -> Result<(), RotationError> {
        self.remote.restart_map().await?;
        tracing::info!("map restart requested");
        Ok(())
    }

    /// Adds a map file from the server's map directory to the rotation.
    pub async fn add_map(&mut self, file_name: &str) -> Result<Arc<Map>, RotationError> {
        let info = self.remote.map_info(file_name).await?;
        if let Err(err) = self.remote.add_map(file_name).await {
            tracing::warn!(file_name, error = %err, "adding map failed");
            return Err(err.into());
        }
        self.sync().await?;
        tracing::info!(uid = %info.uid, file_name, "map added");
        self.cache
            .get(&info.uid)
            .cloned()
            .ok_or(RotationError::NotFound(info.uid))
    }

    /// Removes maps from the rotation in one batch. Unknown uids are
    /// ignored. Returns how many the server removed.
    pub async fn remove_maps(&mut self, uids: &[MapUid]) -> Result<usize, RotationError> {
        let mut batch = Multicall::new();
        for uid in uids {
            match self.cache.get(uid) {
                Some(map) => batch.enqueue(RemoteCall::RemoveMap {
                    file_name: map.file_name(),
                }),
                None => tracing::debug!(%uid, "not in rotation, not removed"),
            }
        }
        if batch.is_empty() {
            return Ok(0);
        }

        let results = batch.flush(&self.remote).await?;
        let mut removed = 0;
        for result in &results {
            match result {
                Ok(_) => removed += 1,
                Err(err) => tracing::warn!(error = %err, "map removal refused"),
            }
        }
        self.sync().await?;
        tracing::info!(removed, requested = uids.len(), "maps removed");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Registers an event subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RotationEvent> {
        self.events.subscribe()
    }

    /// Applies a new config. The queue policy and buffer size take effect
    /// immediately.
    pub fn set_config(&mut self, config: RotationConfig) {
        let config = config.validated();
        self.queue.set_config(config.queue.clone());
        self.config = config;
    }

    /// The active config.
    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// The map that began last.
    pub fn current_map(&self) -> Option<Arc<Map>> {
        self.lifecycle.current().cloned()
    }

    /// The lifecycle state of the current map.
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// The cached rotation.
    pub fn cache(&self) -> &MapCache {
        &self.cache
    }

    /// The jukebox.
    pub fn queue(&self) -> &MapQueue {
        &self.queue
    }

    /// Who is on the server.
    pub fn roster(&self) -> &PlayerRoster {
        &self.roster
    }

    /// The remote client.
    pub fn remote(&self) -> &R {
        &self.remote
    }
}
