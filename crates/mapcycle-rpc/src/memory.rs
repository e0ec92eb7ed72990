//! A simulated game server that lives in process memory.
//!
//! [`InMemoryServer`] answers [`RemoteCall`]s the way a dedicated server
//! does (pagination faults, rotation locks, list limits) and pushes the
//! matching [`ServerCallback`]s into a channel, so the full event loop can
//! run without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mapcycle_protocol::{MapInfo, MapUid, PlayerId, RemoteCall, RemoteReply, ServerCallback};
use tokio::sync::mpsc;

use crate::{CallResult, RemoteClient, RemoteError};

/// Default rotation size limit.
const DEFAULT_MAX_MAPS: usize = 5_000;

struct ServerState {
    /// Every map file the server can load.
    library: Vec<MapInfo>,
    /// The maps in play order.
    rotation: Vec<MapInfo>,
    /// Index of the current map in `rotation`.
    current: usize,
    next: Option<MapUid>,
    /// Logins currently on the server.
    players: Vec<PlayerId>,
    max_maps: usize,
    calls: Vec<RemoteCall>,
    /// Injected faults, matched by method name.
    faults: VecDeque<(&'static str, RemoteError)>,
    feed: Option<mpsc::UnboundedSender<ServerCallback>>,
}

impl ServerState {
    fn emit(&self, callback: ServerCallback) {
        if let Some(feed) = &self.feed {
            let _ = feed.send(callback);
        }
    }

    fn position(&self, uid: &MapUid) -> Option<usize> {
        self.rotation.iter().position(|m| &m.uid == uid)
    }

    fn position_of_file(&self, file_name: &str) -> Option<usize> {
        self.rotation.iter().position(|m| m.file_name == file_name)
    }

    fn take_fault(&mut self, method: &str) -> Option<RemoteError> {
        let index = self.faults.iter().position(|(m, _)| *m == method)?;
        self.faults.remove(index).map(|(_, err)| err)
    }

    /// Moves to the map at `index`, emitting the end/begin pair.
    fn switch_to(&mut self, index: usize) {
        self.emit(ServerCallback::EndMap);
        self.current = index;
        self.next = None;
        let uid = self.rotation[index].uid.clone();
        self.emit(ServerCallback::BeginMap { uid, restart: false });
    }

    fn handle(&mut self, call: RemoteCall) -> CallResult {
        match call {
            RemoteCall::GetMapList { offset, length } => {
                if offset >= self.rotation.len() {
                    return Err(RemoteError::IndexOutOfBounds);
                }
                let end = offset.saturating_add(length).min(self.rotation.len());
                Ok(RemoteReply::Maps(self.rotation[offset..end].to_vec()))
            }

            RemoteCall::GetCurrentMapInfo => self
                .rotation
                .get(self.current)
                .cloned()
                .map(RemoteReply::Map)
                .ok_or(RemoteError::InvalidMapReference),

            RemoteCall::GetMapInfo { file_name } => self
                .library
                .iter()
                .find(|m| m.file_name == file_name)
                .cloned()
                .map(RemoteReply::Map)
                .ok_or(RemoteError::InvalidMapReference),

            RemoteCall::GetPlayerList => Ok(RemoteReply::Players(self.players.clone())),

            RemoteCall::SetNextMap { uid } => {
                if self.position(&uid).is_none() {
                    return Err(RemoteError::MapNotInList);
                }
                self.next = Some(uid);
                self.emit(ServerCallback::MapListModified { list_changed: false });
                Ok(RemoteReply::Done(1))
            }

            RemoteCall::ChooseNextMaps { file_names } => {
                let mut listed = Vec::with_capacity(file_names.len());
                for file_name in &file_names {
                    let index = self
                        .position_of_file(file_name)
                        .ok_or(RemoteError::MapNotInList)?;
                    if index == self.current || listed.contains(&index) {
                        return Err(RemoteError::InvalidMapReference);
                    }
                    listed.push(index);
                }

                let mut order = Vec::with_capacity(self.rotation.len());
                order.push(self.current);
                order.extend(listed.iter().copied());
                order.extend(
                    (0..self.rotation.len())
                        .filter(|i| *i != self.current && !listed.contains(i)),
                );
                self.rotation = order.into_iter().map(|i| self.rotation[i].clone()).collect();
                self.current = 0;
                self.emit(ServerCallback::MapListModified { list_changed: true });
                Ok(RemoteReply::Done(listed.len()))
            }

            RemoteCall::AddMap { file_name } => {
                let info = self
                    .library
                    .iter()
                    .find(|m| m.file_name == file_name)
                    .cloned()
                    .ok_or(RemoteError::InvalidMapReference)?;
                if self.position(&info.uid).is_some() {
                    return Err(RemoteError::InvalidMapReference);
                }
                if self.rotation.len() >= self.max_maps {
                    return Err(RemoteError::MapListFull);
                }
                self.rotation.push(info);
                self.emit(ServerCallback::MapListModified { list_changed: true });
                Ok(RemoteReply::Done(1))
            }

            RemoteCall::RemoveMap { file_name } => {
                let index = self
                    .position_of_file(&file_name)
                    .ok_or(RemoteError::MapNotInList)?;
                if index == self.current {
                    return Err(RemoteError::InvalidMapReference);
                }
                let removed = self.rotation.remove(index);
                if index < self.current {
                    self.current -= 1;
                }
                if self.next.as_ref() == Some(&removed.uid) {
                    self.next = None;
                }
                self.emit(ServerCallback::MapListModified { list_changed: true });
                Ok(RemoteReply::Done(1))
            }

            RemoteCall::NextMap => {
                if self.rotation.is_empty() {
                    return Err(RemoteError::InvalidMapReference);
                }
                let index = self
                    .next
                    .as_ref()
                    .and_then(|uid| self.position(uid))
                    .unwrap_or((self.current + 1) % self.rotation.len());
                self.switch_to(index);
                Ok(RemoteReply::Done(1))
            }

            RemoteCall::RestartMap => {
                let uid = self
                    .rotation
                    .get(self.current)
                    .map(|m| m.uid.clone())
                    .ok_or(RemoteError::InvalidMapReference)?;
                self.emit(ServerCallback::BeginMap { uid, restart: true });
                Ok(RemoteReply::Done(1))
            }

            RemoteCall::JumpToMap { uid } => {
                let index = self.position(&uid).ok_or(RemoteError::MapNotInList)?;
                self.switch_to(index);
                Ok(RemoteReply::Done(1))
            }
        }
    }
}

/// A game server simulated in memory.
///
/// Cheap to clone; clones share the same server. Hand one clone to the
/// engine and keep another to inspect the calls it made or to drive
/// player traffic.
#[derive(Clone)]
pub struct InMemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl InMemoryServer {
    /// Creates a server whose rotation (and library) is `rotation`. The
    /// first map is current.
    pub fn new(rotation: Vec<MapInfo>) -> Self {
        Self::with_library(rotation.clone(), rotation)
    }

    /// Creates a server with a rotation and a separate library of map
    /// files that [`RemoteCall::AddMap`] can draw from. Rotation maps are
    /// added to the library if missing.
    pub fn with_library(rotation: Vec<MapInfo>, mut library: Vec<MapInfo>) -> Self {
        for info in &rotation {
            if !library.iter().any(|m| m.uid == info.uid) {
                library.push(info.clone());
            }
        }
        Self {
            state: Arc::new(Mutex::new(ServerState {
                library,
                rotation,
                current: 0,
                next: None,
                players: Vec::new(),
                max_maps: DEFAULT_MAX_MAPS,
                calls: Vec::new(),
                faults: VecDeque::new(),
                feed: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the receiving end of the callback feed. A second call
    /// replaces the previous feed.
    pub fn callbacks(&self) -> mpsc::UnboundedReceiver<ServerCallback> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().feed = Some(tx);
        rx
    }

    /// Makes the next call to `method` fail with `error`.
    pub fn fail_next(&self, method: &'static str, error: RemoteError) {
        self.lock().faults.push_back((method, error));
    }

    /// Limits the rotation size for `AddMap`.
    pub fn set_max_maps(&self, max_maps: usize) {
        self.lock().max_maps = max_maps;
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Uids of the rotation in play order.
    pub fn rotation(&self) -> Vec<MapUid> {
        self.lock().rotation.iter().map(|m| m.uid.clone()).collect()
    }

    /// Uid of the map being played.
    pub fn current(&self) -> Option<MapUid> {
        let state = self.lock();
        state.rotation.get(state.current).map(|m| m.uid.clone())
    }

    /// Uid set through [`RemoteCall::SetNextMap`], if any.
    pub fn next(&self) -> Option<MapUid> {
        self.lock().next.clone()
    }

    /// Replaces the rotation behind the engine's back (an admin editing
    /// the match settings by hand) and announces the change.
    pub fn replace_rotation(&self, rotation: Vec<MapInfo>) {
        let mut state = self.lock();
        for info in &rotation {
            if !state.library.iter().any(|m| m.uid == info.uid) {
                state.library.push(info.clone());
            }
        }
        state.current = state
            .rotation
            .get(state.current)
            .and_then(|cur| rotation.iter().position(|m| m.uid == cur.uid))
            .unwrap_or(0);
        state.rotation = rotation;
        state.emit(ServerCallback::MapListModified { list_changed: true });
    }

    /// Simulates a player joining.
    pub fn connect_player(&self, player: PlayerId) {
        let mut state = self.lock();
        if !state.players.contains(&player) {
            state.players.push(player.clone());
        }
        state.emit(ServerCallback::PlayerConnected { player });
    }

    /// Simulates a player leaving.
    pub fn disconnect_player(&self, player: PlayerId) {
        let mut state = self.lock();
        state.players.retain(|p| p != &player);
        state.emit(ServerCallback::PlayerDisconnected { player });
    }

    /// Logins currently on the server.
    pub fn players(&self) -> Vec<PlayerId> {
        self.lock().players.clone()
    }

    /// Simulates the current map running out of time: same as `NextMap`
    /// but without recording a call.
    pub fn finish_map(&self) {
        let mut state = self.lock();
        if state.rotation.is_empty() {
            return;
        }
        let index = state
            .next
            .as_ref()
            .and_then(|uid| state.position(uid))
            .unwrap_or((state.current + 1) % state.rotation.len());
        state.switch_to(index);
    }
}

impl RemoteClient for InMemoryServer {
    async fn call(&self, call: RemoteCall) -> CallResult {
        let mut state = self.lock();
        state.calls.push(call.clone());
        if let Some(err) = state.take_fault(call.method()) {
            tracing::debug!(method = call.method(), error = %err, "injected fault");
            return Err(err);
        }
        state.handle(call)
    }
}
