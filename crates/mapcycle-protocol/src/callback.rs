//! Events the game server pushes to the engine.

use serde::{Deserialize, Serialize};

use crate::{MapUid, PlayerId};

/// A server-originated event.
///
/// Delivered serially and at least once: the same transition may arrive
/// twice, and a restart arrives as a `BeginMap` with `restart: true` and
/// no preceding `EndMap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerCallback {
    /// A map started.
    BeginMap { uid: MapUid, restart: bool },

    /// The current map finished.
    EndMap,

    /// The rotation or the current/next indices changed on the server.
    /// `list_changed` is `false` when only the indices moved.
    MapListModified { list_changed: bool },

    /// A player joined the server.
    PlayerConnected { player: PlayerId },

    /// A player left the server.
    PlayerDisconnected { player: PlayerId },
}
