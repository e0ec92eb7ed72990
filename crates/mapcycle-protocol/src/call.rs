//! Requests the engine makes of the game server, and their answers.

use serde::{Deserialize, Serialize};

use crate::{MapInfo, MapUid, PlayerId};

/// A single remote procedure call.
///
/// `#[serde(tag = "method")]` produces `{ "method": "SetNextMap", "uid": … }`,
/// which maps directly onto method-name based RPC dialects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum RemoteCall {
    // -- Reading the rotation --

    /// One page of the rotation. The server answers `IndexOutOfBounds`
    /// once `offset` is past the end.
    GetMapList { offset: usize, length: usize },

    /// The map currently being played.
    GetCurrentMapInfo,

    /// Info for a map file, whether or not it is in the rotation.
    GetMapInfo { file_name: String },

    // -- Reading the players --

    /// Logins of everyone currently on the server.
    GetPlayerList,

    // -- Writing the rotation --

    /// Sets which map plays after the current one.
    SetNextMap { uid: MapUid },

    /// Reorders the upcoming maps. The current map must not be listed.
    ChooseNextMaps { file_names: Vec<String> },

    /// Appends a map file to the rotation.
    AddMap { file_name: String },

    /// Removes a map file from the rotation.
    RemoveMap { file_name: String },

    // -- Flow control --

    /// Ends the current map and moves on.
    NextMap,

    /// Restarts the current map.
    RestartMap,

    /// Ends the current map and switches straight to `uid`.
    JumpToMap { uid: MapUid },
}

impl RemoteCall {
    /// The method name, for logging.
    pub fn method(&self) -> &'static str {
        match self {
            Self::GetMapList { .. } => "GetMapList",
            Self::GetCurrentMapInfo => "GetCurrentMapInfo",
            Self::GetMapInfo { .. } => "GetMapInfo",
            Self::GetPlayerList => "GetPlayerList",
            Self::SetNextMap { .. } => "SetNextMap",
            Self::ChooseNextMaps { .. } => "ChooseNextMaps",
            Self::AddMap { .. } => "AddMap",
            Self::RemoveMap { .. } => "RemoveMap",
            Self::NextMap => "NextMap",
            Self::RestartMap => "RestartMap",
            Self::JumpToMap { .. } => "JumpToMap",
        }
    }
}

/// The answer to a [`RemoteCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RemoteReply {
    /// A page of map records (`GetMapList`).
    Maps(Vec<MapInfo>),
    /// A single map record (`GetCurrentMapInfo`, `GetMapInfo`).
    Map(MapInfo),
    /// The logins on the server (`GetPlayerList`).
    Players(Vec<PlayerId>),
    /// Acknowledgement for calls that only change state. Carries a count
    /// where the call has one (`ChooseNextMaps`: maps accepted).
    Done(usize),
}

impl RemoteReply {
    /// The variant name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Maps(_) => "Maps",
            Self::Map(_) => "Map",
            Self::Players(_) => "Players",
            Self::Done(_) => "Done",
        }
    }
}
