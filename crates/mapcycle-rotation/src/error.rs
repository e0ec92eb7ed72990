//! Error types for the rotation layer.

use mapcycle_protocol::MapUid;
use mapcycle_rpc::RemoteError;

/// Errors from engine operations.
///
/// Failures here are never fatal: the engine state stays consistent and
/// the next sync or begin event corrects anything left stale.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RotationError {
    /// The game server refused or failed a call.
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),

    /// The map is not in the local cache.
    #[error("map {0} not found")]
    NotFound(MapUid),

    /// The operation needs a current map and none has begun.
    #[error("no map is currently being played")]
    NoCurrentMap,

    /// Configuration or server data failed validation.
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Why a queue request was refused.
///
/// These are expected outcomes, not faults. The `Display` text is meant
/// to be shown to the player who made the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueRejection {
    /// The uid is not in the rotation.
    #[error("map {0} is not in the rotation")]
    UnknownMap(MapUid),

    /// Someone already queued this map.
    #[error("map {0} is already in the queue")]
    AlreadyQueued(MapUid),

    /// The player already has as many maps queued as they may.
    #[error("you may only have {limit} map(s) in the queue")]
    QuotaExceeded { limit: usize },

    /// The map was played too recently.
    #[error("map {0} was played recently")]
    RecentlyPlayed(MapUid),

    /// Removal of a map that isn't queued.
    #[error("map {0} is not in the queue")]
    NotQueued(MapUid),

    /// The player's level is too low for this operation.
    #[error("you are not allowed to do that")]
    NotPermitted,
}
