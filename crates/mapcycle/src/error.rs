//! Unified error type for Mapcycle.

use mapcycle_protocol::ProtocolError;
use mapcycle_rotation::{QueueRejection, RotationError};
use mapcycle_rpc::RemoteError;
use mapcycle_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `mapcycle` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MapcycleError {
    /// A malformed identifier.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The game server failed or refused a call.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A roster error (unknown player).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An engine operation failed.
    #[error(transparent)]
    Rotation(#[from] RotationError),

    /// A queue request was refused. The text is meant for the player.
    #[error(transparent)]
    Rejected(#[from] QueueRejection),

    /// The engine task has stopped.
    #[error("map engine is unavailable")]
    Unavailable,
}
