//! Error types for the session layer.

/// Errors that can occur during roster bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given player.
    /// The server reported a disconnect for someone it never announced.
    #[error("session not found for player {0}")]
    NotFound(mapcycle_protocol::PlayerId),
}
