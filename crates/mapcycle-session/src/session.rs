//! Session types: the roster's record of one player.

use std::time::Instant;

use mapcycle_protocol::PlayerId;
use serde::{Deserialize, Serialize};

use crate::AuthLevel;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for roster bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long (in seconds) a disconnected player stays in the roster
    /// before [`PlayerRoster::expire_stale`](crate::PlayerRoster::expire_stale)
    /// drops them.
    ///
    /// Default: 300 seconds.
    pub disconnected_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            disconnected_grace_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Whether a player is currently on the server.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(grace elapsed)──→ dropped
///       ↑                            │
///       └─────────(connect)──────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Player is on the server.
    Connected,

    /// Player left at the given instant.
    Disconnected { since: Instant },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One player known to the roster.
#[derive(Debug, Clone)]
pub struct Session {
    /// Which player this session belongs to.
    pub player_id: PlayerId,

    /// Level granted by the authorizer at the last connect.
    pub auth_level: AuthLevel,

    /// Current presence.
    pub state: SessionState,
}

impl Session {
    /// Returns `true` while the player is on the server.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected)
    }
}
