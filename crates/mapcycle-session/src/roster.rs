//! The player roster: who is on the server, and at what level.
//!
//! The roster is owned by the engine and updated from the server's
//! callback feed and player list, so it needs no locking of its own. Because the feed is
//! at-least-once, every operation tolerates being repeated.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use mapcycle_protocol::PlayerId;

use crate::{AuthLevel, Session, SessionConfig, SessionError, SessionState};

/// Tracks every player currently connected (or recently disconnected).
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ [Connected] ──disconnect()──→ [Disconnected] ──expire_stale()──→ gone
///                    ↑                              │
///                    └──────────connect()───────────┘
/// ```
pub struct PlayerRoster {
    sessions: HashMap<PlayerId, Session>,
    config: SessionConfig,
}

impl PlayerRoster {
    /// Creates an empty roster with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    /// Records that `player` is on the server with `auth_level`.
    ///
    /// Connecting an already-connected player just refreshes the level, so
    /// a duplicated callback is harmless.
    pub fn connect(&mut self, player_id: PlayerId, auth_level: AuthLevel) -> &Session {
        let session = self
            .sessions
            .entry(player_id.clone())
            .or_insert_with(|| Session {
                player_id: player_id.clone(),
                auth_level,
                state: SessionState::Connected,
            });
        let rejoined = !session.is_connected();
        session.auth_level = auth_level;
        session.state = SessionState::Connected;

        if rejoined {
            tracing::info!(%player_id, %auth_level, "player reconnected");
        } else {
            tracing::debug!(%player_id, %auth_level, "player connected");
        }
        session
    }

    /// Marks `player` as gone. Their session stays around (with its level)
    /// until the grace period runs out, so queue entries they submitted can
    /// still be attributed.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the player was never seen.
    pub fn disconnect(&mut self, player_id: &PlayerId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(player_id)
            .ok_or_else(|| SessionError::NotFound(player_id.clone()))?;

        if session.is_connected() {
            session.state = SessionState::Disconnected {
                since: Instant::now(),
            };
            tracing::info!(%player_id, "player disconnected");
        }
        Ok(())
    }

    /// Brings the roster in line with the server's own player list.
    ///
    /// Players in `present` who aren't connected here are connected,
    /// keeping any level they had. Connected players missing from
    /// `present` are disconnected. Returns the newly connected players.
    pub fn reconcile(&mut self, present: &[PlayerId]) -> Vec<PlayerId> {
        let mut joined = Vec::new();
        for player_id in present {
            if !self.is_connected(player_id) {
                let level = self.auth_level(player_id);
                self.connect(player_id.clone(), level);
                joined.push(player_id.clone());
            }
        }

        let gone: Vec<PlayerId> = self
            .sessions
            .values()
            .filter(|s| s.is_connected() && !present.contains(&s.player_id))
            .map(|s| s.player_id.clone())
            .collect();
        for player_id in &gone {
            let _ = self.disconnect(player_id);
        }

        if !joined.is_empty() || !gone.is_empty() {
            tracing::debug!(joined = joined.len(), left = gone.len(), "roster reconciled");
        }
        joined
    }

    /// Returns `true` if `player` is on the server right now.
    pub fn is_connected(&self, player_id: &PlayerId) -> bool {
        self.sessions
            .get(player_id)
            .is_some_and(Session::is_connected)
    }

    /// The level `player` had at their last connect, or
    /// [`AuthLevel::Player`] for strangers.
    pub fn auth_level(&self, player_id: &PlayerId) -> AuthLevel {
        self.sessions
            .get(player_id)
            .map(|s| s.auth_level)
            .unwrap_or_default()
    }

    /// Drops disconnected sessions older than the grace period.
    ///
    /// Returns the players that were dropped.
    pub fn expire_stale(&mut self) -> Vec<PlayerId> {
        let grace = Duration::from_secs(self.config.disconnected_grace_secs);
        let mut expired = Vec::new();

        self.sessions.retain(|player_id, session| match session.state {
            SessionState::Disconnected { since } if since.elapsed() >= grace => {
                expired.push(player_id.clone());
                false
            }
            _ => true,
        });

        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "expired stale sessions");
        }
        expired
    }

    /// Looks up a session.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Logins of every connected player, in no particular order.
    pub fn connected_players(&self) -> Vec<PlayerId> {
        self.sessions
            .values()
            .filter(|s| s.is_connected())
            .map(|s| s.player_id.clone())
            .collect()
    }

    /// Number of players currently connected.
    pub fn connected_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_connected()).count()
    }

    /// Number of sessions in any state.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for PlayerRoster {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================
