//! Authorization levels and the hook that assigns them.
//!
//! Mapcycle doesn't decide who is an admin. That lives in the permission
//! subsystem of the surrounding controller. The [`Authorizer`] trait is the
//! single question the engine asks it, once per connecting player.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use mapcycle_protocol::PlayerId;
use serde::{Deserialize, Serialize};

/// How much a player is trusted, lowest first.
///
/// The derive of `Ord` follows declaration order, so
/// `AuthLevel::Admin >= AuthLevel::Moderator` holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AuthLevel {
    #[default]
    Player,
    Moderator,
    Admin,
    SuperAdmin,
    MasterAdmin,
}

impl AuthLevel {
    /// Returns `true` if this level is at least `required`.
    pub fn meets(self, required: AuthLevel) -> bool {
        self >= required
    }
}

impl fmt::Display for AuthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "Player"),
            Self::Moderator => write!(f, "Moderator"),
            Self::Admin => write!(f, "Admin"),
            Self::SuperAdmin => write!(f, "SuperAdmin"),
            Self::MasterAdmin => write!(f, "MasterAdmin"),
        }
    }
}

/// Looks up a player's authorization level.
///
/// # Example
///
/// ```rust
/// use mapcycle_protocol::PlayerId;
/// use mapcycle_session::{AuthLevel, Authorizer};
///
/// /// Everyone whose login ends in `_adm` is an admin.
/// struct SuffixAuthorizer;
///
/// impl Authorizer for SuffixAuthorizer {
///     async fn auth_level(&self, player: &PlayerId) -> AuthLevel {
///         if player.as_str().ends_with("_adm") {
///             AuthLevel::Admin
///         } else {
///             AuthLevel::Player
///         }
///     }
/// }
/// ```
pub trait Authorizer: Send + Sync + 'static {
    /// Returns the level for `player`. Unknown players are
    /// [`AuthLevel::Player`].
    fn auth_level(
        &self,
        player: &PlayerId,
    ) -> impl Future<Output = AuthLevel> + Send;
}

/// An [`Authorizer`] backed by a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    levels: HashMap<PlayerId, AuthLevel>,
}

impl StaticAuthorizer {
    /// Creates an authorizer where everyone is a plain player.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `level` to `player`.
    pub fn with(mut self, player: PlayerId, level: AuthLevel) -> Self {
        self.levels.insert(player, level);
        self
    }
}

impl Authorizer for StaticAuthorizer {
    async fn auth_level(&self, player: &PlayerId) -> AuthLevel {
        self.levels.get(player).copied().unwrap_or_default()
    }
}
