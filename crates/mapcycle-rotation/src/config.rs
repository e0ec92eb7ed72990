//! Rotation and jukebox configuration.

use mapcycle_session::AuthLevel;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::RotationError;

/// Quota value meaning "no limit".
pub const UNLIMITED: i32 = -1;

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

/// Jukebox policy: who may queue how much, and what counts as too recent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Drop queued maps whose submitter has left by the time the map
    /// would be chosen.
    pub skip_on_leave: bool,

    /// Also drop entries of privileged submitters who have left.
    pub skip_on_leave_admin: bool,

    /// How many maps a regular player may have queued at once.
    /// [`UNLIMITED`] (`-1`) disables the check.
    pub player_limit: i32,

    /// Same as `player_limit`, for players at `privileged_level` or above.
    pub privileged_limit: i32,

    /// How many recently played maps are refused by the queue.
    /// 0 disables the recent-play buffer.
    pub buffer_size: usize,

    /// Level at which `privileged_limit` applies and skip-on-leave spares
    /// the player's entries.
    pub privileged_level: AuthLevel,

    /// Level allowed to queue maps that are still in the recent-play buffer.
    pub buffer_override_level: AuthLevel,

    /// Level allowed to clear the whole queue.
    pub clear_level: AuthLevel,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            skip_on_leave: true,
            skip_on_leave_admin: false,
            player_limit: 1,
            privileged_limit: UNLIMITED,
            buffer_size: 10,
            privileged_level: AuthLevel::Moderator,
            buffer_override_level: AuthLevel::Moderator,
            clear_level: AuthLevel::Moderator,
        }
    }
}

impl QueueConfig {
    /// The quota that applies to a player at `level`, `None` if unlimited.
    pub fn limit_for(&self, level: AuthLevel) -> Option<usize> {
        let limit = if level.meets(self.privileged_level) {
            self.privileged_limit
        } else {
            self.player_limit
        };
        usize::try_from(limit).ok()
    }

    /// Returns `true` if `level` counts as privileged.
    pub fn is_privileged(&self, level: AuthLevel) -> bool {
        level.meets(self.privileged_level)
    }
}

// ---------------------------------------------------------------------------
// RotationConfig
// ---------------------------------------------------------------------------

/// Configuration for one map engine.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use mapcycle_rotation::RotationConfig;
///
/// let config = RotationConfig::from_json(r#"{ "restructure_threshold": 5 }"#).unwrap();
/// assert_eq!(config.restructure_threshold, 5);
/// assert!(config.queue.skip_on_leave);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Jukebox policy.
    pub queue: QueueConfig,

    /// Once the current map sits at this index or later, the remote
    /// rotation is rotated so it comes first again.
    pub restructure_threshold: usize,

    /// Restructure automatically after every map begin.
    pub restructure_on_begin: bool,

    /// Maps requested per `GetMapList` page during sync.
    pub sync_page_size: usize,

    /// Hard cap on the number of maps a sync will read.
    pub sync_max_maps: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            restructure_threshold: 15,
            restructure_on_begin: true,
            sync_page_size: 100,
            sync_max_maps: 5_000,
        }
    }
}

impl RotationConfig {
    /// Largest allowed `sync_page_size`.
    pub const MAX_PAGE_SIZE: usize = 1_000;

    /// Parses a config from JSON and validates it.
    ///
    /// # Errors
    /// Returns [`RotationError::Validation`] if the document doesn't parse.
    pub fn from_json(json: &str) -> Result<Self, RotationError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RotationError::Validation(format!("invalid rotation config: {e}")))?;
        Ok(config.validated())
    }

    /// Clamps every field into its valid range.
    ///
    /// Called automatically by the engine constructor. Rules:
    /// - `sync_page_size` clamped to `1..=MAX_PAGE_SIZE`.
    /// - `sync_max_maps` forced ≥ `sync_page_size`.
    /// - Quotas below `-1` become `-1` (unlimited).
    pub fn validated(mut self) -> Self {
        let page = self.sync_page_size.clamp(1, Self::MAX_PAGE_SIZE);
        if page != self.sync_page_size {
            warn!(
                page_size = self.sync_page_size,
                clamped = page,
                "sync_page_size out of range, clamping"
            );
            self.sync_page_size = page;
        }
        if self.sync_max_maps < self.sync_page_size {
            warn!(
                max_maps = self.sync_max_maps,
                page_size = self.sync_page_size,
                "sync_max_maps below page size, raising"
            );
            self.sync_max_maps = self.sync_page_size;
        }
        self.queue.player_limit = self.queue.player_limit.max(UNLIMITED);
        self.queue.privileged_limit = self.queue.privileged_limit.max(UNLIMITED);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_config_default() {
        let config = RotationConfig::default();
        assert_eq!(config.restructure_threshold, 15);
        assert!(config.restructure_on_begin);
        assert_eq!(config.sync_page_size, 100);
        assert_eq!(config.sync_max_maps, 5_000);
        assert!(config.queue.skip_on_leave);
        assert!(!config.queue.skip_on_leave_admin);
        assert_eq!(config.queue.player_limit, 1);
        assert_eq!(config.queue.privileged_limit, UNLIMITED);
        assert_eq!(config.queue.buffer_size, 10);
    }

    #[test]
    fn test_from_json_partial_document_keeps_defaults() {
        let config = RotationConfig::from_json(
            r#"{ "queue": { "buffer_size": 3, "clear_level": "admin" } }"#,
        )
        .unwrap();
        assert_eq!(config.queue.buffer_size, 3);
        assert_eq!(config.queue.clear_level, AuthLevel::Admin);
        assert_eq!(config.queue.player_limit, 1);
        assert_eq!(config.restructure_threshold, 15);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = RotationConfig::from_json("{ not json");
        assert!(matches!(result, Err(RotationError::Validation(_))));
    }

    #[test]
    fn test_validated_clamps_page_size_and_cap() {
        let config = RotationConfig {
            sync_page_size: 0,
            sync_max_maps: 0,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.sync_page_size, 1);
        assert_eq!(config.sync_max_maps, 1);

        let config = RotationConfig {
            sync_page_size: 50_000,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.sync_page_size, RotationConfig::MAX_PAGE_SIZE);
        assert_eq!(config.sync_max_maps, 5_000);
    }

    #[test]
    fn test_validated_clamps_negative_limits() {
        let mut config = RotationConfig::default();
        config.queue.player_limit = -7;
        config.queue.privileged_limit = -2;
        let config = config.validated();
        assert_eq!(config.queue.player_limit, UNLIMITED);
        assert_eq!(config.queue.privileged_limit, UNLIMITED);
    }

    #[test]
    fn test_limit_for_picks_quota_by_level() {
        let config = QueueConfig {
            player_limit: 2,
            privileged_limit: UNLIMITED,
            ..Default::default()
        };
        assert_eq!(config.limit_for(AuthLevel::Player), Some(2));
        assert_eq!(config.limit_for(AuthLevel::Moderator), None);
        assert_eq!(config.limit_for(AuthLevel::MasterAdmin), None);
    }
}
