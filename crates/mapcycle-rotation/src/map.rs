//! The cached map record.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use std::time::SystemTime;

use mapcycle_protocol::{MapInfo, MapUid};

#[derive(Debug, Clone)]
struct MapDetails {
    info: MapInfo,
    last_update: SystemTime,
}

/// One playable map known to the engine.
///
/// Maps are shared as `Arc<Map>`. The uid never changes; the descriptive
/// fields change only through [`update`](Self::update), which the cache
/// calls with server-confirmed values during a sync. A holder of an
/// `Arc<Map>` therefore keeps seeing the same map across reorders and
/// refreshes.
pub struct Map {
    uid: MapUid,
    details: RwLock<MapDetails>,
}

impl Map {
    /// Creates a map from a server record.
    pub fn new(info: MapInfo) -> Self {
        Self {
            uid: info.uid.clone(),
            details: RwLock::new(MapDetails {
                info,
                last_update: SystemTime::now(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MapDetails> {
        self.details.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The stable identifier.
    pub fn uid(&self) -> &MapUid {
        &self.uid
    }

    /// The map file, relative to the server's map directory.
    pub fn file_name(&self) -> String {
        self.read().info.file_name.clone()
    }

    /// The display name.
    pub fn name(&self) -> String {
        self.read().info.name.clone()
    }

    /// The author's login.
    pub fn author(&self) -> String {
        self.read().info.author.clone()
    }

    /// When the descriptive fields were last refreshed.
    pub fn last_update(&self) -> SystemTime {
        self.read().last_update
    }

    /// A copy of the current server record.
    pub fn snapshot(&self) -> MapInfo {
        self.read().info.clone()
    }

    /// Replaces the descriptive fields with `info`.
    ///
    /// A record for a different uid is ignored. Returns `true` if any
    /// field changed. The refresh timestamp moves either way.
    pub fn update(&self, info: &MapInfo) -> bool {
        if info.uid != self.uid {
            tracing::warn!(uid = %self.uid, other = %info.uid, "refusing update from another map");
            return false;
        }
        let mut details = self.details.write().unwrap_or_else(PoisonError::into_inner);
        let changed = details.info != *info;
        if changed {
            details.info = info.clone();
        }
        details.last_update = SystemTime::now();
        changed
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details = self.read();
        f.debug_struct("Map")
            .field("uid", &self.uid)
            .field("file_name", &details.info.file_name)
            .field("name", &details.info.name)
            .finish()
    }
}
