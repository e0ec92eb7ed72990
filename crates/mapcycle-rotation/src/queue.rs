//! The jukebox: player map requests and the choice of the next map.
//!
//! [`MapQueue`] only decides. It never talks to the server or emits
//! events itself; the engine applies its decisions.

use std::fmt;

use indexmap::IndexMap;
use mapcycle_protocol::{MapUid, PlayerId};
use mapcycle_session::{AuthLevel, PlayerRoster};

use crate::{MapCache, QueueConfig, QueueRejection, RecentPlayBuffer};

// ---------------------------------------------------------------------------
// Submitter / QueueEntry
// ---------------------------------------------------------------------------

/// Who asked for a map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Submitter {
    /// The engine or the server console. Exempt from quotas, the
    /// recent-play buffer and skip-on-leave.
    Server,
    /// A player.
    Player(PlayerId),
}

impl Submitter {
    /// The player behind the request, if any.
    pub fn player(&self) -> Option<&PlayerId> {
        match self {
            Self::Server => None,
            Self::Player(id) => Some(id),
        }
    }
}

impl fmt::Display for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Player(id) => write!(f, "{id}"),
        }
    }
}

/// One queued map request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub submitter: Submitter,
    pub map_uid: MapUid,
    /// The submitter's level when the request was made. Server requests
    /// carry [`AuthLevel::Player`]; it is never consulted for them.
    pub level: AuthLevel,
    /// Queued at the head through [`MapQueue::add_first`]. Never skipped
    /// because its submitter left.
    pub priority: bool,
}

/// What [`MapQueue::on_map_end`] decided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEndOutcome {
    /// The one-shot suppression flag was armed; the queue was not touched.
    pub suppressed: bool,
    /// Entries dropped because their submitter left.
    pub skipped: Vec<QueueEntry>,
    /// The entry taken off the head to be played next.
    pub chosen: Option<QueueEntry>,
}

// ---------------------------------------------------------------------------
// MapQueue
// ---------------------------------------------------------------------------

/// Ordered map requests keyed by uid, plus the recent-play buffer.
#[derive(Debug)]
pub struct MapQueue {
    entries: IndexMap<MapUid, QueueEntry>,
    buffer: RecentPlayBuffer,
    config: QueueConfig,
    dont_queue_next: bool,
}

impl MapQueue {
    /// Creates an empty queue.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            entries: IndexMap::new(),
            buffer: RecentPlayBuffer::new(config.buffer_size),
            config,
            dont_queue_next: false,
        }
    }

    /// Replaces the policy. A smaller `buffer_size` evicts the oldest
    /// buffered maps.
    pub fn set_config(&mut self, config: QueueConfig) {
        self.buffer.set_capacity(config.buffer_size);
        self.config = config;
    }

    /// The active policy.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Appends a request.
    ///
    /// Checks, in order: the map exists, it isn't queued yet, the player
    /// is under quota, and it wasn't played recently (unless the player
    /// may override the buffer). Server requests skip the last two.
    pub fn add(
        &mut self,
        submitter: Submitter,
        uid: MapUid,
        cache: &MapCache,
        roster: &PlayerRoster,
    ) -> Result<QueueEntry, QueueRejection> {
        if !cache.contains(&uid) {
            return Err(QueueRejection::UnknownMap(uid));
        }
        if self.entries.contains_key(&uid) {
            return Err(QueueRejection::AlreadyQueued(uid));
        }

        let level = Self::level_of(&submitter, roster);
        if submitter.player().is_some() {
            if let Some(limit) = self.config.limit_for(level) {
                if self.count_for(&submitter) >= limit {
                    return Err(QueueRejection::QuotaExceeded { limit });
                }
            }
            if self.buffer.contains(&uid) && !level.meets(self.config.buffer_override_level) {
                return Err(QueueRejection::RecentlyPlayed(uid));
            }
        }

        let entry = QueueEntry {
            submitter,
            map_uid: uid.clone(),
            level,
            priority: false,
        };
        self.entries.insert(uid, entry.clone());
        Ok(entry)
    }

    /// Puts a request at the head, ahead of everything else.
    ///
    /// An existing request for the same map is replaced. Quota and buffer
    /// don't apply.
    pub fn add_first(
        &mut self,
        submitter: Submitter,
        uid: MapUid,
        cache: &MapCache,
        roster: &PlayerRoster,
    ) -> Result<QueueEntry, QueueRejection> {
        if !cache.contains(&uid) {
            return Err(QueueRejection::UnknownMap(uid));
        }
        self.entries.shift_remove(&uid);
        let entry = QueueEntry {
            level: Self::level_of(&submitter, roster),
            submitter,
            map_uid: uid.clone(),
            priority: true,
        };
        self.entries.shift_insert(0, uid, entry.clone());
        Ok(entry)
    }

    /// Withdraws the request for `uid`.
    pub fn remove(&mut self, uid: &MapUid) -> Result<QueueEntry, QueueRejection> {
        self.entries
            .shift_remove(uid)
            .ok_or_else(|| QueueRejection::NotQueued(uid.clone()))
    }

    /// Drops every request. Players need `clear_level`.
    pub fn clear(
        &mut self,
        submitter: &Submitter,
        roster: &PlayerRoster,
    ) -> Result<Vec<QueueEntry>, QueueRejection> {
        if let Submitter::Player(player) = submitter {
            if !roster.auth_level(player).meets(self.config.clear_level) {
                return Err(QueueRejection::NotPermitted);
            }
        }
        Ok(self.entries.drain(..).map(|(_, entry)| entry).collect())
    }

    /// Drops requests whose map is no longer cached.
    pub fn purge_missing(&mut self, cache: &MapCache) -> Vec<QueueEntry> {
        let mut purged = Vec::new();
        self.entries.retain(|uid, entry| {
            let keep = cache.contains(uid);
            if !keep {
                purged.push(entry.clone());
            }
            keep
        });
        purged
    }

    /// Makes the next [`on_map_end`](Self::on_map_end) leave the queue
    /// alone. Used when the next map was already picked by other means.
    pub fn dont_queue_next_map_change(&mut self) {
        self.dont_queue_next = true;
    }

    /// Clears a pending [`dont_queue_next_map_change`](Self::dont_queue_next_map_change).
    pub fn disarm_dont_queue(&mut self) {
        self.dont_queue_next = false;
    }

    /// Returns `true` if the next map end will be ignored.
    pub fn is_dont_queue_armed(&self) -> bool {
        self.dont_queue_next
    }

    /// Picks the next map when the current one ends.
    ///
    /// With skip-on-leave on, requests at the head whose submitter has
    /// left are dropped first. The scan stops at the first request that
    /// stays: a priority request, a server request, a connected player's
    /// request, or (unless `skip_on_leave_admin`) one made by a player who
    /// was privileged when they queued it.
    /// Requests behind it are not examined even if their submitter left.
    pub fn on_map_end(&mut self, roster: &PlayerRoster) -> MapEndOutcome {
        if self.dont_queue_next {
            self.dont_queue_next = false;
            return MapEndOutcome {
                suppressed: true,
                ..Default::default()
            };
        }

        let mut skipped = Vec::new();
        if self.config.skip_on_leave {
            while let Some((_, head)) = self.entries.first() {
                if self.keeps(head, roster) {
                    break;
                }
                if let Some((_, entry)) = self.entries.shift_remove_index(0) {
                    skipped.push(entry);
                }
            }
        }

        let chosen = self.entries.shift_remove_index(0).map(|(_, entry)| entry);
        MapEndOutcome {
            suppressed: false,
            skipped,
            chosen,
        }
    }

    fn keeps(&self, entry: &QueueEntry, roster: &PlayerRoster) -> bool {
        if entry.priority {
            return true;
        }
        let Submitter::Player(player) = &entry.submitter else {
            return true;
        };
        if roster.is_connected(player) {
            return true;
        }
        self.config.is_privileged(entry.level) && !self.config.skip_on_leave_admin
    }

    fn level_of(submitter: &Submitter, roster: &PlayerRoster) -> AuthLevel {
        submitter
            .player()
            .map(|player| roster.auth_level(player))
            .unwrap_or_default()
    }

    /// Records that `uid` began.
    pub fn on_map_begin(&mut self, uid: &MapUid) {
        self.buffer.push(uid.clone());
    }

    fn count_for(&self, submitter: &Submitter) -> usize {
        self.entries
            .values()
            .filter(|e| &e.submitter == submitter)
            .count()
    }

    /// The recent-play buffer, oldest first.
    pub fn queue_buffer(&self) -> Vec<MapUid> {
        self.buffer.to_vec()
    }

    /// Queued uids with their 1-based position.
    pub fn queued_ranking(&self) -> IndexMap<MapUid, usize> {
        self.entries
            .keys()
            .enumerate()
            .map(|(i, uid)| (uid.clone(), i + 1))
            .collect()
    }

    /// Who queued `uid`.
    pub fn queuer(&self, uid: &MapUid) -> Option<&Submitter> {
        self.entries.get(uid).map(|e| &e.submitter)
    }

    /// The request that would be chosen next, ignoring skip-on-leave.
    pub fn next_queued_entry(&self) -> Option<&QueueEntry> {
        self.entries.first().map(|(_, entry)| entry)
    }

    /// Every request in order.
    pub fn entries(&self) -> Vec<QueueEntry> {
        self.entries.values().cloned().collect()
    }

    /// Returns `true` if `uid` is queued.
    pub fn is_queued(&self, uid: &MapUid) -> bool {
        self.entries.contains_key(uid)
    }

    /// Number of requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Level at which a player counts as privileged.
    pub fn privileged_level(&self) -> AuthLevel {
        self.config.privileged_level
    }
}

// =========================================================================
// Tests
// =========================================================================
