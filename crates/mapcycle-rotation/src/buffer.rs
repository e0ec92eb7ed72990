//! The recent-play buffer.

use std::collections::VecDeque;

use mapcycle_protocol::MapUid;

/// Bounded FIFO of recently played maps.
///
/// The jukebox refuses maps found here (unless the player may override).
/// A uid already present is neither re-inserted nor moved, so the buffer
/// records first plays within its window, not most recent plays.
#[derive(Debug, Clone, Default)]
pub struct RecentPlayBuffer {
    entries: VecDeque<MapUid>,
    capacity: usize,
}

impl RecentPlayBuffer {
    /// Creates an empty buffer. A capacity of 0 disables it.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a play. Returns `false` if the uid was already present or
    /// the buffer is disabled.
    pub fn push(&mut self, uid: MapUid) -> bool {
        if self.capacity == 0 || self.entries.contains(&uid) {
            return false;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(uid);
        true
    }

    /// Returns `true` if `uid` was played recently.
    pub fn contains(&self, uid: &MapUid) -> bool {
        self.entries.contains(uid)
    }

    /// Changes the capacity, evicting the oldest entries if it shrank.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffered uids, oldest first.
    pub fn to_vec(&self) -> Vec<MapUid> {
        self.entries.iter().cloned().collect()
    }

    /// Number of buffered uids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
