//! The local mirror of the server's rotation.

use std::sync::Arc;

use indexmap::IndexMap;
use mapcycle_protocol::{MapInfo, MapUid};
use mapcycle_rpc::{RemoteClient, RemoteError};

use crate::Map;

/// Ordered cache of the maps in the remote rotation.
///
/// Order mirrors the server's play order. Lookups by uid are hash
/// lookups; lookups by position are index lookups. A uid appears at most
/// once.
#[derive(Debug, Default)]
pub struct MapCache {
    maps: IndexMap<MapUid, Arc<Map>>,
}

impl MapCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the whole remote rotation and mirrors it.
    ///
    /// Pages through `GetMapList` until the server answers
    /// `IndexOutOfBounds`, returns a short page, or `max_maps` entries
    /// have been read. Any other error aborts the sync and leaves the
    /// cache untouched.
    ///
    /// Returns the number of maps now cached.
    pub async fn sync<R: RemoteClient>(
        &mut self,
        remote: &R,
        page_size: usize,
        max_maps: usize,
    ) -> Result<usize, RemoteError> {
        let listing = fetch_listing(remote, page_size, max_maps).await?;
        Ok(self.apply_listing(listing))
    }

    /// Mirrors `listing` into the cache.
    ///
    /// Known uids keep their `Arc<Map>` and get their fields refreshed;
    /// new uids get a fresh map; uids missing from `listing` are dropped.
    /// If a uid is listed twice only the first occurrence counts.
    pub fn apply_listing(&mut self, listing: Vec<MapInfo>) -> usize {
        let mut old = std::mem::take(&mut self.maps);
        let mut maps = IndexMap::with_capacity(listing.len());

        for info in listing {
            if maps.contains_key(&info.uid) {
                tracing::warn!(uid = %info.uid, "duplicate uid in map list, keeping first");
                continue;
            }
            let map = match old.swap_remove(&info.uid) {
                Some(existing) => {
                    existing.update(&info);
                    existing
                }
                None => Arc::new(Map::new(info)),
            };
            maps.insert(map.uid().clone(), map);
        }

        if !old.is_empty() {
            tracing::debug!(dropped = old.len(), "maps left the rotation");
        }
        self.maps = maps;
        self.maps.len()
    }

    /// Returns the cached map for `info.uid`, appending a new one at the
    /// end if the uid is unseen.
    pub fn insert(&mut self, info: MapInfo) -> Arc<Map> {
        if let Some(existing) = self.maps.get(&info.uid) {
            return Arc::clone(existing);
        }
        let map = Arc::new(Map::new(info));
        self.maps.insert(map.uid().clone(), Arc::clone(&map));
        map
    }

    /// Looks up a map by uid.
    pub fn get(&self, uid: &MapUid) -> Option<&Arc<Map>> {
        self.maps.get(uid)
    }

    /// Looks up a map by position.
    pub fn get_index(&self, index: usize) -> Option<&Arc<Map>> {
        self.maps.get_index(index).map(|(_, map)| map)
    }

    /// Position of `uid` in the rotation.
    pub fn index_of(&self, uid: &MapUid) -> Option<usize> {
        self.maps.get_index_of(uid)
    }

    /// Returns `true` if `uid` is cached.
    pub fn contains(&self, uid: &MapUid) -> bool {
        self.maps.contains_key(uid)
    }

    /// Up to `length` maps starting at `offset`. Out-of-range offsets
    /// yield an empty list.
    pub fn slice(&self, offset: usize, length: usize) -> Vec<Arc<Map>> {
        self.maps.values().skip(offset).take(length).cloned().collect()
    }

    /// Number of cached maps.
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Returns `true` if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Iterates the maps in rotation order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Map>> {
        self.maps.values()
    }
}

/// Pages through the remote rotation.
async fn fetch_listing<R: RemoteClient>(
    remote: &R,
    page_size: usize,
    max_maps: usize,
) -> Result<Vec<MapInfo>, RemoteError> {
    let page_size = page_size.max(1);
    let mut listing: Vec<MapInfo> = Vec::new();

    while listing.len() < max_maps {
        let offset = listing.len();
        let length = page_size.min(max_maps - offset);
        let page = match remote.map_list(offset, length).await {
            Ok(page) => page,
            Err(RemoteError::IndexOutOfBounds) => break,
            Err(err) => {
                tracing::warn!(offset, error = %err, "map list page failed, sync aborted");
                return Err(err);
            }
        };
        let short = page.len() < length;
        listing.extend(page);
        if short {
            break;
        }
    }

    if listing.len() > max_maps {
        tracing::warn!(max_maps, "map list exceeds sync cap, truncating");
        listing.truncate(max_maps);
    }
    Ok(listing)
}
