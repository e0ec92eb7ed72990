//! Identity types and map records.
//!
//! Both identifiers are string newtypes: game servers address maps by a
//! content uid and players by their login. Wrapping them keeps a `MapUid`
//! from being passed where a `PlayerId` is expected, and the constructors
//! are the single place where malformed input gets rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Longest identifier (in bytes) accepted by [`MapUid`] and [`PlayerId`].
pub const MAX_IDENTIFIER_LEN: usize = 64;

fn validate(raw: &str) -> Result<(), ProtocolError> {
    let well_formed = !raw.is_empty()
        && raw.len() <= MAX_IDENTIFIER_LEN
        && !raw.chars().any(|c| c.is_whitespace() || c.is_control());
    if well_formed {
        Ok(())
    } else {
        Err(ProtocolError::InvalidIdentifier(raw.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MapUid
// ---------------------------------------------------------------------------

/// The stable identifier of a map.
///
/// Survives list reorders and renames; two maps with the same uid are the
/// same map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MapUid(String);

impl MapUid {
    /// Creates a uid, rejecting malformed input.
    pub fn new(raw: impl Into<String>) -> Result<Self, ProtocolError> {
        let raw = raw.into();
        validate(&raw)?;
        Ok(Self(raw))
    }

    /// Returns the uid as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MapUid {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for MapUid {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MapUid> for String {
    fn from(uid: MapUid) -> Self {
        uid.0
    }
}

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// A player's login on the game server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a player id, rejecting malformed input.
    pub fn new(raw: impl Into<String>) -> Result<Self, ProtocolError> {
        let raw = raw.into();
        validate(&raw)?;
        Ok(Self(raw))
    }

    /// Returns the login as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PlayerId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PlayerId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// MapInfo
// ---------------------------------------------------------------------------

/// What the remote server reports about one map.
///
/// This is a plain record. The engine turns it into a cached
/// `Map` on first sight and uses later copies only to refresh that
/// instance's fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    /// Stable identifier.
    pub uid: MapUid,
    /// Path of the map file relative to the server's map directory.
    pub file_name: String,
    /// Display name (may contain formatting codes).
    pub name: String,
    /// Author login.
    pub author: String,
    /// Environment / decoration set.
    #[serde(default)]
    pub environment: String,
    /// Map type (game-mode family).
    #[serde(default)]
    pub map_type: String,
    /// Author medal time in milliseconds, when the server knows it.
    #[serde(default)]
    pub author_time: Option<u32>,
}
