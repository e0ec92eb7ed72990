//! Map rotation and jukebox for Mapcycle.
//!
//! The engine keeps a local, ordered view of the maps a game server will
//! play, reconciles it with the server's authoritative list, and lets
//! players choose what plays next through a request queue.
//!
//! # Key types
//!
//! - [`MapEngine`]: owns everything below and reacts to server events
//! - [`MapCache`]: the ordered local mirror of the rotation
//! - [`MapLifecycle`]: current map with idempotent begin/end
//! - [`MapQueue`]: the jukebox: quotas, recent-play buffer, skip-on-leave
//! - [`rotate_after`]: the restructurer's cyclic reorder
//! - [`RotationEvent`]: what subscribers are told
//! - [`RotationConfig`]: policy and sync settings
//!
//! ```text
//! server callback → MapLifecycle → MapQueue → SetNextMap
//!                         ↓
//!                   Restructurer → ChooseNextMaps
//! ```

mod buffer;
mod cache;
mod config;
mod engine;
mod error;
mod events;
mod lifecycle;
mod map;
mod queue;
mod restructure;

pub use buffer::RecentPlayBuffer;
pub use cache::MapCache;
pub use config::{QueueConfig, RotationConfig, UNLIMITED};
pub use engine::MapEngine;
pub use error::{QueueRejection, RotationError};
pub use events::{EventBus, QueueChange, RotationEvent};
pub use lifecycle::{LifecycleState, MapLifecycle};
pub use map::Map;
pub use queue::{MapEndOutcome, MapQueue, QueueEntry, Submitter};
pub use restructure::{Restructure, rotate_after};
