//! Current-map lifecycle state machine.

use std::fmt;
use std::sync::Arc;

use mapcycle_protocol::MapUid;

use crate::Map;

// ---------------------------------------------------------------------------
// LifecycleState
// ---------------------------------------------------------------------------

/// Where the current map is in its life.
///
/// ```text
/// Idle ──begin──→ Active ──end──→ Ended ──begin──→ Active ...
/// ```
///
/// - **Idle**: no map has begun since the engine attached.
/// - **Active**: a map is being played; its begin has been announced.
/// - **Ended**: the map's end has been announced; waiting for the next
///   begin.
///
/// The server may repeat begin and end notifications. The state makes
/// the repeats no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Active,
    Ended,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Active => write!(f, "Active"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

// ---------------------------------------------------------------------------
// MapLifecycle
// ---------------------------------------------------------------------------

/// Tracks the current map and whether its begin/end have fired.
#[derive(Debug, Default)]
pub struct MapLifecycle {
    state: LifecycleState,
    current: Option<Arc<Map>>,
}

impl MapLifecycle {
    /// Creates an idle lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The map that began last, if any. Stays set after its end.
    pub fn current(&self) -> Option<&Arc<Map>> {
        self.current.as_ref()
    }

    /// Returns `true` if `uid` is the map currently active.
    pub fn is_active_for(&self, uid: &MapUid) -> bool {
        self.state == LifecycleState::Active
            && self.current.as_ref().is_some_and(|m| m.uid() == uid)
    }

    /// Marks `map` as begun.
    pub fn activate(&mut self, map: Arc<Map>) {
        self.current = Some(map);
        self.state = LifecycleState::Active;
    }

    /// Marks the current map as ended.
    ///
    /// Returns the map the first time per begin; `None` when idle or
    /// already ended.
    pub fn end(&mut self) -> Option<Arc<Map>> {
        if self.state != LifecycleState::Active {
            return None;
        }
        self.state = LifecycleState::Ended;
        self.current.clone()
    }
}
