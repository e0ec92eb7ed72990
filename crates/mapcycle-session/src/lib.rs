//! Player presence tracking for Mapcycle.
//!
//! This crate answers two questions the jukebox keeps asking:
//!
//! 1. **Is this player still here?** [`PlayerRoster`] tracks connects and
//!    disconnects as the server reports them.
//! 2. **How much is this player allowed?** [`AuthLevel`], looked up
//!    through the [`Authorizer`] trait when the player connects.
//!
//! # How it fits in the stack
//!
//! ```text
//! Rotation engine (above)  ← asks who is connected and who is privileged
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Protocol layer (below)  ← provides PlayerId
//! ```

mod auth;
mod error;
mod roster;
mod session;

pub use auth::{AuthLevel, Authorizer, StaticAuthorizer};
pub use error::SessionError;
pub use roster::PlayerRoster;
pub use session::{Session, SessionConfig, SessionState};
