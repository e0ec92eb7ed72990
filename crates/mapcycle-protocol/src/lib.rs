//! Protocol types for Mapcycle.
//!
//! This crate defines the vocabulary shared by every other layer:
//!
//! - **Identifiers** ([`MapUid`], [`PlayerId`]): validated newtypes.
//! - **Map records** ([`MapInfo`]): what the remote server reports about a map.
//! - **Remote calls** ([`RemoteCall`], [`RemoteReply`]): the requests the
//!   engine makes of the game server and the shapes of the answers.
//! - **Server callbacks** ([`ServerCallback`]): events the game server
//!   pushes to the engine.
//!
//! It knows nothing about transports or engine state. The wire encoding of
//! these types belongs to whichever RPC client carries them.
//!
//! ```text
//! RPC client (bytes) → Protocol (RemoteCall / ServerCallback) → Rotation engine
//! ```

mod callback;
mod call;
mod error;
mod types;

pub use call::{RemoteCall, RemoteReply};
pub use callback::ServerCallback;
pub use error::ProtocolError;
pub use types::{MapInfo, MapUid, PlayerId, MAX_IDENTIFIER_LEN};
