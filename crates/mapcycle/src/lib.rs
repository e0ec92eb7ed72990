//! # Mapcycle
//!
//! Map rotation and jukebox engine for dedicated game servers.
//!
//! Mapcycle keeps a local mirror of the maps a game server will play,
//! reacts to the server's map and player callbacks, and lets players
//! queue the maps they want next. One engine runs per connected server,
//! inside its own Tokio task; the rest of the controller talks to it
//! through an [`EngineHandle`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mapcycle::prelude::*;
//!
//! # async fn demo(remote: InMemoryServer) -> Result<(), MapcycleError> {
//! let feed = remote.callbacks();
//! let server = RotationServerBuilder::new().build(remote, StaticAuthorizer::new(), feed);
//! let handle = server.handle();
//! tokio::spawn(server.run());
//!
//! let uid: MapUid = "Stadium_A01".parse()?;
//! handle.add_to_queue(Submitter::Server, uid).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod handle;
mod handler;
mod server;
mod trace;

pub use error::MapcycleError;
pub use handle::EngineHandle;
pub use server::{RotationServer, RotationServerBuilder};
pub use trace::init_tracing;

/// Everything needed to run an engine and talk to it.
pub mod prelude {
    pub use crate::{EngineHandle, MapcycleError, RotationServer, RotationServerBuilder};
    pub use mapcycle_protocol::{MapInfo, MapUid, PlayerId, RemoteCall, ServerCallback};
    pub use mapcycle_rotation::{
        Map, QueueChange, QueueConfig, QueueEntry, QueueRejection, Restructure, RotationConfig,
        RotationError, RotationEvent, Submitter,
    };
    #[cfg(feature = "memory")]
    pub use mapcycle_rpc::InMemoryServer;
    pub use mapcycle_rpc::{RemoteClient, RemoteError};
    pub use mapcycle_session::{AuthLevel, Authorizer, SessionConfig, StaticAuthorizer};
}
