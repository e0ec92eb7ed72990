//! Remote client abstraction for Mapcycle.
//!
//! Provides the [`RemoteClient`] trait that the rotation engine uses to
//! talk to the game server, a [`Multicall`] batch builder, and a
//! [`Timeout`] wrapper. The encoding and the socket are the implementor's
//! business; the engine only sees [`RemoteCall`]s going out and
//! [`RemoteReply`]s or [`RemoteError`]s coming back.
//!
//! # Feature Flags
//!
//! - `memory` (default): [`InMemoryServer`], a simulated game server that
//!   also produces the server callback feed

mod error;
#[cfg(feature = "memory")]
mod memory;
mod multicall;
mod timeout;

pub use error::RemoteError;
#[cfg(feature = "memory")]
pub use memory::InMemoryServer;
pub use multicall::Multicall;
pub use timeout::Timeout;

use std::future::Future;

use mapcycle_protocol::{MapInfo, MapUid, PlayerId, RemoteCall, RemoteReply};

/// Result of one call inside a flushed batch.
pub type CallResult = Result<RemoteReply, RemoteError>;

/// A request/response channel to one game server.
///
/// Calls look synchronous to the caller: the future resolves once the
/// server has answered. The typed helpers (`map_list`, `set_next_map`, …)
/// wrap [`call`](Self::call) and check the reply shape, so implementors
/// only need to provide `call`.
pub trait RemoteClient: Send + Sync + 'static {
    /// Sends one call and waits for the answer.
    fn call(
        &self,
        call: RemoteCall,
    ) -> impl Future<Output = CallResult> + Send;

    /// Sends a batch of calls as one unit.
    ///
    /// The outer `Err` means the batch as a whole failed (nothing is known
    /// about individual calls). Otherwise there is one result per call, in
    /// order. The default sends the calls one by one.
    fn flush(
        &self,
        calls: Vec<RemoteCall>,
    ) -> impl Future<Output = Result<Vec<CallResult>, RemoteError>> + Send {
        async move {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.call(call).await);
            }
            Ok(results)
        }
    }

    /// Reads one page of the rotation.
    fn map_list(
        &self,
        offset: usize,
        length: usize,
    ) -> impl Future<Output = Result<Vec<MapInfo>, RemoteError>> + Send {
        async move {
            match self.call(RemoteCall::GetMapList { offset, length }).await? {
                RemoteReply::Maps(maps) => Ok(maps),
                other => Err(RemoteError::UnexpectedReply(other.kind())),
            }
        }
    }

    /// Reads the map currently being played.
    fn current_map_info(
        &self,
    ) -> impl Future<Output = Result<MapInfo, RemoteError>> + Send {
        async move { expect_map(self.call(RemoteCall::GetCurrentMapInfo).await?) }
    }

    /// Reads who is on the server right now.
    fn player_list(
        &self,
    ) -> impl Future<Output = Result<Vec<PlayerId>, RemoteError>> + Send {
        async move {
            match self.call(RemoteCall::GetPlayerList).await? {
                RemoteReply::Players(players) => Ok(players),
                other => Err(RemoteError::UnexpectedReply(other.kind())),
            }
        }
    }

    /// Reads the record of a map file.
    fn map_info(
        &self,
        file_name: &str,
    ) -> impl Future<Output = Result<MapInfo, RemoteError>> + Send {
        let call = RemoteCall::GetMapInfo {
            file_name: file_name.to_string(),
        };
        async move { expect_map(self.call(call).await?) }
    }

    /// Sets the map that plays after the current one.
    fn set_next_map(
        &self,
        uid: &MapUid,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send {
        let call = RemoteCall::SetNextMap { uid: uid.clone() };
        async move { self.call(call).await.map(|_| ()) }
    }

    /// Reorders the upcoming maps. Returns how many the server accepted.
    fn choose_next_maps(
        &self,
        file_names: Vec<String>,
    ) -> impl Future<Output = Result<usize, RemoteError>> + Send {
        async move {
            match self.call(RemoteCall::ChooseNextMaps { file_names }).await? {
                RemoteReply::Done(n) => Ok(n),
                other => Err(RemoteError::UnexpectedReply(other.kind())),
            }
        }
    }

    /// Appends a map file to the rotation.
    fn add_map(
        &self,
        file_name: &str,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send {
        let call = RemoteCall::AddMap {
            file_name: file_name.to_string(),
        };
        async move { self.call(call).await.map(|_| ()) }
    }

    /// Ends the current map.
    fn next_map(&self) -> impl Future<Output = Result<(), RemoteError>> + Send {
        async move { self.call(RemoteCall::NextMap).await.map(|_| ()) }
    }

    /// Restarts the current map.
    fn restart_map(
        &self,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send {
        async move { self.call(RemoteCall::RestartMap).await.map(|_| ()) }
    }

    /// Switches straight to `uid`.
    fn jump_to_map(
        &self,
        uid: &MapUid,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send {
        let call = RemoteCall::JumpToMap { uid: uid.clone() };
        async move { self.call(call).await.map(|_| ()) }
    }
}

fn expect_map(reply: RemoteReply) -> Result<MapInfo, RemoteError> {
    match reply {
        RemoteReply::Map(info) => Ok(info),
        other => Err(RemoteError::UnexpectedReply(other.kind())),
    }
}
