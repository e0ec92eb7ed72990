/// Errors a remote call can fail with.
///
/// The first five variants are faults the game server itself reports;
/// the rest come from the client side of the connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The server is already switching maps and refuses to touch the
    /// rotation until it is done.
    #[error("rotation change already in progress")]
    RotationChangeInProgress,

    /// The referenced map is not part of the rotation.
    #[error("map not in rotation")]
    MapNotInList,

    /// The rotation reached the server's size limit.
    #[error("map list is full")]
    MapListFull,

    /// The referenced map file or uid is unknown or unusable.
    #[error("invalid map reference")]
    InvalidMapReference,

    /// A paginated read started past the end of the list.
    #[error("index out of bounds")]
    IndexOutOfBounds,

    /// The server did not answer in time.
    #[error("remote call timed out")]
    Timeout,

    /// The connection to the server failed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with a reply of the wrong shape.
    #[error("unexpected reply {0}")]
    UnexpectedReply(&'static str),
}

impl RemoteError {
    /// Returns `true` for conditions that clear up on their own. Callers
    /// accept the current remote state and wait for the next sync.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RotationChangeInProgress | Self::Timeout)
    }
}
