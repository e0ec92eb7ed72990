//! Batched calls: enqueue many, flush once.

use mapcycle_protocol::RemoteCall;

use crate::{CallResult, RemoteClient, RemoteError};

/// Collects calls and sends them to the server as one unit.
///
/// ```rust
/// use mapcycle_protocol::RemoteCall;
/// use mapcycle_rpc::Multicall;
///
/// let mut batch = Multicall::new();
/// batch.enqueue(RemoteCall::RemoveMap { file_name: "A.Map.Gbx".into() });
/// batch.enqueue(RemoteCall::RemoveMap { file_name: "B.Map.Gbx".into() });
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct Multicall {
    calls: Vec<RemoteCall>,
}

impl Multicall {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a call to the batch. Nothing is sent until [`flush`](Self::flush).
    pub fn enqueue(&mut self, call: RemoteCall) {
        self.calls.push(call);
    }

    /// Number of queued calls.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Sends every queued call and returns one result per call, in
    /// enqueue order. An empty batch makes no remote call.
    pub async fn flush<R: RemoteClient>(
        self,
        client: &R,
    ) -> Result<Vec<CallResult>, RemoteError> {
        if self.calls.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(calls = self.calls.len(), "flushing multicall");
        client.flush(self.calls).await
    }
}
