//! Deadline enforcement for remote calls.

use std::time::Duration;

use mapcycle_protocol::RemoteCall;

use crate::{CallResult, RemoteClient, RemoteError};

/// Wraps a [`RemoteClient`] so that no call waits longer than `limit`.
///
/// A call that runs out of time fails with [`RemoteError::Timeout`], which
/// callers treat as transient.
pub struct Timeout<R> {
    inner: R,
    limit: Duration,
}

impl<R: RemoteClient> Timeout<R> {
    /// Wraps `inner` with the given per-call deadline.
    pub fn new(inner: R, limit: Duration) -> Self {
        Self { inner, limit }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// The per-call deadline.
    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl<R: RemoteClient> RemoteClient for Timeout<R> {
    async fn call(&self, call: RemoteCall) -> CallResult {
        let method = call.method();
        match tokio::time::timeout(self.limit, self.inner.call(call)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    method,
                    limit_ms = self.limit.as_millis() as u64,
                    "remote call timed out"
                );
                Err(RemoteError::Timeout)
            }
        }
    }

    async fn flush(
        &self,
        calls: Vec<RemoteCall>,
    ) -> Result<Vec<CallResult>, RemoteError> {
        let count = calls.len();
        match tokio::time::timeout(self.limit, self.inner.flush(calls)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    calls = count,
                    limit_ms = self.limit.as_millis() as u64,
                    "multicall timed out"
                );
                Err(RemoteError::Timeout)
            }
        }
    }
}
