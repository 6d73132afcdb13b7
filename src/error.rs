//! Error types surfaced by the pool and proxy.

use thiserror::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors a caller may observe from [`crate::Pool`] or [`crate::Proxy`].
#[derive(Error, Debug)]
pub enum Error {
    /// An acquire deadline was exceeded waiting for a permit.
    #[error("timed out after {waited_ms}ms waiting for a resource (limit {timeout_ms}ms)")]
    Timeout {
        /// How long the caller actually waited, in milliseconds.
        waited_ms: u64,
        /// The timeout that was in effect, in milliseconds.
        timeout_ms: u64,
    },

    /// The operation was attempted on a pool that has already been shut down.
    #[error("pool has been shut down")]
    PoolShutdown,

    /// Construction-time inconsistency in pool or proxy configuration.
    #[error("invalid pool configuration: {message}")]
    PoolConfig {
        /// Human-readable description of what was inconsistent.
        message: String,
    },
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::PoolConfig {
            message: message.into(),
        }
    }

    /// Whether retrying the same operation might succeed without caller
    /// intervention (a `Timeout` may simply need a longer wait; a
    /// `PoolShutdown` or `PoolConfig` never will).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
