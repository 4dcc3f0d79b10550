//! Error types for breakwater.

use thiserror::Error;

use crate::message::ErrorInfo;

/// Main error type for all breakwater operations.
#[derive(Debug, Error)]
pub enum RpcError {
    /// I/O error from a transport implementation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failure: non-success status or empty/malformed body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The round trip exceeded the configured deadline.
    #[error("call timed out")]
    Timeout,

    /// MsgPack serialization error.
    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// The circuit for the target endpoint is open; no request was attempted.
    ///
    /// Internal signal: the invoker converts this into a fallback result
    /// before the caller sees it.
    #[error("circuit open for {0}")]
    CircuitOpen(String),

    /// No endpoint resolvable for the service type, even after default-URL
    /// synthesis.
    #[error("no service available for type {0}")]
    NoServiceAvailable(String),

    /// Server side: no implementation registered under the service name.
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// Server side: the service has no operation matching the method name
    /// and parameter signature.
    #[error("operation not found: {service}.{method}")]
    OperationNotFound { service: String, method: String },

    /// All retry attempts failed; wraps the last failure.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<RpcError>,
    },

    /// The remote implementation itself failed; carried in
    /// `Response.error`, never thrown across the wire.
    #[error("remote execution failed: {0}")]
    Remote(ErrorInfo),
}

/// Result type alias using RpcError.
pub type Result<T> = std::result::Result<T, RpcError>;
