//! Client invoker - the fault-tolerant invocation pipeline.
//!
//! One invocation runs: registry lookup → circuit breaker gate →
//! retry-wrapped transport round trip → fallback on failure. The breaker
//! gate sits before any network attempt, so an open circuit resolves to the
//! fallback value without touching the transport at all.
//!
//! Two shapes of call:
//!
//! - [`RpcClient::invoke`] - synchronous semantics: the caller awaits the
//!   result, bounded by the configured timeout; a timeout resolves to the
//!   fallback value while the underlying work keeps running.
//! - [`RpcClient::invoke_deferred`] - returns a [`CallHandle`] immediately;
//!   the round trip runs on a worker task and the handle resolves when it
//!   finishes.
//!
//! [`RpcClient::call`] dispatches between the two on the operation's
//! declared return shape ([`OperationDescriptor::deferred`]), the way the
//! original call site would distinguish a pending-handle return type from a
//! plain value.
//!
//! # Example
//!
//! ```ignore
//! use breakwater::client::{OperationDescriptor, RpcClient};
//!
//! let op = OperationDescriptor::new("UserService", "getUser")
//!     .params(&["User"])
//!     .returns("User");
//! let user = client.invoke(&op, vec![serde_json::json!({"name": "alice"})]).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::codec::{Codec, MsgPackCodec};
use crate::context::RpcContext;
use crate::error::{Result, RpcError};
use crate::message::{Request, Response};
use crate::retry::RetryExecutor;
use crate::transport::Transport;

/// Identifies a remote operation and its call-site signature.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    /// Service type / fully-qualified service name.
    pub service: String,
    /// Method name within the service.
    pub method: String,
    /// Ordered parameter type descriptors.
    pub param_types: Vec<String>,
    /// Declared result type descriptor (used for zero-value fallbacks).
    pub return_type: String,
    /// Whether the declared result shape is a pending handle.
    pub deferred: bool,
}

impl OperationDescriptor {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            param_types: Vec::new(),
            return_type: String::new(),
            deferred: false,
        }
    }

    /// Set the ordered parameter type descriptors.
    pub fn params(mut self, types: &[&str]) -> Self {
        self.param_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Set the declared result type descriptor.
    pub fn returns(mut self, return_type: &str) -> Self {
        self.return_type = return_type.to_string();
        self
    }

    /// Declare the result shape as a pending handle (async dispatch).
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }
}

/// Pending result of a deferred invocation.
///
/// Waiting is decoupled from the underlying work: if [`CallHandle::wait`]
/// times out, the spawned round trip keeps running and its eventual result
/// is discarded.
pub struct CallHandle {
    rx: oneshot::Receiver<Result<Value>>,
}

impl CallHandle {
    /// Block on the handle for at most `timeout`.
    ///
    /// # Errors
    ///
    /// [`RpcError::Timeout`] when the bound elapses first; the work itself
    /// is not cancelled.
    pub async fn wait(self, timeout: Duration) -> Result<Value> {
        match tokio::time::timeout(timeout, self.rx).await {
            Err(_) => Err(RpcError::Timeout),
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RpcError::Transport(
                "invocation task dropped before completing".to_string(),
            )),
        }
    }

    /// Await the handle without a bound.
    pub async fn join(self) -> Result<Value> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Transport(
                "invocation task dropped before completing".to_string(),
            )),
        }
    }

    fn resolved(result: Result<Value>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }
}

/// Result of [`RpcClient::call`]: a plain value or a pending handle,
/// depending on the operation's declared return shape.
pub enum CallOutcome {
    Value(Value),
    Handle(CallHandle),
}

/// Client-side invoker orchestrating discovery, circuit breaking, retry and
/// fallback around a pluggable transport and codec.
pub struct RpcClient {
    ctx: Arc<RpcContext>,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn Codec>,
}

impl RpcClient {
    /// Create a client with the default MsgPack codec.
    pub fn new(ctx: Arc<RpcContext>, transport: Arc<dyn Transport>) -> Self {
        Self {
            ctx,
            transport,
            codec: Arc::new(MsgPackCodec),
        }
    }

    /// Swap in a different wire codec.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// The shared context this client invokes against.
    pub fn context(&self) -> &Arc<RpcContext> {
        &self.ctx
    }

    /// Invoke with synchronous semantics: await the result up to the
    /// configured timeout, substituting the fallback value when the round
    /// trip cannot complete.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Remote`] when the remote implementation itself failed.
    /// - [`RpcError::NoServiceAvailable`] when no endpoint is resolvable.
    ///
    /// Transport failures, timeouts and exhausted retries do not surface;
    /// they resolve to the fallback value.
    pub async fn invoke(&self, op: &OperationDescriptor, args: Vec<Value>) -> Result<Value> {
        let handle = self.invoke_deferred(op, args.clone());
        match handle.wait(self.ctx.config.timeout).await {
            Ok(value) => Ok(value),
            Err(e) if matches!(e, RpcError::Remote(_) | RpcError::NoServiceAvailable(_)) => Err(e),
            Err(e) => {
                tracing::warn!(
                    service = %op.service,
                    method = %op.method,
                    error = %e,
                    "bounded wait failed, serving fallback"
                );
                Ok(self.fallback_value(op, &args))
            }
        }
    }

    /// Invoke with asynchronous semantics: the round trip is dispatched
    /// onto a worker task and a pending handle is returned immediately.
    ///
    /// An open circuit resolves the handle with the fallback value without
    /// any transport attempt; exhausted retries likewise resolve to the
    /// fallback value.
    pub fn invoke_deferred(&self, op: &OperationDescriptor, args: Vec<Value>) -> CallHandle {
        let url = match self.ctx.registry.get_next_service_url(&op.service) {
            Ok(url) => url,
            Err(e) => return CallHandle::resolved(Err(e)),
        };

        // Breaker gate: an open circuit short-circuits to fallback before
        // any network attempt, never surfacing the refusal itself.
        if let Err(gate) = self.ctx.breaker.check_available(&url) {
            tracing::debug!(%url, error = %gate, "serving fallback");
            return CallHandle::resolved(Ok(self.fallback_value(op, &args)));
        }

        let (tx, rx) = oneshot::channel();
        let ctx = self.ctx.clone();
        let transport = self.transport.clone();
        let codec = self.codec.clone();
        let op = op.clone();

        tokio::spawn(async move {
            let retry = RetryExecutor::new(ctx.config.max_retries, ctx.config.retry_interval);
            let timeout = ctx.config.timeout;

            let result = retry
                .execute_with_retry(&ctx.breaker, &url, || {
                    round_trip(
                        transport.as_ref(),
                        codec.as_ref(),
                        &url,
                        &op,
                        &args,
                        timeout,
                    )
                })
                .await;

            let outcome = match result {
                Ok(response) => match response.error {
                    // The exchange succeeded; the remote implementation did
                    // not. Surfaced as-is, neither retried nor substituted.
                    Some(info) => Err(RpcError::Remote(info)),
                    None => Ok(response.data.unwrap_or(Value::Null)),
                },
                Err(e) => {
                    tracing::warn!(
                        %url,
                        service = %op.service,
                        method = %op.method,
                        error = %e,
                        "all attempts failed, serving fallback"
                    );
                    Ok(ctx.fallbacks.get_fallback_result(
                        &op.service,
                        &op.method,
                        &args,
                        &op.return_type,
                    ))
                }
            };
            let _ = tx.send(outcome);
        });

        CallHandle { rx }
    }

    /// Dispatch on the operation's declared return shape: pending-handle
    /// operations go deferred and the handle is returned directly, plain
    /// operations run with synchronous semantics.
    pub async fn call(&self, op: &OperationDescriptor, args: Vec<Value>) -> Result<CallOutcome> {
        if op.deferred {
            Ok(CallOutcome::Handle(self.invoke_deferred(op, args)))
        } else {
            self.invoke(op, args).await.map(CallOutcome::Value)
        }
    }

    fn fallback_value(&self, op: &OperationDescriptor, args: &[Value]) -> Value {
        self.ctx
            .fallbacks
            .get_fallback_result(&op.service, &op.method, args, &op.return_type)
    }
}

/// One full round trip: build the request, encode, exchange, decode.
async fn round_trip(
    transport: &dyn Transport,
    codec: &dyn Codec,
    url: &str,
    op: &OperationDescriptor,
    args: &[Value],
    timeout: Duration,
) -> Result<Response> {
    let request = Request::new(
        op.service.clone(),
        op.method.clone(),
        op.param_types.clone(),
        args.to_vec(),
    );
    let body = codec.encode_request(&request)?;

    let raw = match tokio::time::timeout(timeout, transport.exchange(url, Bytes::from(body))).await
    {
        Ok(exchanged) => exchanged?,
        Err(_) => return Err(RpcError::Timeout),
    };

    if raw.is_empty() {
        return Err(RpcError::Transport("empty response body".to_string()));
    }
    codec.decode_response(&raw)
}
