//! Server dispatcher - the request/response boundary.
//!
//! `handle` takes raw inbound bytes and always produces response bytes:
//! decode failures, unknown services, unknown operations and handler
//! failures are all captured into the [`Response`] envelope and never
//! propagate past the dispatcher. As a last resort, when even the failed
//! response cannot be encoded, a plain-text minimal body goes out.
//!
//! Each request runs under a semaphore permit from a bounded pool, and the
//! implementation invocation is offloaded to a blocking worker so the
//! transport's I/O threads are never tied up by slow handlers.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;

use crate::codec::Codec;
use crate::error::RpcError;
use crate::message::{ErrorInfo, Request, Response};
use crate::server::LocalRegistry;

/// Default bound on concurrently executing requests.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 256;

/// Static page served to non-RPC probes (e.g. a browser GET with no body).
const PROBE_PAGE: &str = "<html><body>\
<h1>RPC server is running</h1>\
<p>This is an RPC service endpoint and does not support direct browser access.</p>\
<p>Use an RPC client to call this service.</p>\
</body></html>";

/// Resolves inbound requests against a [`LocalRegistry`] and executes them
/// safely.
pub struct ServerDispatcher {
    local: Arc<LocalRegistry>,
    codec: Arc<dyn Codec>,
    permits: Arc<Semaphore>,
}

impl ServerDispatcher {
    /// Create a dispatcher with the default worker bound.
    pub fn new(local: Arc<LocalRegistry>, codec: Arc<dyn Codec>) -> Self {
        Self::with_worker_limit(local, codec, DEFAULT_MAX_CONCURRENT_REQUESTS)
    }

    /// Create a dispatcher with an explicit bound on concurrent requests.
    pub fn with_worker_limit(
        local: Arc<LocalRegistry>,
        codec: Arc<dyn Codec>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            local,
            codec,
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// The static informational page for bodyless GET-style probes.
    pub fn probe_page() -> &'static str {
        PROBE_PAGE
    }

    /// Handle one inbound request body, returning the encoded response.
    pub async fn handle(&self, body: Bytes) -> Bytes {
        let response = match self.permits.clone().acquire_owned().await {
            Ok(_permit) => self.process(body).await,
            // Only reachable if the semaphore is closed, which we never do.
            Err(_) => Response::failure("dispatcher is shutting down"),
        };
        self.encode(response)
    }

    async fn process(&self, body: Bytes) -> Response {
        if body.is_empty() {
            return Response::failure("request body is empty");
        }

        let request = match self.codec.decode_request(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode inbound request");
                return Response::failure(format!("failed to decode request: {e}"));
            }
        };
        tracing::debug!(
            service = %request.service_name,
            method = %request.method_name,
            "dispatching request"
        );

        // Handlers are synchronous closures; run them off the I/O threads.
        let local = self.local.clone();
        match tokio::task::spawn_blocking(move || Self::execute(&local, &request)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "invocation worker failed");
                Response::failure(format!("invocation worker failed: {e}"))
            }
        }
    }

    fn execute(local: &LocalRegistry, request: &Request) -> Response {
        let handle = match local.get(&request.service_name) {
            Ok(handle) => handle,
            Err(e) => {
                return Response::remote_error(ErrorInfo::new("service_not_found", e.to_string()))
            }
        };

        match handle.invoke(&request.method_name, &request.param_types, &request.args) {
            Ok((data, data_type)) => Response::ok(data, data_type),
            Err(RpcError::OperationNotFound { service, method }) => Response::remote_error(
                ErrorInfo::new(
                    "operation_not_found",
                    format!("operation not found: {service}.{method}"),
                ),
            ),
            Err(RpcError::Remote(info)) => {
                tracing::warn!(
                    service = %request.service_name,
                    method = %request.method_name,
                    error = %info,
                    "handler failed"
                );
                Response::remote_error(info)
            }
            Err(e) => Response::remote_error(ErrorInfo::new("execution", e.to_string())),
        }
    }

    fn encode(&self, response: Response) -> Bytes {
        match self.codec.encode_response(&response) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response");
                let minimal = Response::failure("response encoding failed");
                match self.codec.encode_response(&minimal) {
                    Ok(bytes) => Bytes::from(bytes),
                    // Last resort: a plain-text body instead of an empty one.
                    Err(_) => Bytes::from_static(b"response encoding failed"),
                }
            }
        }
    }
}
