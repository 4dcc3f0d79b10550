//! Administrative surface over the discovery registry.
//!
//! Operator- and test-facing operations, off the invocation hot path.
//! Expressed as typed operations returning serializable outcomes; hanging
//! them off an HTTP router is the embedder's business.

use std::sync::Arc;

use serde::Serialize;

use crate::context::RpcContext;
use crate::registry::DEFAULT_SERVICE_TYPE;

/// Outcome of a single register/unregister operation.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterOutcome {
    pub status: &'static str,
    pub message: String,
    pub service_type: String,
    pub service_url: String,
}

/// Outcome of a batch registration.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub status: &'static str,
    /// Number of pairs actually applied (blank URLs are skipped).
    pub applied: usize,
}

/// Operator handle over the shared registry state.
pub struct RegistryAdmin {
    ctx: Arc<RpcContext>,
}

impl RegistryAdmin {
    pub fn new(ctx: Arc<RpcContext>) -> Self {
        Self { ctx }
    }

    /// Register a (service type, URL) pair.
    pub fn register(&self, service_type: &str, service_url: &str) -> RegisterOutcome {
        self.ctx.registry.register(service_type, service_url);
        RegisterOutcome {
            status: "success",
            message: "service registered".to_string(),
            service_type: service_type.to_string(),
            service_url: service_url.to_string(),
        }
    }

    /// List all URLs for a service type, or the default type if omitted.
    pub fn services(&self, service_type: Option<&str>) -> Vec<String> {
        self.ctx
            .registry
            .get_all_service_urls(service_type.unwrap_or(DEFAULT_SERVICE_TYPE))
    }

    /// Unregister a (service type, URL) pair.
    pub fn unregister(&self, service_type: &str, service_url: &str) -> RegisterOutcome {
        self.ctx.registry.unregister(service_type, service_url);
        RegisterOutcome {
            status: "success",
            message: "service removed".to_string(),
            service_type: service_type.to_string(),
            service_url: service_url.to_string(),
        }
    }

    /// Register a batch of (service type, URL) pairs in one call.
    ///
    /// Pairs with an empty URL are skipped; an empty type maps to the
    /// default type. Reports the number of pairs applied.
    pub fn register_batch(&self, pairs: &[(String, String)]) -> BatchOutcome {
        let mut applied = 0;
        for (service_type, service_url) in pairs {
            if service_url.is_empty() {
                continue;
            }
            self.ctx.registry.register(service_type, service_url);
            applied += 1;
        }
        BatchOutcome {
            status: "success",
            applied,
        }
    }
}
