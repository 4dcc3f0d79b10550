//! Client-side service registry - discovery and round-robin load balancing.
//!
//! Endpoint URLs are stored per service type in a sharded concurrent map, so
//! registration of one service type never contends with readers or writers
//! of another. Registration is idempotent and built for high concurrent
//! rates: an unsynchronized existence check skips the write path for the
//! common re-register case, and the check is repeated under the shard write
//! guard to close the race. The fast path is a best-effort skip, not a
//! correctness-bearing check.
//!
//! Round robin is an atomically advanced per-type cursor taken modulo the
//! list length at call time. No rebalancing happens on concurrent resize;
//! an endpoint removed mid-rotation simply stops appearing in later
//! snapshots.
//!
//! # Example
//!
//! ```
//! use breakwater::registry::ServiceRegistry;
//!
//! let registry = ServiceRegistry::new("localhost", 8080);
//! registry.register("users", "http://10.0.0.1:8081");
//! registry.register("users", "http://10.0.0.2:8081");
//!
//! assert_eq!(registry.get_next_service_url("users").unwrap(), "http://10.0.0.1:8081");
//! assert_eq!(registry.get_next_service_url("users").unwrap(), "http://10.0.0.2:8081");
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use crate::error::{Result, RpcError};

/// Service type used when none is given (or the given one is empty).
pub const DEFAULT_SERVICE_TYPE: &str = "default";

/// Per-service-type endpoint list with its round-robin cursor.
#[derive(Debug, Default)]
struct RegistryEntry {
    urls: Vec<String>,
    cursor: AtomicUsize,
}

/// Process-wide store of known service endpoints.
///
/// Construct once and share by reference; all mutation goes through the
/// operations below.
#[derive(Debug)]
pub struct ServiceRegistry {
    services: DashMap<String, RegistryEntry>,
    default_host: String,
    default_port: u16,
}

impl ServiceRegistry {
    /// Create a registry with the given host/port for default endpoint
    /// synthesis.
    pub fn new(default_host: impl Into<String>, default_port: u16) -> Self {
        Self {
            services: DashMap::new(),
            default_host: default_host.into(),
            default_port,
        }
    }

    fn normalize(service_type: &str) -> &str {
        if service_type.is_empty() {
            DEFAULT_SERVICE_TYPE
        } else {
            service_type
        }
    }

    /// Register an endpoint URL for a service type. Idempotent: registering
    /// an already-present URL is a no-op.
    pub fn register(&self, service_type: &str, service_url: &str) {
        let service_type = Self::normalize(service_type);

        // Fast path: skip the write section when the URL is already there.
        if let Some(entry) = self.services.get(service_type) {
            if entry.urls.iter().any(|u| u == service_url) {
                return;
            }
        }

        let mut entry = self
            .services
            .entry(service_type.to_string())
            .or_default();
        // Re-check under the shard write guard.
        if !entry.urls.iter().any(|u| u == service_url) {
            entry.urls.push(service_url.to_string());
            tracing::debug!(service_type, service_url, "registered endpoint");
        }
    }

    /// Return the next endpoint for a service type, advancing the
    /// round-robin cursor.
    ///
    /// An unknown type falls back to [`DEFAULT_SERVICE_TYPE`]; if that is
    /// also empty, a default URL is synthesized from the configured
    /// host/port, registered, and returned.
    ///
    /// # Errors
    ///
    /// [`RpcError::NoServiceAvailable`] if no endpoint is resolvable even
    /// after default-URL synthesis (a concurrent `clear` can cause this).
    pub fn get_next_service_url(&self, service_type: &str) -> Result<String> {
        let service_type = Self::normalize(service_type);

        if let Some(url) = self.next_from(service_type) {
            return Ok(url);
        }
        if service_type != DEFAULT_SERVICE_TYPE {
            if let Some(url) = self.next_from(DEFAULT_SERVICE_TYPE) {
                return Ok(url);
            }
        }

        // Nothing registered anywhere: synthesize the default endpoint.
        let default_url = format!("http://{}:{}", self.default_host, self.default_port);
        tracing::debug!(%default_url, "no endpoints registered, synthesizing default");
        self.register(DEFAULT_SERVICE_TYPE, &default_url);

        self.next_from(DEFAULT_SERVICE_TYPE)
            .ok_or_else(|| RpcError::NoServiceAvailable(service_type.to_string()))
    }

    fn next_from(&self, service_type: &str) -> Option<String> {
        let entry = self.services.get(service_type)?;
        if entry.urls.is_empty() {
            return None;
        }
        // fetch_add is a single atomic advance: no two callers observe the
        // same cursor value without an intervening increment.
        let index = entry.cursor.fetch_add(1, Ordering::Relaxed) % entry.urls.len();
        Some(entry.urls[index].clone())
    }

    /// All endpoint URLs for a service type, as a defensive copy. Empty for
    /// an unknown type.
    pub fn get_all_service_urls(&self, service_type: &str) -> Vec<String> {
        let service_type = Self::normalize(service_type);
        self.services
            .get(service_type)
            .map(|entry| entry.urls.clone())
            .unwrap_or_default()
    }

    /// Remove an endpoint URL from a service type; no-op if absent.
    pub fn unregister(&self, service_type: &str, service_url: &str) {
        let service_type = Self::normalize(service_type);
        if let Some(mut entry) = self.services.get_mut(service_type) {
            let before = entry.urls.len();
            entry.urls.retain(|u| u != service_url);
            if entry.urls.len() != before {
                tracing::debug!(service_type, service_url, "unregistered endpoint");
            }
        }
    }

    /// Wipe all registry state. Administrative/test use.
    pub fn clear(&self) {
        self.services.clear();
        tracing::debug!("service registry cleared");
    }
}
