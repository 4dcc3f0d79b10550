//! Shared invocation context.
//!
//! The registry, breaker and fallback stores are process-wide shared state.
//! Rather than implicit singletons they live in one [`RpcContext`] built at
//! startup and passed by `Arc` to every component that needs them; tests
//! construct fresh contexts and can tear shared state down with
//! [`RpcContext::reset`].

use crate::breaker::CircuitBreaker;
use crate::config::RpcConfig;
use crate::fallback::FallbackRegistry;
use crate::registry::ServiceRegistry;

/// Shared state for the client invocation pipeline.
pub struct RpcContext {
    pub config: RpcConfig,
    pub registry: ServiceRegistry,
    pub breaker: CircuitBreaker,
    pub fallbacks: FallbackRegistry,
}

impl RpcContext {
    /// Build the shared stores from one configuration.
    pub fn new(config: RpcConfig) -> Self {
        let registry = ServiceRegistry::new(config.default_host.clone(), config.default_port);
        let breaker = CircuitBreaker::new(config.failure_threshold, config.recovery_window);
        Self {
            config,
            registry,
            breaker,
            fallbacks: FallbackRegistry::new(),
        }
    }

    /// Wipe all shared mutable state (registry entries, breaker targets,
    /// fallbacks). Test/administrative use.
    pub fn reset(&self) {
        self.registry.clear();
        self.breaker.reset();
        self.fallbacks.clear();
    }
}

impl Default for RpcContext {
    fn default() -> Self {
        Self::new(RpcConfig::default())
    }
}
