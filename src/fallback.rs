//! Degraded-response fallbacks, keyed by (service, method).
//!
//! When all retries are exhausted or a target's circuit is open, the
//! invoker asks here for a substitute result. A registered fallback
//! function receives the original call arguments; with nothing registered,
//! a zero value inferred from the declared return type descriptor is
//! produced instead. Lookup never fails.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

/// A fallback function: call arguments in, substitute result out.
pub type FallbackFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Keyed registry of degraded-response producers.
///
/// At most one entry per (service, method); the last registration wins.
#[derive(Default)]
pub struct FallbackRegistry {
    handlers: DashMap<(String, String), FallbackFn>,
}

impl FallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fallback for a (service, method) pair, replacing any
    /// previous one.
    pub fn register<F>(&self, service_name: &str, method_name: &str, fallback: F)
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.handlers.insert(
            (service_name.to_string(), method_name.to_string()),
            Arc::new(fallback),
        );
    }

    /// Produce a substitute result for the given call.
    ///
    /// Invokes the registered fallback if there is one; otherwise infers a
    /// zero value from `return_type`.
    pub fn get_fallback_result(
        &self,
        service_name: &str,
        method_name: &str,
        args: &[Value],
        return_type: &str,
    ) -> Value {
        let key = (service_name.to_string(), method_name.to_string());
        if let Some(fallback) = self.handlers.get(&key) {
            tracing::debug!(service_name, method_name, "serving registered fallback");
            return fallback(args);
        }
        tracing::debug!(service_name, method_name, return_type, "serving zero-value fallback");
        zero_value(return_type)
    }

    /// Remove all registered fallbacks. Administrative/test use.
    pub fn clear(&self) {
        self.handlers.clear();
    }
}

/// Zero value for a return type descriptor: numeric zero, `false` for
/// booleans, null for everything else.
pub fn zero_value(return_type: &str) -> Value {
    match return_type {
        "bool" => Value::Bool(false),
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            Value::from(0)
        }
        "f32" | "f64" => Value::from(0.0),
        _ => Value::Null,
    }
}
