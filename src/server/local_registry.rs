//! Local service registry and per-service dispatch tables.
//!
//! Instead of runtime type introspection, each service carries an explicit
//! dispatch table built at registration time: a map from (method name,
//! parameter descriptor signature) to an invocation closure. Overloads are
//! legal because the signature is part of the key.
//!
//! [`ServiceBuilder::typed_operation`] wraps a plain typed function into a
//! table entry, deserializing the argument and serializing the result at
//! the boundary, so handlers never see wire values.
//!
//! # Example
//!
//! ```
//! use breakwater::server::{LocalRegistry, ServiceBuilder};
//! use serde_json::json;
//!
//! let registry = LocalRegistry::new();
//! registry.register(
//!     ServiceBuilder::new("EchoService")
//!         .typed_operation("upper", "String", "String", |s: String| {
//!             Ok(s.to_uppercase())
//!         }),
//! );
//!
//! let handle = registry.get("EchoService").unwrap();
//! let (data, data_type) = handle
//!     .invoke("upper", &["String".to_string()], &[json!("hi")])
//!     .unwrap();
//! assert_eq!(data, json!("HI"));
//! assert_eq!(data_type, "String");
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, RpcError};
use crate::message::ErrorInfo;

/// An invocation closure: argument values in, result value or a failure
/// message out.
pub type OperationFn =
    Arc<dyn Fn(&[Value]) -> std::result::Result<Value, String> + Send + Sync>;

#[derive(Clone)]
struct OperationEntry {
    func: OperationFn,
    return_type: String,
}

/// Signature key: method name plus ordered parameter type descriptors.
type OperationKey = (String, Vec<String>);

/// An invocable implementation descriptor: a service's dispatch table.
#[derive(Clone, Default)]
pub struct ServiceHandle {
    name: String,
    operations: HashMap<OperationKey, OperationEntry>,
}

impl ServiceHandle {
    /// Invoke the operation matching the method name and parameter
    /// signature with the given arguments.
    ///
    /// # Errors
    ///
    /// - [`RpcError::OperationNotFound`] when no entry matches.
    /// - [`RpcError::Remote`] when the handler itself fails.
    pub fn invoke(
        &self,
        method_name: &str,
        param_types: &[String],
        args: &[Value],
    ) -> Result<(Value, String)> {
        let key = (method_name.to_string(), param_types.to_vec());
        let entry = self
            .operations
            .get(&key)
            .ok_or_else(|| RpcError::OperationNotFound {
                service: self.name.clone(),
                method: method_name.to_string(),
            })?;

        match (entry.func)(args) {
            Ok(value) => Ok((value, entry.return_type.clone())),
            Err(detail) => Err(RpcError::Remote(ErrorInfo::new("handler", detail))),
        }
    }

    fn insert(&mut self, key: OperationKey, entry: OperationEntry) {
        self.operations.insert(key, entry);
    }
}

/// Fluent builder for a service's dispatch table.
pub struct ServiceBuilder {
    name: String,
    handle: ServiceHandle,
}

impl ServiceBuilder {
    /// Start a table for the given fully-qualified service name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: ServiceHandle::default(),
        }
    }

    /// Register a raw operation working directly on wire values.
    pub fn operation<F>(
        mut self,
        method: &str,
        param_types: &[&str],
        return_type: &str,
        func: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        let key = (
            method.to_string(),
            param_types.iter().map(|t| t.to_string()).collect(),
        );
        self.handle.insert(
            key,
            OperationEntry {
                func: Arc::new(func),
                return_type: return_type.to_string(),
            },
        );
        self
    }

    /// Register a single-argument operation with typed input and output.
    ///
    /// The wrapper deserializes the first argument into `A` and serializes
    /// the `R` result back to a wire value; conversion failures surface as
    /// handler failures, not panics.
    pub fn typed_operation<A, R, F>(
        self,
        method: &str,
        param_type: &str,
        return_type: &str,
        func: F,
    ) -> Self
    where
        A: DeserializeOwned,
        R: Serialize,
        F: Fn(A) -> std::result::Result<R, String> + Send + Sync + 'static,
    {
        self.operation(method, &[param_type], return_type, move |args| {
            let raw = args.first().cloned().unwrap_or(Value::Null);
            let input: A = serde_json::from_value(raw)
                .map_err(|e| format!("argument conversion failed: {e}"))?;
            let output = func(input)?;
            serde_json::to_value(output).map_err(|e| format!("result conversion failed: {e}"))
        })
    }

    fn into_parts(self) -> (String, ServiceHandle) {
        (self.name, self.handle)
    }
}

/// Server-side mapping from service name to invocable implementation.
///
/// Created at startup; may be extended at runtime. Registering more
/// operations under an existing name merges them into that service's
/// table (same-signature entries are replaced).
#[derive(Default)]
pub struct LocalRegistry {
    services: DashMap<String, ServiceHandle>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or extend) a service from its builder.
    pub fn register(&self, builder: ServiceBuilder) {
        let (name, handle) = builder.into_parts();
        let mut entry = self.services.entry(name.clone()).or_default();
        entry.name = name.clone();
        for (key, op) in handle.operations {
            entry.insert(key, op);
        }
        tracing::debug!(service = %name, "registered local service");
    }

    /// Resolve a service by name.
    ///
    /// # Errors
    ///
    /// [`RpcError::ServiceNotFound`] when nothing is registered under the
    /// name.
    pub fn get(&self, name: &str) -> Result<ServiceHandle> {
        self.services
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| RpcError::ServiceNotFound(name.to_string()))
    }
}
