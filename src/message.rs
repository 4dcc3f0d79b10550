//! Wire message types - the request and response envelopes.
//!
//! A [`Request`] identifies a remote operation unambiguously: service name,
//! method name, and the ordered parameter type descriptors (overload
//! resolution needs both the name and the signature). Arguments and results
//! travel as [`serde_json::Value`], which round-trips cleanly through the
//! MsgPack codec and keeps handler signatures codec-agnostic.
//!
//! A [`Response`] carries exactly one of a successful `data` or a populated
//! `error`; `message` is a human-readable summary and is always set.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An RPC request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Fully-qualified service name.
    pub service_name: String,
    /// Method name within the service.
    pub method_name: String,
    /// Ordered parameter type descriptors (e.g. `["User"]`, `["i64", "bool"]`).
    pub param_types: Vec<String>,
    /// Ordered argument values.
    pub args: Vec<Value>,
}

impl Request {
    /// Build a request for the given operation and arguments.
    pub fn new(
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        param_types: Vec<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            method_name: method_name.into(),
            param_types,
            args,
        }
    }
}

/// Structured error details captured from a failed remote execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error category (e.g. `"service_not_found"`, `"handler"`).
    pub kind: String,
    /// Human-readable detail.
    pub detail: String,
}

impl ErrorInfo {
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// An RPC response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Result value on success.
    pub data: Option<Value>,
    /// Type descriptor of `data`, when present.
    pub data_type: Option<String>,
    /// Human-readable summary, always present.
    pub message: String,
    /// Structured error on failure.
    pub error: Option<ErrorInfo>,
}

impl Response {
    /// Successful response carrying a result value.
    pub fn ok(data: Value, data_type: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            data_type: Some(data_type.into()),
            message: "ok".to_string(),
            error: None,
        }
    }

    /// Failed response with a summary message and no structured error.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: None,
            data_type: None,
            message: message.into(),
            error: None,
        }
    }

    /// Failed response carrying structured error details.
    pub fn remote_error(error: ErrorInfo) -> Self {
        Self {
            data: None,
            data_type: None,
            message: error.to_string(),
            error: Some(error),
        }
    }
}
