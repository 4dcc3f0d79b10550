//! Server side - local service resolution and request dispatch.
//!
//! Provides:
//! - [`LocalRegistry`] - maps fully-qualified service names to invocable
//!   implementations (distinct from the client-side discovery registry)
//! - [`ServiceBuilder`] - builds a service's dispatch table from typed
//!   closures at registration time
//! - [`ServerDispatcher`] - decodes inbound bytes, resolves and invokes the
//!   target operation, and encodes the outcome, never letting a failure
//!   escape past the boundary

mod dispatcher;
mod local_registry;

pub use dispatcher::{ServerDispatcher, DEFAULT_MAX_CONCURRENT_REQUESTS};
pub use local_registry::{LocalRegistry, OperationFn, ServiceBuilder, ServiceHandle};
