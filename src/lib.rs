//! # breakwater
//!
//! A fault-tolerant RPC core: the client side turns a local call into a
//! remote request with load balancing, failure isolation, retry and
//! degraded-response fallback; the server side resolves the request to a
//! local implementation and executes it safely.
//!
//! ## Architecture
//!
//! - **Client pipeline**: [`registry::ServiceRegistry`] (round-robin
//!   discovery) → [`breaker::CircuitBreaker`] (per-target gate) →
//!   [`retry::RetryExecutor`] (bounded attempts) →
//!   [`fallback::FallbackRegistry`] (substitute results), orchestrated by
//!   [`client::RpcClient`].
//! - **Server pipeline**: [`server::ServerDispatcher`] decodes, resolves
//!   via [`server::LocalRegistry`], invokes the matching dispatch-table
//!   entry, and encodes the outcome; failures never escape the boundary.
//! - **Boundaries**: [`codec::Codec`] and [`transport::Transport`] are
//!   pluggable; the shared stores live in one [`context::RpcContext`]
//!   built at startup.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use breakwater::client::{OperationDescriptor, RpcClient};
//! use breakwater::codec::MsgPackCodec;
//! use breakwater::context::RpcContext;
//! use breakwater::server::{LocalRegistry, ServerDispatcher, ServiceBuilder};
//! use breakwater::transport::Loopback;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let local = LocalRegistry::new();
//! local.register(
//!     ServiceBuilder::new("EchoService")
//!         .typed_operation("upper", "String", "String", |s: String| {
//!             Ok(s.to_uppercase())
//!         }),
//! );
//! let dispatcher = Arc::new(ServerDispatcher::new(Arc::new(local), Arc::new(MsgPackCodec)));
//!
//! let ctx = Arc::new(RpcContext::default());
//! ctx.registry.register("EchoService", "http://localhost:8080");
//! let client = RpcClient::new(ctx, Arc::new(Loopback::new(dispatcher)));
//!
//! let op = OperationDescriptor::new("EchoService", "upper")
//!     .params(&["String"])
//!     .returns("String");
//! let value = client.invoke(&op, vec![json!("hello")]).await.unwrap();
//! assert_eq!(value, json!("HELLO"));
//! # }
//! ```

pub mod admin;
pub mod breaker;
pub mod client;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod fallback;
pub mod message;
pub mod registry;
pub mod retry;
pub mod server;
pub mod transport;

pub use admin::RegistryAdmin;
pub use breaker::{CircuitBreaker, CircuitState};
pub use client::{CallHandle, CallOutcome, OperationDescriptor, RpcClient};
pub use codec::{Codec, MsgPackCodec};
pub use config::RpcConfig;
pub use context::RpcContext;
pub use error::{Result, RpcError};
pub use fallback::FallbackRegistry;
pub use message::{ErrorInfo, Request, Response};
pub use registry::ServiceRegistry;
pub use retry::RetryExecutor;
pub use server::{LocalRegistry, ServerDispatcher, ServiceBuilder};
pub use transport::{Loopback, Transport};
