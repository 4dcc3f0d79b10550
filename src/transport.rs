//! Transport boundary - the external request/response exchange.
//!
//! The framework assumes an HTTP POST-style exchange: one request body out,
//! one response body back. Everything behind that (connection pooling, TLS,
//! multiplexing) lives outside this crate, behind the [`Transport`] trait.
//! A non-success status must surface as [`RpcError::Transport`]; an empty
//! body is rejected by the invoker itself.
//!
//! [`Loopback`] routes bytes straight into an in-process
//! [`ServerDispatcher`], exercising the full client/server path without a
//! network.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::server::ServerDispatcher;

/// A single request/response byte exchange with an endpoint URL.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `body` to `url` and return the response body.
    async fn exchange(&self, url: &str, body: Bytes) -> Result<Bytes>;
}

/// In-process transport that hands requests directly to a dispatcher.
pub struct Loopback {
    dispatcher: Arc<ServerDispatcher>,
}

impl Loopback {
    pub fn new(dispatcher: Arc<ServerDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Transport for Loopback {
    async fn exchange(&self, _url: &str, body: Bytes) -> Result<Bytes> {
        Ok(self.dispatcher.handle(body).await)
    }
}
