//! Integration tests for breakwater.
//!
//! These exercise the full invocation path: client pipeline over an
//! in-process loopback transport into the server dispatcher.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use breakwater::client::{OperationDescriptor, RpcClient};
use breakwater::codec::{Codec, MsgPackCodec};
use breakwater::context::RpcContext;
use breakwater::error::{Result, RpcError};
use breakwater::message::Response;
use breakwater::server::{LocalRegistry, ServerDispatcher, ServiceBuilder};
use breakwater::transport::{Loopback, Transport};
use breakwater::RpcConfig;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct User {
    name: String,
}

/// Wraps another transport, counting exchanges.
struct CountingTransport<T> {
    inner: T,
    calls: AtomicU32,
}

impl<T> CountingTransport<T> {
    fn new(inner: T) -> Self {
        Self {
            inner,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Transport> Transport for CountingTransport<T> {
    async fn exchange(&self, url: &str, body: Bytes) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.exchange(url, body).await
    }
}

/// Transport that never completes within any reasonable test window.
struct StallingTransport {
    started: AtomicU32,
    finished: AtomicU32,
}

#[async_trait]
impl Transport for StallingTransport {
    async fn exchange(&self, _url: &str, _body: Bytes) -> Result<Bytes> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(80)).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        let response = Response::ok(json!("late"), "String");
        Ok(Bytes::from(MsgPackCodec.encode_response(&response)?))
    }
}

fn user_dispatcher() -> Arc<ServerDispatcher> {
    let local = LocalRegistry::new();
    local.register(ServiceBuilder::new("UserService").typed_operation(
        "getUser",
        "User",
        "User",
        |user: User| {
            Ok(User {
                name: format!("Hello, {}", user.name),
            })
        },
    ));
    Arc::new(ServerDispatcher::new(
        Arc::new(local),
        Arc::new(MsgPackCodec),
    ))
}

fn fast_config() -> RpcConfig {
    RpcConfig::new()
        .timeout(Duration::from_millis(500))
        .max_retries(2)
        .retry_interval(Duration::from_millis(1))
        .failure_threshold(3)
        .recovery_window(Duration::from_millis(40))
}

fn get_user_op() -> OperationDescriptor {
    OperationDescriptor::new("UserService", "getUser")
        .params(&["User"])
        .returns("User")
}

/// End to end: client invokes `getUser`, the server echoes a transformed
/// value, no fallback involved.
#[tokio::test]
async fn test_end_to_end_get_user() {
    let transport = Arc::new(CountingTransport::new(Loopback::new(user_dispatcher())));
    let ctx = Arc::new(RpcContext::new(fast_config()));
    ctx.registry
        .register("UserService", "http://localhost:8080");
    let client = RpcClient::new(ctx, transport.clone());

    let value = client
        .invoke(&get_user_op(), vec![json!({"name": "alice"})])
        .await
        .unwrap();

    let user: User = serde_json::from_value(value).unwrap();
    assert_eq!(user.name, "Hello, alice");
    assert_eq!(transport.calls(), 1);
}

/// End to end over the deferred path, resolving the handle explicitly.
#[tokio::test]
async fn test_end_to_end_deferred() {
    let transport = Arc::new(Loopback::new(user_dispatcher()));
    let ctx = Arc::new(RpcContext::new(fast_config()));
    ctx.registry
        .register("UserService", "http://localhost:8080");
    let client = RpcClient::new(ctx, transport);

    let handle = client.invoke_deferred(&get_user_op().deferred(), vec![json!({"name": "bob"})]);
    let value = handle.wait(Duration::from_millis(500)).await.unwrap();
    assert_eq!(value, json!({"name": "Hello, bob"}));
}

/// A pre-opened breaker serves the fallback without any transport attempt.
#[tokio::test]
async fn test_open_circuit_never_touches_transport() {
    let transport = Arc::new(CountingTransport::new(Loopback::new(user_dispatcher())));
    let ctx = Arc::new(RpcContext::new(fast_config()));
    ctx.registry
        .register("UserService", "http://localhost:8080");
    ctx.fallbacks
        .register("UserService", "getUser", |_| json!({"name": "guest"}));
    // Seed the breaker past its threshold of 3.
    for _ in 0..3 {
        ctx.breaker.record_failure("http://localhost:8080");
    }
    let client = RpcClient::new(ctx, transport.clone());

    let value = client
        .invoke(&get_user_op(), vec![json!({"name": "alice"})])
        .await
        .unwrap();

    assert_eq!(value, json!({"name": "guest"}));
    assert_eq!(transport.calls(), 0);
}

/// Transport failures are retried up to the bound, then the fallback is
/// served; each attempt is visible on the transport spy.
#[tokio::test]
async fn test_retry_exhaustion_serves_fallback() {
    struct DownTransport;

    #[async_trait]
    impl Transport for DownTransport {
        async fn exchange(&self, _url: &str, _body: Bytes) -> Result<Bytes> {
            Err(RpcError::Transport("connection refused".to_string()))
        }
    }

    let transport = Arc::new(CountingTransport::new(DownTransport));
    let ctx = Arc::new(RpcContext::new(fast_config()));
    ctx.registry
        .register("UserService", "http://localhost:8080");
    ctx.fallbacks
        .register("UserService", "getUser", |args| {
            json!({ "name": format!("offline ({} args)", args.len()) })
        });
    let client = RpcClient::new(ctx, transport.clone());

    let value = client
        .invoke(&get_user_op(), vec![json!({"name": "alice"})])
        .await
        .unwrap();

    assert_eq!(value, json!({"name": "offline (1 args)"}));
    // max_retries(2): exactly 3 attempts.
    assert_eq!(transport.calls(), 3);
}

/// Remote handler failures ride back in the response envelope and surface
/// as errors, without retries and without tripping the breaker.
#[tokio::test]
async fn test_remote_failure_surfaces_without_retry() {
    let local = LocalRegistry::new();
    local.register(ServiceBuilder::new("Flaky").typed_operation(
        "explode",
        "String",
        "String",
        |_: String| Err::<String, _>("kaboom".to_string()),
    ));
    let dispatcher = Arc::new(ServerDispatcher::new(
        Arc::new(local),
        Arc::new(MsgPackCodec),
    ));
    let transport = Arc::new(CountingTransport::new(Loopback::new(dispatcher)));
    let ctx = Arc::new(RpcContext::new(fast_config()));
    ctx.registry.register("Flaky", "http://localhost:8080");
    let client = RpcClient::new(ctx, transport.clone());

    let op = OperationDescriptor::new("Flaky", "explode")
        .params(&["String"])
        .returns("String");
    let result = client.invoke(&op, vec![json!("x")]).await;

    match result {
        Err(RpcError::Remote(info)) => assert_eq!(info.detail, "kaboom"),
        other => panic!("expected remote error, got {other:?}"),
    }
    assert_eq!(transport.calls(), 1);
    assert!(client.context().breaker.is_available("http://localhost:8080"));
}

/// The waiter timing out does not cancel the underlying round trip; the
/// work keeps running and finishes on its own.
#[tokio::test]
async fn test_work_outlives_timed_out_waiter() {
    let transport = Arc::new(StallingTransport {
        started: AtomicU32::new(0),
        finished: AtomicU32::new(0),
    });
    let config = fast_config().timeout(Duration::from_millis(200));
    let ctx = Arc::new(RpcContext::new(config));
    ctx.registry
        .register("UserService", "http://localhost:8080");
    let client = RpcClient::new(ctx, transport.clone());

    let handle = client.invoke_deferred(&get_user_op(), vec![json!({"name": "a"})]);
    let waited = handle.wait(Duration::from_millis(10)).await;
    assert!(matches!(waited, Err(RpcError::Timeout)));
    assert_eq!(transport.started.load(Ordering::SeqCst), 1);
    assert_eq!(transport.finished.load(Ordering::SeqCst), 0);

    // The abandoned round trip completes regardless.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(transport.finished.load(Ordering::SeqCst), 1);
}

/// Round-robin across two live endpoints spreads invocations evenly.
#[tokio::test]
async fn test_round_robin_across_endpoints() {
    struct UrlRecorder {
        urls: std::sync::Mutex<Vec<String>>,
        inner: Loopback,
    }

    #[async_trait]
    impl Transport for UrlRecorder {
        async fn exchange(&self, url: &str, body: Bytes) -> Result<Bytes> {
            self.urls.lock().unwrap().push(url.to_string());
            self.inner.exchange(url, body).await
        }
    }

    let transport = Arc::new(UrlRecorder {
        urls: std::sync::Mutex::new(Vec::new()),
        inner: Loopback::new(user_dispatcher()),
    });
    let ctx = Arc::new(RpcContext::new(fast_config()));
    ctx.registry.register("UserService", "http://a:1");
    ctx.registry.register("UserService", "http://b:2");
    let client = RpcClient::new(ctx, transport.clone());

    for _ in 0..4 {
        client
            .invoke(&get_user_op(), vec![json!({"name": "x"})])
            .await
            .unwrap();
    }

    let urls = transport.urls.lock().unwrap().clone();
    assert_eq!(urls, vec!["http://a:1", "http://b:2", "http://a:1", "http://b:2"]);
}

/// Concurrent registration from many tasks: no lost or duplicated entries.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_from_tasks() {
    let ctx = Arc::new(RpcContext::default());

    let tasks: Vec<_> = (0..64)
        .map(|i| {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                ctx.registry
                    .register("svc", &format!("http://host{i}:80"));
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(ctx.registry.get_all_service_urls("svc").len(), 64);
}

/// The dispatcher never produces an empty body, whatever comes in.
#[tokio::test]
async fn test_dispatcher_always_answers() {
    let dispatcher = user_dispatcher();

    for body in [
        Bytes::new(),
        Bytes::from_static(b"garbage"),
        Bytes::from(
            MsgPackCodec
                .encode_request(&breakwater::Request::new("Nope", "m", vec![], vec![]))
                .unwrap(),
        ),
    ] {
        let raw = dispatcher.handle(body).await;
        assert!(!raw.is_empty());
        let response = MsgPackCodec.decode_response(&raw).unwrap();
        assert!(response.data.is_none());
    }
}

/// Breaker recovery end to end: open, wait out the window, probe succeeds,
/// circuit closes and real calls flow again.
#[tokio::test]
async fn test_breaker_recovers_end_to_end() {
    let transport = Arc::new(CountingTransport::new(Loopback::new(user_dispatcher())));
    let ctx = Arc::new(RpcContext::new(fast_config()));
    ctx.registry
        .register("UserService", "http://localhost:8080");
    for _ in 0..3 {
        ctx.breaker.record_failure("http://localhost:8080");
    }
    let client = RpcClient::new(ctx, transport.clone());

    // Open: fallback, no transport.
    let value = client
        .invoke(&get_user_op(), vec![json!({"name": "a"})])
        .await
        .unwrap();
    assert_eq!(value, Value::Null);
    assert_eq!(transport.calls(), 0);

    tokio::time::sleep(Duration::from_millis(50)).await;

    // Recovery window elapsed: the probe goes through and closes the circuit.
    let value = client
        .invoke(&get_user_op(), vec![json!({"name": "a"})])
        .await
        .unwrap();
    assert_eq!(value, json!({"name": "Hello, a"}));
    assert_eq!(transport.calls(), 1);
    assert!(client.context().breaker.is_available("http://localhost:8080"));
}
