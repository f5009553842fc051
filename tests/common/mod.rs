//! Shared utilities for integration testing the gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{json, Value};

use canvas_gateway::config::GatewayConfig;
use canvas_gateway::lifecycle::Shutdown;
use canvas_gateway::rpc::OperationError;
use canvas_gateway::{GatewayServer, OperationRegistry};

/// A gateway config suitable for tests: loopback bind, long sweeps so
/// heartbeats don't interleave with assertions unless a test asks for them.
pub fn test_config(port: u16) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = format!("127.0.0.1:{}", port);
    config.proxy.public_domain = "gateway.test".to_string();
    config.session.idle_timeout_secs = 300;
    config.session.heartbeat_secs = 300;
    config
}

/// Registry with a few canned operations standing in for the LMS handlers.
pub fn test_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    registry.register_fn("listCourses", |_| async { Ok(json!({"courses": []})) });
    registry.register_fn("echo", |params| async move { Ok(params) });
    registry.register_fn("brokenOp", |_| async {
        Err(OperationError::new("lms_error", "upstream said no"))
    });
    registry
}

/// Start a gateway and return its shutdown handle once it accepts traffic.
pub async fn start_gateway(config: GatewayConfig, registry: OperationRegistry) -> Arc<Shutdown> {
    let addr: SocketAddr = config.listener.bind_address.parse().unwrap();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let server = GatewayServer::new(config, registry);

    let server_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        let _ = server.run(listener, &server_shutdown).await;
    });

    // Wait until the health endpoint answers.
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .is_ok()
        {
            return shutdown;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gateway did not come up on {}", addr);
}

/// One decoded server-sent event.
#[derive(Debug)]
pub struct SseEvent {
    pub event: String,
    pub data: Value,
}

/// Minimal SSE reader over a reqwest byte stream.
pub struct SseClient {
    stream: futures_util::stream::BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    buffer: String,
}

impl SseClient {
    /// Open the event stream and fail if the server refuses it.
    pub async fn connect(url: &str) -> Result<SseClient, reqwest::StatusCode> {
        let response = reqwest::Client::new()
            .get(url)
            .send()
            .await
            .expect("stream endpoint unreachable");
        if !response.status().is_success() {
            return Err(response.status());
        }
        Ok(SseClient {
            stream: response.bytes_stream().boxed(),
            buffer: String::new(),
        })
    }

    /// Next complete event frame, or None when the stream ends.
    pub async fn next_event(&mut self) -> Option<SseEvent> {
        loop {
            if let Some(frame) = self.take_frame() {
                return Some(frame);
            }
            match self.stream.next().await {
                Some(Ok(chunk)) => {
                    self.buffer.push_str(&String::from_utf8_lossy(&chunk));
                }
                Some(Err(_)) | None => return None,
            }
        }
    }

    /// Next event, bounded; panics on timeout so hangs fail loudly.
    pub async fn expect_event(&mut self) -> SseEvent {
        tokio::time::timeout(Duration::from_secs(5), self.next_event())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended unexpectedly")
    }

    /// True once the server has closed the stream.
    pub async fn ended(&mut self) -> bool {
        tokio::time::timeout(Duration::from_secs(5), self.next_event())
            .await
            .map(|event| event.is_none())
            .unwrap_or(false)
    }

    fn take_frame(&mut self) -> Option<SseEvent> {
        let end = self.buffer.find("\n\n")?;
        let frame: String = self.buffer.drain(..end + 2).collect();

        let mut event = String::new();
        let mut data = String::new();
        for line in frame.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                event = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("data:") {
                data = rest.trim().to_string();
            }
        }
        let data = serde_json::from_str(&data).unwrap_or(Value::Null);
        Some(SseEvent { event, data })
    }
}
