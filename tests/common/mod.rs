//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use secure_headers::config::AppConfig;
use secure_headers::http::PlanHandle;
use secure_headers::{HttpServer, Shutdown};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A demo server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub plan: PlanHandle,
    pub updates: mpsc::UnboundedSender<AppConfig>,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked");
        assert!(result.is_ok(), "server returned {result:?}");
    }
}

/// Start the demo server with `config` on 127.0.0.1:0.
pub async fn spawn_server(config: AppConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).expect("valid header configuration");
    let plan = server.plan();
    let (updates, updates_rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();

    let task = tokio::spawn(server.run(listener, updates_rx, shutdown_rx));

    TestServer {
        addr,
        plan,
        updates,
        shutdown,
        task,
    }
}

/// Poll `check` every 50ms until it returns true or `timeout` passes.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
