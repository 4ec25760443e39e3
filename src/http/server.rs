//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum Router with the demo handlers
//! - Wire up middleware (security headers, tracing)
//! - Swap the header plan when a new configuration arrives
//! - Serve until shutdown

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::http::middleware::{CspNonce, PlanHandle, SecureHeadersLayer};
use crate::http::websocket::echo_handler;
use crate::plan::{HeaderPlan, PlanError};

/// Demo server showing the security headers layer in front of a small app.
pub struct HttpServer {
    config: AppConfig,
    layer: SecureHeadersLayer,
}

impl HttpServer {
    /// Create a new HTTP server, compiling the header plan from `config`.
    pub fn new(config: AppConfig) -> Result<Self, PlanError> {
        let layer = SecureHeadersLayer::from_config(&config.headers)?;
        Ok(Self { config, layer })
    }

    /// Handle to the plan the server is applying.
    pub fn plan(&self) -> PlanHandle {
        self.layer.handle()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/health", get(health))
            .route("/nonce", get(nonce))
            .route("/logout", get(logout))
            .route("/ws", get(echo_handler))
            .layer(self.layer.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until `shutdown` fires, swapping the header plan
    /// whenever a config arrives on `config_updates`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, headers = self.plan().load().len(), "HTTP server starting");

        let handle = self.plan();
        let bind_address = self.config.server.bind_address.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if config.server.bind_address != bind_address {
                    tracing::warn!(
                        bind_address = %config.server.bind_address,
                        "Bind address changes need a restart; keeping the current listener"
                    );
                }
                match HeaderPlan::from_config(&config.headers) {
                    Ok(plan) => handle.store(plan),
                    Err(e) => tracing::error!(error = %e, "Rejected header configuration, keeping current plan"),
                }
            }
        });

        let app = self.router();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                // A closed channel counts as a shutdown request.
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        reloader.abort();
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn index(nonce: Result<CspNonce, (StatusCode, &'static str)>) -> Html<String> {
    let attribute = match nonce {
        Ok(nonce) => format!(" nonce=\"{}\"", nonce.as_str()),
        Err(_) => String::new(),
    };
    Html(format!(
        "<!doctype html>\n<html><head><title>secure-headers</title></head>\n\
         <body><p>Hello</p><script{attribute}>console.log(\"loaded\");</script></body></html>\n"
    ))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn nonce(nonce: CspNonce) -> String {
    nonce.as_str().to_owned()
}

async fn logout() -> &'static str {
    "Logged out"
}
