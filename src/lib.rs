//! Security headers for axum and tower services.
//!
//! Policies are validated and compiled into a [`plan::HeaderPlan`] once; the
//! [`http::SecureHeadersLayer`] then writes the plan to every response.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use secure_headers::config::SecureHeadersConfig;
//! use secure_headers::http::SecureHeadersLayer;
//!
//! # fn build() -> Result<Router, secure_headers::plan::PlanError> {
//! let layer = SecureHeadersLayer::from_config(&SecureHeadersConfig::default())?;
//! let app: Router = Router::new().route("/", get(|| async { "hi" })).layer(layer);
//! # Ok(app)
//! # }
//! ```

// Header grammars and route conditions
pub mod plan;
pub mod policy;
pub mod routing;

// Serving
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use http::{CspNonce, HttpServer, SecureHeadersLayer};
pub use lifecycle::Shutdown;
pub use plan::{HeaderPlan, InsertMode};
