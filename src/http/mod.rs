//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, demo handlers)
//!     → middleware/security_headers.rs (plan applied per response)
//!     → websocket.rs (echo over upgraded connections)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;
pub mod websocket;

pub use middleware::{CspNonce, PlanHandle, SecureHeadersLayer, SecureHeadersService};
pub use server::HttpServer;
