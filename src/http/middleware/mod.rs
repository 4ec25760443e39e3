//! Tower middleware.
//!
//! # Data Flow
//! ```text
//! request
//!     → security_headers.rs (snapshot plan, note path/host/upgrade, mint nonce)
//!     → nonce.rs (handlers read the nonce via the CspNonce extractor)
//!     → inner service
//!     → security_headers.rs (plan applied to the response headers)
//! ```

pub mod nonce;
pub mod security_headers;

pub use nonce::CspNonce;
pub use security_headers::{
    is_websocket_upgrade, PlanHandle, SecureHeadersLayer, SecureHeadersService,
};
