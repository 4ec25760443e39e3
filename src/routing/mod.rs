//! Routing subsystem: decides which requests a route-scoped header applies to.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     route templates ("/logout", "/users/{id:int}", "{tenant}.example.com")
//!     → matcher.rs (template → anchored regex)
//!     → RouteSet (immutable)
//!
//! Per response:
//!     request path + host
//!     → RouteSet::matches
//!     → header applied or skipped
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches the same way
//! - First match wins; order only matters for speed

pub mod matcher;

pub use matcher::{Convertor, RouteError, RoutePattern, RouteSet};
