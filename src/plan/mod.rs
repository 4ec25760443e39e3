//! Compiled header plan.
//!
//! # Data Flow
//! ```text
//! Build (once, or on config reload):
//!     policies (builder or SecureHeadersConfig)
//!     → validate + render each policy
//!     → collect every error
//!     → HeaderPlan (immutable)
//!
//! Per response:
//!     RequestContext (path, host, websocket?, nonce)
//!     → filter by target and route condition
//!     → write header values (static, or CSP rendered with the nonce)
//! ```
//!
//! # Design Decisions
//! - All validation happens at build time; applying a plan cannot fail
//! - HTTP headers skip WebSocket upgrades, WebSocket headers skip plain HTTP
//! - Insertion mode is plan-wide

mod bundle;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::observability::metrics;
use crate::policy::{ClearSiteData, ContentSecurityPolicy, HeaderPolicy, Nonce, PolicyError};
use crate::routing::RouteSet;

/// How a planned header interacts with one the handler already set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertMode {
    /// Replace whatever the handler set.
    #[default]
    Override,
    /// Add alongside the handler's value.
    Append,
    /// Keep the handler's value when present.
    IfAbsent,
}

/// Which responses a planned header is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Http,
    WebSocket,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::WebSocket => "websocket",
        }
    }
}

/// What the layer knows about the request a response belongs to.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub host: Option<&'a str>,
    pub websocket: bool,
    pub nonce: Option<&'a Nonce>,
}

impl<'a> RequestContext<'a> {
    pub fn http(path: &'a str) -> Self {
        Self {
            path,
            host: None,
            websocket: false,
            nonce: None,
        }
    }

    pub fn target(&self) -> Target {
        if self.websocket {
            Target::WebSocket
        } else {
            Target::Http
        }
    }
}

#[derive(Debug, Clone)]
enum PlannedValue {
    Static(HeaderValue),
    Csp(ContentSecurityPolicy),
}

#[derive(Debug, Clone)]
struct PlannedHeader {
    name: HeaderName,
    value: PlannedValue,
    target: Target,
    routes: Option<RouteSet>,
}

impl PlannedHeader {
    fn applies_to(&self, ctx: &RequestContext<'_>) -> bool {
        self.target == ctx.target()
            && self
                .routes
                .as_ref()
                .is_none_or(|routes| routes.matches(ctx.path, ctx.host))
    }

    fn resolve(&self, nonce: Option<&Nonce>) -> Option<HeaderValue> {
        match &self.value {
            PlannedValue::Static(value) => Some(value.clone()),
            PlannedValue::Csp(csp) => match csp.value_for(nonce) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(header = %self.name, error = %e, "Skipping header that failed to render");
                    None
                }
            },
        }
    }
}

/// Every policy error found while building a plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid security header policy: {}", join(.0))]
pub struct PlanError(pub Vec<PolicyError>);

impl PlanError {
    pub fn errors(&self) -> &[PolicyError] {
        &self.0
    }
}

fn join(errors: &[PolicyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// An immutable, validated set of headers to write to responses.
#[derive(Debug, Clone, Default)]
pub struct HeaderPlan {
    headers: Vec<PlannedHeader>,
    mode: InsertMode,
    nonce_bytes: Option<usize>,
}

impl HeaderPlan {
    pub fn builder() -> HeaderPlanBuilder {
        HeaderPlanBuilder::default()
    }

    /// A plan that writes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InsertMode {
        self.mode
    }

    /// Nonce entropy when some header needs a per-request nonce.
    pub fn nonce_bytes(&self) -> Option<usize> {
        self.nonce_bytes
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Names of every planned header, in plan order.
    pub fn header_names(&self) -> impl Iterator<Item = &HeaderName> {
        self.headers.iter().map(|h| &h.name)
    }

    /// Headers that would be written for this request, in plan order.
    pub fn preview(&self, ctx: &RequestContext<'_>) -> Vec<(HeaderName, HeaderValue)> {
        self.headers
            .iter()
            .filter(|h| h.applies_to(ctx))
            .filter_map(|h| h.resolve(ctx.nonce).map(|value| (h.name.clone(), value)))
            .collect()
    }

    /// Write the headers for one response. Returns how many were written.
    pub fn apply(&self, headers: &mut HeaderMap, ctx: &RequestContext<'_>) -> usize {
        let mut written = 0;
        for (name, value) in self.preview(ctx) {
            let inserted = match self.mode {
                InsertMode::Override => {
                    headers.insert(name.clone(), value);
                    true
                }
                InsertMode::Append => {
                    headers.append(name.clone(), value);
                    true
                }
                InsertMode::IfAbsent => {
                    if headers.contains_key(&name) {
                        false
                    } else {
                        headers.insert(name.clone(), value);
                        true
                    }
                }
            };
            if inserted {
                metrics::record_header(&name);
                written += 1;
            }
        }
        metrics::record_response(ctx.target());
        written
    }
}

/// Collects policies into a [`HeaderPlan`], keeping every error.
#[derive(Debug, Default)]
pub struct HeaderPlanBuilder {
    headers: Vec<PlannedHeader>,
    errors: Vec<PolicyError>,
    mode: InsertMode,
    nonce_bytes: Option<usize>,
}

impl HeaderPlanBuilder {
    #[must_use]
    pub fn mode(mut self, mode: InsertMode) -> Self {
        self.mode = mode;
        self
    }

    /// Send `policy` on every HTTP response.
    #[must_use]
    pub fn with<P: HeaderPolicy>(self, policy: &P) -> Self {
        self.push(policy, Target::Http, None)
    }

    /// Send `policy` on WebSocket upgrade responses only.
    #[must_use]
    pub fn with_websocket<P: HeaderPolicy>(self, policy: &P) -> Self {
        self.push(policy, Target::WebSocket, None)
    }

    /// Send `policy` on HTTP responses whose request matches one of `routes`.
    #[must_use]
    pub fn with_routes<P, I, S>(mut self, policy: &P, routes: I) -> Self
    where
        P: HeaderPolicy,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match RouteSet::compile(routes) {
            Ok(set) if set.is_empty() => {
                self.errors.push(PolicyError::Empty {
                    header: "route-scoped header",
                    reason: "cannot be set without routes",
                });
                self
            }
            Ok(set) => self.push(policy, Target::Http, Some(set)),
            Err(source) => {
                self.errors.push(PolicyError::InvalidRoute {
                    header: "route-scoped header",
                    source,
                });
                self
            }
        }
    }

    /// Clear-Site-Data on its configured routes.
    #[must_use]
    pub fn with_clear_site_data(mut self, policy: &ClearSiteData) -> Self {
        match policy.route_set() {
            Ok(routes) => self.push(policy, Target::Http, Some(routes)),
            Err(e) => {
                self.errors.push(e);
                self
            }
        }
    }

    /// Content-Security-Policy, rendered per request when nonces are on.
    #[must_use]
    pub fn with_csp(mut self, csp: ContentSecurityPolicy) -> Self {
        if let Err(e) = csp.validate() {
            self.errors.push(e);
            return self;
        }
        if !csp.needs_nonce() {
            return self.push(&csp, Target::Http, None);
        }
        // A nonce is base64, so if a sample renders every per-request value will.
        if let Err(e) = csp.value_for(Some(&Nonce::generate(Nonce::MIN_BYTES))) {
            self.errors.push(e);
            return self;
        }

        self.nonce_bytes = Some(csp.nonce_bytes.max(Nonce::MIN_BYTES));
        self.headers.push(PlannedHeader {
            name: csp.header_name(),
            value: PlannedValue::Csp(csp),
            target: Target::Http,
            routes: None,
        });
        self
    }

    fn push<P: HeaderPolicy>(mut self, policy: &P, target: Target, routes: Option<RouteSet>) -> Self {
        match policy.header_value() {
            Ok(value) => self.headers.push(PlannedHeader {
                name: policy.header_name(),
                value: PlannedValue::Static(value),
                target,
                routes,
            }),
            Err(e) => self.errors.push(e),
        }
        self
    }

    pub fn build(self) -> Result<HeaderPlan, PlanError> {
        if !self.errors.is_empty() {
            return Err(PlanError(self.errors));
        }
        Ok(HeaderPlan {
            headers: self.headers,
            mode: self.mode,
            nonce_bytes: self.nonce_bytes,
        })
    }
}
