//! The security headers layer.
//!
//! # Responsibilities
//! - Snapshot the active plan once per request
//! - Detect WebSocket upgrades and the request host
//! - Treat a response as a WebSocket handshake only when the request asked to
//!   upgrade and the inner service answered `101 Switching Protocols`
//! - Mint a CSP nonce when the plan needs one and expose it to handlers
//! - Apply the plan to the response, whatever its body type
//!
//! # Design Decisions
//! - The plan lives behind `ArcSwap`; reloads never block requests and a
//!   request always sees one consistent plan
//! - Applying a plan cannot fail, so the layer never changes the status

use std::sync::Arc;
use std::task::{Context, Poll};

use arc_swap::ArcSwap;
use axum::http::header::{HOST, UPGRADE};
use axum::http::{HeaderMap, Request, Response, StatusCode};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use super::nonce::CspNonce;
use crate::config::SecureHeadersConfig;
use crate::observability::metrics;
use crate::plan::{HeaderPlan, PlanError, RequestContext};
use crate::policy::Nonce;

/// Shared, swappable reference to the active plan.
#[derive(Debug, Clone)]
pub struct PlanHandle {
    plan: Arc<ArcSwap<HeaderPlan>>,
}

impl PlanHandle {
    pub fn new(plan: HeaderPlan) -> Self {
        Self {
            plan: Arc::new(ArcSwap::from_pointee(plan)),
        }
    }

    /// The plan requests started now will use.
    pub fn load(&self) -> Arc<HeaderPlan> {
        self.plan.load_full()
    }

    /// Replace the plan. In-flight requests keep the plan they started with.
    pub fn store(&self, plan: HeaderPlan) {
        let headers = plan.len();
        self.plan.store(Arc::new(plan));
        metrics::record_plan_reload();
        tracing::info!(headers, "Security header plan reloaded");
    }
}

/// Adds the planned security headers to every response.
#[derive(Debug, Clone)]
pub struct SecureHeadersLayer {
    handle: PlanHandle,
}

impl SecureHeadersLayer {
    pub fn new(plan: HeaderPlan) -> Self {
        Self {
            handle: PlanHandle::new(plan),
        }
    }

    pub fn from_config(config: &SecureHeadersConfig) -> Result<Self, PlanError> {
        HeaderPlan::from_config(config).map(Self::new)
    }

    /// Handle for swapping the plan while the layer is serving.
    pub fn handle(&self) -> PlanHandle {
        self.handle.clone()
    }
}

impl<S> Layer<S> for SecureHeadersLayer {
    type Service = SecureHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecureHeadersService {
            inner,
            handle: self.handle.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecureHeadersService<S> {
    inner: S,
    handle: PlanHandle,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SecureHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let plan = self.handle.load();
        let upgrade_requested = is_websocket_upgrade(req.headers());
        let path = req.uri().path().to_owned();
        let host = request_host(&req);

        let nonce = plan.nonce_bytes().map(|bytes| {
            let nonce = Nonce::generate(bytes);
            metrics::record_nonce();
            req.extensions_mut().insert(CspNonce(nonce.clone()));
            nonce
        });

        let future = self.inner.call(req);

        Box::pin(async move {
            let mut response = future.await?;
            let websocket =
                upgrade_requested && response.status() == StatusCode::SWITCHING_PROTOCOLS;
            let ctx = RequestContext {
                path: &path,
                host: host.as_deref(),
                websocket,
                nonce: nonce.as_ref(),
            };
            let written = plan.apply(response.headers_mut(), &ctx);
            tracing::trace!(path = %path, websocket, written, "Security headers applied");
            Ok(response)
        })
    }
}

/// True when the request asks to switch to the WebSocket protocol.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get_all(UPGRADE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|protocol| protocol.trim().eq_ignore_ascii_case("websocket"))
}

/// Host from the `Host` header, or the URI authority for HTTP/2 requests.
fn request_host<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_websocket_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_websocket_upgrade(&headers));

        headers.insert(UPGRADE, HeaderValue::from_static("WebSocket"));
        assert!(is_websocket_upgrade(&headers));

        headers.insert(UPGRADE, HeaderValue::from_static("h2c"));
        assert!(!is_websocket_upgrade(&headers));

        headers.insert(UPGRADE, HeaderValue::from_static("h2c, websocket"));
        assert!(is_websocket_upgrade(&headers));
    }

    #[test]
    fn test_request_host_prefers_header() {
        let req = Request::builder()
            .uri("http://authority.example/x")
            .header(HOST, "header.example:8080")
            .body(())
            .unwrap();
        assert_eq!(request_host(&req).as_deref(), Some("header.example:8080"));

        let req = Request::builder()
            .uri("http://authority.example/x")
            .body(())
            .unwrap();
        assert_eq!(request_host(&req).as_deref(), Some("authority.example"));
    }

    #[test]
    fn test_handle_swaps_plan() {
        let layer = SecureHeadersLayer::new(HeaderPlan::empty());
        let handle = layer.handle();
        assert!(handle.load().is_empty());

        handle.store(HeaderPlan::from_config(&SecureHeadersConfig::default()).unwrap());
        assert!(!layer.handle().load().is_empty());
    }
}
