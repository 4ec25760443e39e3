//! Access to the per-request CSP nonce from handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;

use crate::policy::Nonce;

/// The nonce the security headers layer minted for this request.
///
/// Embed it in inline `<script nonce="...">` or `<style nonce="...">` tags.
/// Extraction fails with `500 Internal Server Error` when the layer is not
/// installed or the active plan does not use nonces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CspNonce(pub Nonce);

impl CspNonce {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl<S> FromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CspNonce>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "CSP nonce unavailable: nonces are not enabled for this request",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_extracts_from_extensions() {
        let nonce = CspNonce(Nonce::generate(16));
        let (mut parts, ()) = Request::builder()
            .extension(nonce.clone())
            .body(())
            .unwrap()
            .into_parts();

        let extracted = CspNonce::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(extracted, nonce);
    }

    #[tokio::test]
    async fn test_missing_nonce_rejected() {
        let (mut parts, ()) = Request::new(()).into_parts();
        let (status, _) = CspNonce::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
