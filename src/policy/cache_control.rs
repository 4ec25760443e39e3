//! Cache-Control.

use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderName;
use serde::{Deserialize, Serialize};

use super::{HeaderPolicy, PolicyError};

const HEADER: &str = "Cache-Control";

/// Response directives, rendered in field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheControl {
    pub max_age: Option<u64>,
    pub s_maxage: Option<u64>,
    pub no_cache: bool,
    pub no_store: bool,
    pub no_transform: bool,
    pub must_revalidate: bool,
    pub proxy_revalidate: bool,
    pub must_understand: bool,
    pub private: bool,
    pub public: bool,
    pub immutable: bool,
    pub stale_while_revalidate: Option<u64>,
}

impl Default for CacheControl {
    fn default() -> Self {
        Self {
            max_age: Some(86_400),
            private: true,
            ..Self::none()
        }
    }
}

impl CacheControl {
    /// No directive selected; a starting point for builders.
    pub fn none() -> Self {
        Self {
            max_age: None,
            s_maxage: None,
            no_cache: false,
            no_store: false,
            no_transform: false,
            must_revalidate: false,
            proxy_revalidate: false,
            must_understand: false,
            private: false,
            public: false,
            immutable: false,
            stale_while_revalidate: None,
        }
    }

    /// `no-store`, for responses that must never be cached.
    pub fn no_store() -> Self {
        Self {
            no_store: true,
            ..Self::none()
        }
    }
}

impl HeaderPolicy for CacheControl {
    fn header_name(&self) -> HeaderName {
        CACHE_CONTROL
    }

    fn render(&self) -> Result<String, PolicyError> {
        if self.stale_while_revalidate == Some(0) {
            return Err(PolicyError::NonPositive {
                header: HEADER,
                field: "stale-while-revalidate",
            });
        }

        let mut directives: Vec<String> = Vec::new();
        if let Some(age) = self.max_age {
            directives.push(format!("max-age={age}"));
        }
        if let Some(age) = self.s_maxage {
            directives.push(format!("s-maxage={age}"));
        }

        let flags = [
            (self.no_cache, "no-cache"),
            (self.no_store, "no-store"),
            (self.no_transform, "no-transform"),
            (self.must_revalidate, "must-revalidate"),
            (self.proxy_revalidate, "proxy-revalidate"),
            (self.must_understand, "must-understand"),
            (self.private, "private"),
            (self.public, "public"),
            (self.immutable, "immutable"),
        ];
        directives.extend(
            flags
                .iter()
                .filter(|(set, _)| *set)
                .map(|(_, name)| (*name).to_string()),
        );

        if let Some(age) = self.stale_while_revalidate {
            directives.push(format!("stale-while-revalidate={age}"));
        }

        if directives.is_empty() {
            return Err(PolicyError::Empty {
                header: HEADER,
                reason: "at least one directive is required",
            });
        }
        Ok(directives.join(", "))
    }
}
