//! Strict-Transport-Security.

use axum::http::header::STRICT_TRANSPORT_SECURITY;
use axum::http::HeaderName;
use serde::{Deserialize, Serialize};

use super::{HeaderPolicy, PolicyError};

const HEADER: &str = "Strict-Transport-Security";

/// Five days.
pub const DEFAULT_MAX_AGE: u64 = 432_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrictTransportSecurity {
    /// Seconds the browser should remember to use HTTPS only.
    pub max_age: u64,

    pub include_subdomains: bool,

    pub preload: bool,
}

impl Default for StrictTransportSecurity {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            include_subdomains: true,
            preload: false,
        }
    }
}

impl StrictTransportSecurity {
    pub fn new(max_age: u64) -> Self {
        Self {
            max_age,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn include_subdomains(mut self, enabled: bool) -> Self {
        self.include_subdomains = enabled;
        self
    }

    #[must_use]
    pub fn preload(mut self, enabled: bool) -> Self {
        self.preload = enabled;
        self
    }
}

impl HeaderPolicy for StrictTransportSecurity {
    fn header_name(&self) -> HeaderName {
        STRICT_TRANSPORT_SECURITY
    }

    fn render(&self) -> Result<String, PolicyError> {
        if self.max_age == 0 {
            return Err(PolicyError::NonPositive {
                header: HEADER,
                field: "max-age",
            });
        }

        let mut value = format!("max-age={}", self.max_age);
        if self.include_subdomains {
            value.push_str("; includeSubDomains");
        }
        if self.preload {
            value.push_str("; preload");
        }
        Ok(value)
    }
}
