//! Single-token headers: enumerated choices and fixed values.

use std::fmt;
use std::str::FromStr;

use axum::http::header::{
    X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use axum::http::HeaderName;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{expected_one_of, HeaderPolicy, PolicyError};

/// An enum whose variants are the only tokens a header accepts.
macro_rules! token_header {
    (
        $(#[$meta:meta])*
        $name:ident => $header:expr, $label:literal, default $default:ident {
            $( $variant:ident => $token:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant ),+
        }

        impl $name {
            pub const TOKENS: &'static [&'static str] = &[$( $token ),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $token ),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl FromStr for $name {
            type Err = PolicyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $token => Ok(Self::$variant), )+
                    other => Err(PolicyError::InvalidValue {
                        header: $label,
                        value: other.to_string(),
                        expected: expected_one_of(Self::TOKENS),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let token = String::deserialize(deserializer)?;
                token.parse().map_err(serde::de::Error::custom)
            }
        }

        impl HeaderPolicy for $name {
            fn header_name(&self) -> HeaderName {
                $header
            }

            fn render(&self) -> Result<String, PolicyError> {
                Ok(self.as_str().to_string())
            }
        }
    };
}

/// A header that is either sent with its one value or not at all.
macro_rules! fixed_header {
    ($(#[$meta:meta])* $name:ident => $header:expr, $value:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl $name {
            pub const VALUE: &'static str = $value;
        }

        impl HeaderPolicy for $name {
            fn header_name(&self) -> HeaderName {
                $header
            }

            fn render(&self) -> Result<String, PolicyError> {
                Ok(Self::VALUE.to_string())
            }
        }
    };
}

pub const X_DOWNLOAD_OPTIONS: HeaderName = HeaderName::from_static("x-download-options");
pub const X_PERMITTED_CROSS_DOMAIN_POLICIES: HeaderName =
    HeaderName::from_static("x-permitted-cross-domain-policies");
pub const ORIGIN_AGENT_CLUSTER: HeaderName = HeaderName::from_static("origin-agent-cluster");
pub const CROSS_ORIGIN_EMBEDDER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-embedder-policy");
pub const CROSS_ORIGIN_OPENER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-opener-policy");
pub const CROSS_ORIGIN_RESOURCE_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-resource-policy");

token_header! {
    XFrameOptions => X_FRAME_OPTIONS, "X-Frame-Options", default Deny {
        Deny => "DENY",
        SameOrigin => "SAMEORIGIN",
    }
}

token_header! {
    XDnsPrefetchControl => X_DNS_PREFETCH_CONTROL, "X-DNS-Prefetch-Control", default Off {
        On => "on",
        Off => "off",
    }
}

token_header! {
    XPermittedCrossDomainPolicies => X_PERMITTED_CROSS_DOMAIN_POLICIES,
        "X-Permitted-Cross-Domain-Policies", default None {
        None => "none",
        MasterOnly => "master-only",
        ByContentType => "by-content-type",
        All => "all",
    }
}

token_header! {
    CrossOriginEmbedderPolicy => CROSS_ORIGIN_EMBEDDER_POLICY,
        "Cross-Origin-Embedder-Policy", default UnsafeNone {
        UnsafeNone => "unsafe-none",
        RequireCorp => "require-corp",
    }
}

token_header! {
    CrossOriginOpenerPolicy => CROSS_ORIGIN_OPENER_POLICY,
        "Cross-Origin-Opener-Policy", default UnsafeNone {
        UnsafeNone => "unsafe-none",
        SameOriginAllowPopups => "same-origin-allow-popups",
        SameOrigin => "same-origin",
    }
}

token_header! {
    CrossOriginResourcePolicy => CROSS_ORIGIN_RESOURCE_POLICY,
        "Cross-Origin-Resource-Policy", default CrossOrigin {
        SameSite => "same-site",
        SameOrigin => "same-origin",
        CrossOrigin => "cross-origin",
    }
}

fixed_header!(
    /// `X-Content-Type-Options: nosniff`
    XContentTypeOptions => X_CONTENT_TYPE_OPTIONS, "nosniff"
);

fixed_header!(
    /// `X-Download-Options: noopen`
    XDownloadOptions => X_DOWNLOAD_OPTIONS, "noopen"
);

fixed_header!(
    /// `Origin-Agent-Cluster: ?1`
    OriginAgentCluster => ORIGIN_AGENT_CLUSTER, "?1"
);

fixed_header!(
    /// `X-XSS-Protection: 0`. The legacy filter is switched off; CSP replaces it.
    XXssProtection => X_XSS_PROTECTION, "0"
);
