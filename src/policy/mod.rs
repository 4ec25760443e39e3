//! Security header grammars.
//!
//! # Data Flow
//! ```text
//! policy options (config file or builder)
//!     → render() (whitelist checks + wire formatting)
//!     → HeaderValue
//!     → plan (compiled once, applied to every response)
//! ```
//!
//! # Design Decisions
//! - Rendering is a pure function of the options
//! - Unknown directives are errors, never silently dropped
//! - Every policy except Clear-Site-Data can also stand alone as a
//!   `SetResponseHeaderLayer`

pub mod cache_control;
pub mod clear_site_data;
pub mod csp;
pub mod expect_ct;
pub mod hsts;
pub mod nonce;
pub mod permissions;
pub mod referrer;
pub mod simple;

use std::fmt;

use axum::http::{HeaderName, HeaderValue};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::routing::RouteError;

pub use cache_control::CacheControl;
pub use clear_site_data::ClearSiteData;
pub use csp::ContentSecurityPolicy;
pub use expect_ct::ExpectCt;
pub use hsts::StrictTransportSecurity;
pub use nonce::Nonce;
pub use permissions::PermissionsPolicy;
pub use referrer::{ReferrerPolicy, ReferrerToken};
pub use simple::{
    CrossOriginEmbedderPolicy, CrossOriginOpenerPolicy, CrossOriginResourcePolicy,
    OriginAgentCluster, XContentTypeOptions, XDnsPrefetchControl, XDownloadOptions,
    XFrameOptions, XPermittedCrossDomainPolicies, XXssProtection,
};

/// Error raised when a policy does not satisfy its header grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("{header}: unknown directive `{directive}`")]
    UnknownDirective {
        header: &'static str,
        directive: String,
    },

    #[error("{header}: invalid value `{value}`, expected {expected}")]
    InvalidValue {
        header: &'static str,
        value: String,
        expected: String,
    },

    #[error("{header}: `{directive}` {reason}")]
    MissingDirective {
        header: &'static str,
        directive: &'static str,
        reason: &'static str,
    },

    #[error("{header}: {reason}")]
    Empty {
        header: &'static str,
        reason: &'static str,
    },

    #[error(
        "Permissions-Policy: invalid allowlist item `{item}` for feature `{feature}` \
         (expected *, self or a quoted origin such as \"https://example.com\")"
    )]
    InvalidAllowlistItem { feature: String, item: String },

    #[error("{header}: {field} must be a positive integer")]
    NonPositive {
        header: &'static str,
        field: &'static str,
    },

    #[error("{header}: {source}")]
    InvalidRoute {
        header: &'static str,
        #[source]
        source: RouteError,
    },

    #[error("{header}: rendered value is not a valid header value")]
    InvalidHeaderValue { header: HeaderName },

    #[error("{header}: only sent on its routes, add it with HeaderPlan::builder().with_clear_site_data")]
    RouteScoped { header: &'static str },
}

/// A header whose value is rendered from validated options.
pub trait HeaderPolicy {
    /// Name of the header this policy produces.
    fn header_name(&self) -> HeaderName;

    /// Validate the options and render the header value.
    fn render(&self) -> Result<String, PolicyError>;

    /// Render into a `HeaderValue`.
    fn header_value(&self) -> Result<HeaderValue, PolicyError> {
        let rendered = self.render()?;
        HeaderValue::try_from(rendered).map_err(|_| PolicyError::InvalidHeaderValue {
            header: self.header_name(),
        })
    }

    /// Standalone layer that always sets this header, overriding any value
    /// the inner service produced.
    fn set_header_layer(&self) -> Result<SetResponseHeaderLayer<HeaderValue>, PolicyError> {
        Ok(SetResponseHeaderLayer::overriding(
            self.header_name(),
            self.header_value()?,
        ))
    }
}

/// Human-readable list of allowed tokens for error messages.
pub(crate) fn expected_one_of(tokens: &[&str]) -> String {
    let quoted: Vec<String> = tokens.iter().map(|t| format!("\"{t}\"")).collect();
    format!("one of {}", quoted.join(", "))
}

/// A `name → values` list that keeps declaration order.
///
/// Used for CSP directives and Permissions-Policy features, where the
/// rendered header follows the order the operator wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveMap(Vec<(String, Vec<String>)>);

impl DirectiveMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `values`, replacing an earlier entry in place.
    #[must_use]
    pub fn set<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.insert(name, values);
        self
    }

    pub fn insert<I, V>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let name = name.into();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = values,
            None => self.0.push((name, values)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for DirectiveMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, values) in &self.0 {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DirectiveMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DirectiveMapVisitor;

        impl<'de> Visitor<'de> for DirectiveMapVisitor {
            type Value = DirectiveMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of directive names to lists of values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = DirectiveMap::new();
                while let Some((name, values)) = access.next_entry::<String, Vec<String>>()? {
                    map.insert(name, values);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(DirectiveMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_map_keeps_order_and_replaces_in_place() {
        let map = DirectiveMap::new()
            .set("b", ["1"])
            .set("a", ["2"])
            .set("b", ["3", "4"]);

        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(map.get("b"), Some(&["3".to_string(), "4".to_string()][..]));
    }

    #[test]
    fn test_directive_map_deserializes_in_document_order() {
        let map: DirectiveMap = toml::from_str(
            r#"
            zeta = ["z"]
            alpha = []
            mid = ["m1", "m2"]
            "#,
        )
        .unwrap();

        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_expected_one_of() {
        assert_eq!(expected_one_of(&["on", "off"]), "one of \"on\", \"off\"");
    }
}
