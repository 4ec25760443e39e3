//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.

use std::fmt;
use std::marker::PhantomData;

use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::plan::InsertMode;
use crate::policy::{
    CacheControl, ClearSiteData, ContentSecurityPolicy, CrossOriginEmbedderPolicy,
    CrossOriginOpenerPolicy, CrossOriginResourcePolicy, ExpectCt, PermissionsPolicy,
    ReferrerPolicy, StrictTransportSecurity, XDnsPrefetchControl, XFrameOptions,
    XPermittedCrossDomainPolicies,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub observability: ObservabilityConfig,
    pub headers: SecureHeadersConfig,
}

/// Demo server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A header section that is either switched off or carries its options.
///
/// In TOML, `false` turns the header off, `true` sends it with default
/// options, and any other value (string, list or table) is parsed as the
/// options themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle<T> {
    Off,
    On(T),
}

impl<T> Toggle<T> {
    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Self::Off => None,
            Self::On(value) => Some(value),
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Self::On(_))
    }
}

impl<T: Default> Toggle<T> {
    pub fn on() -> Self {
        Self::On(T::default())
    }
}

impl<T: Serialize> Serialize for Toggle<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Off => serializer.serialize_bool(false),
            Self::On(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T> Deserialize<'de> for Toggle<T>
where
    T: Deserialize<'de> + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ToggleVisitor<T>(PhantomData<T>);

        impl<'de, T> Visitor<'de> for ToggleVisitor<T>
        where
            T: Deserialize<'de> + Default,
        {
            type Value = Toggle<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a boolean or the header options")
            }

            fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(if v { Toggle::on() } else { Toggle::Off })
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                T::deserialize(v.into_deserializer()).map(Toggle::On)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
                T::deserialize(SeqAccessDeserializer::new(seq)).map(Toggle::On)
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                T::deserialize(MapAccessDeserializer::new(map)).map(Toggle::On)
            }
        }

        deserializer.deserialize_any(ToggleVisitor(PhantomData))
    }
}

/// Which security headers to send and how.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecureHeadersConfig {
    /// How planned headers interact with headers the handler already set.
    pub mode: InsertMode,

    pub csp: Toggle<ContentSecurityPolicy>,
    pub permissions_policy: Toggle<PermissionsPolicy>,
    pub hsts: Toggle<StrictTransportSecurity>,

    /// HSTS sent on WebSocket upgrade responses only.
    pub websocket_hsts: Toggle<StrictTransportSecurity>,

    pub expect_ct: Toggle<ExpectCt>,
    pub cache_control: Toggle<CacheControl>,
    pub clear_site_data: Toggle<ClearSiteData>,
    pub referrer_policy: Toggle<ReferrerPolicy>,
    pub x_frame_options: Toggle<XFrameOptions>,
    pub x_dns_prefetch_control: Toggle<XDnsPrefetchControl>,
    pub x_permitted_cross_domain_policies: Toggle<XPermittedCrossDomainPolicies>,
    pub cross_origin_embedder_policy: Toggle<CrossOriginEmbedderPolicy>,
    pub cross_origin_opener_policy: Toggle<CrossOriginOpenerPolicy>,
    pub cross_origin_resource_policy: Toggle<CrossOriginResourcePolicy>,

    pub x_content_type_options: bool,
    pub x_download_options: bool,
    pub origin_agent_cluster: bool,
    pub x_xss_protection: bool,
}

impl Default for SecureHeadersConfig {
    fn default() -> Self {
        Self {
            mode: InsertMode::default(),
            csp: Toggle::on(),
            permissions_policy: Toggle::Off,
            hsts: Toggle::on(),
            websocket_hsts: Toggle::Off,
            expect_ct: Toggle::Off,
            cache_control: Toggle::on(),
            clear_site_data: Toggle::on(),
            referrer_policy: Toggle::on(),
            x_frame_options: Toggle::on(),
            x_dns_prefetch_control: Toggle::on(),
            x_permitted_cross_domain_policies: Toggle::on(),
            cross_origin_embedder_policy: Toggle::Off,
            cross_origin_opener_policy: Toggle::Off,
            cross_origin_resource_policy: Toggle::Off,
            x_content_type_options: true,
            x_download_options: true,
            origin_agent_cluster: true,
            x_xss_protection: true,
        }
    }
}
