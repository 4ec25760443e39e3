//! Permissions-Policy.

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{DirectiveMap, HeaderPolicy, PolicyError};

const HEADER: &str = "Permissions-Policy";

pub const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

/// Features accepted in a policy.
pub const FEATURES: &[&str] = &[
    "accelerometer",
    "ambient-light-sensor",
    "autoplay",
    "battery",
    "camera",
    "cross-origin-isolated",
    "display-capture",
    "document-domain",
    "encrypted-media",
    "execution-while-not-rendered",
    "execution-while-out-of-viewport",
    "fullscreen",
    "geolocation",
    "gyroscope",
    "hid",
    "identity-credentials-get",
    "idle-detection",
    "local-fonts",
    "magnetometer",
    "microphone",
    "midi",
    "navigation-override",
    "payment",
    "picture-in-picture",
    "publickey-credentials-create",
    "publickey-credentials-get",
    "screen-wake-lock",
    "serial",
    "sync-xhr",
    "usb",
    "web-share",
    "xr-spatial-tracking",
    "clipboard-read",
    "clipboard-write",
    "gamepad",
    "speaker-selection",
    "storage-access",
    "browsing-topics",
    "conversion-measurement",
    "focus-without-user-activation",
    "sync-script",
    "trust-token-redemption",
    "unload",
    "vertical-scroll",
    "window-placement",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PermissionsPolicy {
    /// Feature → allowlist, rendered in declaration order.
    pub features: DirectiveMap,
}

impl PermissionsPolicy {
    pub fn new(features: DirectiveMap) -> Self {
        Self { features }
    }

    #[must_use]
    pub fn allow<I, V>(mut self, feature: impl Into<String>, allowlist: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.features.insert(feature, allowlist);
        self
    }

    /// Disable a feature everywhere (`feature=()`).
    #[must_use]
    pub fn deny(self, feature: impl Into<String>) -> Self {
        self.allow(feature, Vec::<String>::new())
    }
}

fn check_allowlist_item(feature: &str, item: &str) -> Result<(), PolicyError> {
    if item == "self" || item == "*" {
        return Ok(());
    }

    let origin = item
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|inner| Url::parse(inner).is_ok());

    match origin {
        Some(_) => Ok(()),
        None => Err(PolicyError::InvalidAllowlistItem {
            feature: feature.to_string(),
            item: item.to_string(),
        }),
    }
}

impl HeaderPolicy for PermissionsPolicy {
    fn header_name(&self) -> HeaderName {
        PERMISSIONS_POLICY
    }

    fn render(&self) -> Result<String, PolicyError> {
        if self.features.is_empty() {
            return Err(PolicyError::Empty {
                header: HEADER,
                reason: "at least one feature is required",
            });
        }

        let mut rendered = Vec::with_capacity(self.features.len());
        for (feature, allowlist) in self.features.iter() {
            if !FEATURES.contains(&feature) {
                return Err(PolicyError::UnknownDirective {
                    header: HEADER,
                    directive: feature.to_string(),
                });
            }
            for item in allowlist {
                check_allowlist_item(feature, item)?;
            }
            rendered.push(format!("{feature}=({})", allowlist.join(" ")));
        }

        Ok(rendered.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mixed_allowlists() {
        let policy = PermissionsPolicy::default()
            .deny("camera")
            .allow("geolocation", ["self", "\"https://maps.example.com\""])
            .allow("fullscreen", ["*"]);

        assert_eq!(
            policy.render().unwrap(),
            "camera=(), geolocation=(self \"https://maps.example.com\"), fullscreen=(*)"
        );
    }

    #[test]
    fn test_last_feature_is_closed() {
        let policy = PermissionsPolicy::default().allow("microphone", ["self"]);
        assert_eq!(policy.render().unwrap(), "microphone=(self)");
    }

    #[test]
    fn test_empty_policy_rejected() {
        assert!(matches!(
            PermissionsPolicy::default().render(),
            Err(PolicyError::Empty { .. })
        ));
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let policy = PermissionsPolicy::default().deny("telepathy");
        assert_eq!(
            policy.render(),
            Err(PolicyError::UnknownDirective {
                header: HEADER,
                directive: "telepathy".to_string(),
            })
        );
    }

    #[test]
    fn test_unquoted_origin_rejected() {
        let policy = PermissionsPolicy::default().allow("camera", ["https://example.com"]);
        assert_eq!(
            policy.render(),
            Err(PolicyError::InvalidAllowlistItem {
                feature: "camera".to_string(),
                item: "https://example.com".to_string(),
            })
        );
    }

    #[test]
    fn test_quoted_garbage_rejected() {
        let policy = PermissionsPolicy::default().allow("camera", ["\"not a url\""]);
        assert!(matches!(
            policy.render(),
            Err(PolicyError::InvalidAllowlistItem { .. })
        ));
    }

    #[test]
    fn test_newer_features_accepted() {
        let policy = PermissionsPolicy::default()
            .deny("identity-credentials-get")
            .deny("local-fonts")
            .allow("publickey-credentials-create", ["self"])
            .allow("storage-access", ["*"]);
        assert_eq!(
            policy.render().unwrap(),
            "identity-credentials-get=(), local-fonts=(), \
             publickey-credentials-create=(self), storage-access=(*)"
        );
    }
}
