//! Content-Security-Policy.
//!
//! # Responsibilities
//! - Check directive names against the CSP directive list
//! - Enforce that nonce-bearing directives exist and are non-empty
//! - Render `name v1 v2; name; ...` in declaration order
//!
//! # Design Decisions
//! - Nonces are injected per request by the middleware; `render()` alone
//!   produces the policy without one
//! - Each value is one source expression of visible ASCII; `;` and `,` are
//!   rejected since they would split the directive or the policy list

use axum::http::header::{CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_REPORT_ONLY};
use axum::http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use super::nonce::Nonce;
use super::{DirectiveMap, HeaderPolicy, PolicyError};

const HEADER: &str = "Content-Security-Policy";

/// Directives accepted in a policy.
pub const DIRECTIVES: &[&str] = &[
    "child-src",
    "connect-src",
    "default-src",
    "font-src",
    "frame-src",
    "img-src",
    "manifest-src",
    "media-src",
    "object-src",
    "prefetch-src",
    "script-src",
    "script-src-elem",
    "script-src-attr",
    "style-src",
    "style-src-elem",
    "style-src-attr",
    "worker-src",
    "base-uri",
    "plugin-types",
    "sandbox",
    "form-action",
    "frame-ancestors",
    "navigate-to",
    "report-uri",
    "report-to",
    "block-all-mixed-content",
    "require-sri-for",
    "require-trusted-types-for",
    "trusted-types",
    "upgrade-insecure-requests",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentSecurityPolicy {
    /// Directives in the order they are rendered.
    pub directives: DirectiveMap,

    /// Add a per-request nonce to `script-src`.
    pub script_nonce: bool,

    /// Add a per-request nonce to `style-src`.
    pub style_nonce: bool,

    /// Send as `Content-Security-Policy-Report-Only`.
    pub report_only: bool,

    /// Nonce entropy in bytes.
    pub nonce_bytes: usize,
}

impl Default for ContentSecurityPolicy {
    fn default() -> Self {
        let directives = DirectiveMap::new()
            .set("default-src", ["'self'"])
            .set("base-uri", ["'self'"])
            .set("block-all-mixed-content", Vec::<String>::new())
            .set("font-src", ["'self'", "https:", "data:"])
            .set("frame-ancestors", ["'self'"])
            .set("img-src", ["'self'", "data:"])
            .set("object-src", ["'none'"])
            .set("script-src", ["'self'"])
            .set("script-src-attr", ["'none'"])
            .set("style-src", ["'self'", "https:", "'unsafe-inline'"])
            .set("upgrade-insecure-requests", Vec::<String>::new())
            .set("require-trusted-types-for", ["'script'"]);

        Self {
            directives,
            script_nonce: false,
            style_nonce: false,
            report_only: false,
            nonce_bytes: Nonce::DEFAULT_BYTES,
        }
    }
}

impl ContentSecurityPolicy {
    /// Policy with the given directives and nonces off.
    pub fn new(directives: DirectiveMap) -> Self {
        Self {
            directives,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_script_nonce(mut self, enabled: bool) -> Self {
        self.script_nonce = enabled;
        self
    }

    #[must_use]
    pub fn with_style_nonce(mut self, enabled: bool) -> Self {
        self.style_nonce = enabled;
        self
    }

    #[must_use]
    pub fn report_only(mut self, enabled: bool) -> Self {
        self.report_only = enabled;
        self
    }

    /// Whether responses need a fresh nonce.
    pub fn needs_nonce(&self) -> bool {
        self.script_nonce || self.style_nonce
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.script_nonce {
            require_values(&self.directives, "script-src")?;
        }
        if self.style_nonce {
            require_values(&self.directives, "style-src")?;
        }

        if self.nonce_bytes > Nonce::MAX_BYTES {
            return Err(PolicyError::InvalidValue {
                header: HEADER,
                value: format!("nonce_bytes = {}", self.nonce_bytes),
                expected: format!("at most {} nonce bytes", Nonce::MAX_BYTES),
            });
        }

        for (name, values) in self.directives.iter() {
            if !DIRECTIVES.contains(&name) {
                return Err(PolicyError::UnknownDirective {
                    header: HEADER,
                    directive: name.to_string(),
                });
            }
            if let Some(bad) = values.iter().find(|v| !is_source_expression(v)) {
                return Err(PolicyError::InvalidValue {
                    header: HEADER,
                    value: bad.clone(),
                    expected: "a single source expression of visible ASCII without ';' or ','"
                        .to_string(),
                });
            }
        }
        Ok(())
    }

    /// Render the policy, placing `nonce` first in the nonce-bearing directives.
    pub fn render_with_nonce(&self, nonce: Option<&Nonce>) -> Result<String, PolicyError> {
        self.validate()?;

        let source = nonce.map(Nonce::source_expression);
        let rendered: Vec<String> = self
            .directives
            .iter()
            .map(|(name, values)| {
                let mut parts = vec![name.to_string()];
                let nonce_applies = (name == "script-src" && self.script_nonce)
                    || (name == "style-src" && self.style_nonce);
                if let (true, Some(source)) = (nonce_applies, &source) {
                    parts.push(source.clone());
                }
                parts.extend(values.iter().cloned());
                parts.join(" ")
            })
            .collect();

        Ok(rendered.join("; "))
    }

    /// Render straight into a header value for one response.
    pub(crate) fn value_for(&self, nonce: Option<&Nonce>) -> Result<HeaderValue, PolicyError> {
        HeaderValue::try_from(self.render_with_nonce(nonce)?).map_err(|_| {
            PolicyError::InvalidHeaderValue {
                header: self.header_name(),
            }
        })
    }
}

/// One token: whitespace would split it into two expressions, and `;` or `,`
/// would end the directive or the policy.
fn is_source_expression(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_graphic() && c != ';' && c != ',')
}

fn require_values(directives: &DirectiveMap, directive: &'static str) -> Result<(), PolicyError> {
    match directives.get(directive) {
        None => Err(PolicyError::MissingDirective {
            header: HEADER,
            directive,
            reason: "is required for nonces",
        }),
        Some([]) => Err(PolicyError::MissingDirective {
            header: HEADER,
            directive,
            reason: "cannot be empty for a nonce to be applied",
        }),
        Some(_) => Ok(()),
    }
}

impl HeaderPolicy for ContentSecurityPolicy {
    fn header_name(&self) -> HeaderName {
        if self.report_only {
            CONTENT_SECURITY_POLICY_REPORT_ONLY
        } else {
            CONTENT_SECURITY_POLICY
        }
    }

    fn render(&self) -> Result<String, PolicyError> {
        self.render_with_nonce(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let rendered = ContentSecurityPolicy::default().render().unwrap();
        assert_eq!(
            rendered,
            "default-src 'self'; base-uri 'self'; block-all-mixed-content; \
             font-src 'self' https: data:; frame-ancestors 'self'; img-src 'self' data:; \
             object-src 'none'; script-src 'self'; script-src-attr 'none'; \
             style-src 'self' https: 'unsafe-inline'; upgrade-insecure-requests; \
             require-trusted-types-for 'script'"
        );
    }

    #[test]
    fn test_valueless_directive_last() {
        let csp = ContentSecurityPolicy::new(
            DirectiveMap::new()
                .set("default-src", ["'self'"])
                .set("upgrade-insecure-requests", Vec::<String>::new()),
        );
        assert_eq!(
            csp.render().unwrap(),
            "default-src 'self'; upgrade-insecure-requests"
        );
    }

    #[test]
    fn test_unknown_directive_rejected() {
        let csp = ContentSecurityPolicy::new(DirectiveMap::new().set("scrpt-src", ["'self'"]));
        assert_eq!(
            csp.render(),
            Err(PolicyError::UnknownDirective {
                header: HEADER,
                directive: "scrpt-src".to_string(),
            })
        );
    }

    #[test]
    fn test_script_nonce_requires_script_src() {
        let csp = ContentSecurityPolicy::new(DirectiveMap::new().set("default-src", ["'self'"]))
            .with_script_nonce(true);
        assert!(matches!(
            csp.validate(),
            Err(PolicyError::MissingDirective {
                directive: "script-src",
                ..
            })
        ));
    }

    #[test]
    fn test_style_nonce_requires_values() {
        let csp = ContentSecurityPolicy::new(
            DirectiveMap::new().set("style-src", Vec::<String>::new()),
        )
        .with_style_nonce(true);
        assert!(matches!(
            csp.validate(),
            Err(PolicyError::MissingDirective {
                directive: "style-src",
                reason: "cannot be empty for a nonce to be applied",
                ..
            })
        ));
    }

    #[test]
    fn test_nonce_goes_first() {
        let csp = ContentSecurityPolicy::new(
            DirectiveMap::new()
                .set("script-src", ["'self'"])
                .set("style-src", ["'self'", "https:"]),
        )
        .with_script_nonce(true)
        .with_style_nonce(true);
        let nonce = Nonce::generate(16);

        let rendered = csp.render_with_nonce(Some(&nonce)).unwrap();
        assert_eq!(
            rendered,
            format!(
                "script-src 'nonce-{n}' 'self'; style-src 'nonce-{n}' 'self' https:",
                n = nonce
            )
        );
    }

    #[test]
    fn test_nonce_only_where_enabled() {
        let csp = ContentSecurityPolicy::new(
            DirectiveMap::new()
                .set("script-src", ["'self'"])
                .set("style-src", ["'self'"]),
        )
        .with_script_nonce(true);
        let nonce = Nonce::generate(16);

        let rendered = csp.render_with_nonce(Some(&nonce)).unwrap();
        assert!(rendered.contains(&format!("script-src 'nonce-{nonce}'")));
        assert!(rendered.ends_with("style-src 'self'"));
    }

    #[test]
    fn test_separator_in_value_rejected() {
        let csp = ContentSecurityPolicy::new(
            DirectiveMap::new().set("default-src", ["'self'; script-src *"]),
        );
        assert!(matches!(csp.render(), Err(PolicyError::InvalidValue { .. })));
    }

    #[test]
    fn test_control_characters_rejected() {
        let csp = ContentSecurityPolicy::new(DirectiveMap::new().set("script-src", ["'self'\u{1}"]))
            .with_script_nonce(true);
        assert!(matches!(csp.validate(), Err(PolicyError::InvalidValue { .. })));
    }

    #[test]
    fn test_whitespace_inside_value_rejected() {
        let csp = ContentSecurityPolicy::new(
            DirectiveMap::new().set("img-src", ["'self' data:"]),
        );
        assert!(matches!(csp.render(), Err(PolicyError::InvalidValue { .. })));
    }

    #[test]
    fn test_nonce_bytes_capped() {
        let mut csp = ContentSecurityPolicy::default().with_script_nonce(true);
        csp.nonce_bytes = Nonce::MAX_BYTES;
        assert_eq!(csp.validate(), Ok(()));

        csp.nonce_bytes = 100_000_000_000;
        assert_eq!(
            csp.validate(),
            Err(PolicyError::InvalidValue {
                header: HEADER,
                value: "nonce_bytes = 100000000000".to_string(),
                expected: "at most 1024 nonce bytes".to_string(),
            })
        );
    }

    #[test]
    fn test_report_only_header_name() {
        let csp = ContentSecurityPolicy::default().report_only(true);
        assert_eq!(csp.header_name(), CONTENT_SECURITY_POLICY_REPORT_ONLY);
    }

    #[test]
    fn test_deserialize_from_toml() {
        let csp: ContentSecurityPolicy = toml::from_str(
            r#"
            script_nonce = true
            [directives]
            script-src = ["'self'", "https://cdn.example.com"]
            object-src = ["'none'"]
            "#,
        )
        .unwrap();

        assert!(csp.script_nonce);
        assert_eq!(
            csp.render().unwrap(),
            "script-src 'self' https://cdn.example.com; object-src 'none'"
        );
    }
}
