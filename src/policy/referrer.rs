//! Referrer-Policy.

use std::fmt;
use std::str::FromStr;

use axum::http::header::REFERRER_POLICY;
use axum::http::HeaderName;
use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{expected_one_of, HeaderPolicy, PolicyError};

const HEADER: &str = "Referrer-Policy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferrerToken {
    NoReferrer,
    NoReferrerWhenDowngrade,
    Origin,
    OriginWhenCrossOrigin,
    SameOrigin,
    StrictOrigin,
    StrictOriginWhenCrossOrigin,
    UnsafeUrl,
}

impl ReferrerToken {
    pub const TOKENS: &'static [&'static str] = &[
        "no-referrer",
        "no-referrer-when-downgrade",
        "origin",
        "origin-when-cross-origin",
        "same-origin",
        "strict-origin",
        "strict-origin-when-cross-origin",
        "unsafe-url",
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoReferrer => "no-referrer",
            Self::NoReferrerWhenDowngrade => "no-referrer-when-downgrade",
            Self::Origin => "origin",
            Self::OriginWhenCrossOrigin => "origin-when-cross-origin",
            Self::SameOrigin => "same-origin",
            Self::StrictOrigin => "strict-origin",
            Self::StrictOriginWhenCrossOrigin => "strict-origin-when-cross-origin",
            Self::UnsafeUrl => "unsafe-url",
        }
    }
}

impl FromStr for ReferrerToken {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "no-referrer" => Self::NoReferrer,
            "no-referrer-when-downgrade" => Self::NoReferrerWhenDowngrade,
            "origin" => Self::Origin,
            "origin-when-cross-origin" => Self::OriginWhenCrossOrigin,
            "same-origin" => Self::SameOrigin,
            "strict-origin" => Self::StrictOrigin,
            "strict-origin-when-cross-origin" => Self::StrictOriginWhenCrossOrigin,
            "unsafe-url" => Self::UnsafeUrl,
            other => {
                return Err(PolicyError::InvalidValue {
                    header: HEADER,
                    value: other.to_string(),
                    expected: expected_one_of(Self::TOKENS),
                })
            }
        })
    }
}

impl fmt::Display for ReferrerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One policy token, or a list where later tokens are fallbacks for
/// browsers that do not understand earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerPolicy {
    pub tokens: Vec<ReferrerToken>,
}

impl Default for ReferrerPolicy {
    fn default() -> Self {
        Self::new(ReferrerToken::StrictOriginWhenCrossOrigin)
    }
}

impl ReferrerPolicy {
    pub fn new(token: ReferrerToken) -> Self {
        Self {
            tokens: vec![token],
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, token: ReferrerToken) -> Self {
        self.tokens.push(token);
        self
    }
}

impl HeaderPolicy for ReferrerPolicy {
    fn header_name(&self) -> HeaderName {
        REFERRER_POLICY
    }

    fn render(&self) -> Result<String, PolicyError> {
        if self.tokens.is_empty() {
            return Err(PolicyError::Empty {
                header: HEADER,
                reason: "at least one policy token is required",
            });
        }
        let tokens: Vec<&str> = self.tokens.iter().map(|t| t.as_str()).collect();
        Ok(tokens.join(", "))
    }
}

impl Serialize for ReferrerPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.tokens.as_slice() {
            [single] => serializer.serialize_str(single.as_str()),
            tokens => serializer.collect_seq(tokens.iter().map(|t| t.as_str())),
        }
    }
}

impl<'de> Deserialize<'de> for ReferrerPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ReferrerVisitor;

        impl<'de> Visitor<'de> for ReferrerVisitor {
            type Value = ReferrerPolicy;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a referrer policy token or a list of tokens")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse()
                    .map(ReferrerPolicy::new)
                    .map_err(E::custom)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut tokens = Vec::new();
                while let Some(token) = seq.next_element::<String>()? {
                    tokens.push(token.parse().map_err(serde::de::Error::custom)?);
                }
                Ok(ReferrerPolicy { tokens })
            }
        }

        deserializer.deserialize_any(ReferrerVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        policy: ReferrerPolicy,
    }

    #[test]
    fn test_default() {
        assert_eq!(
            ReferrerPolicy::default().render().unwrap(),
            "strict-origin-when-cross-origin"
        );
    }

    #[test]
    fn test_fallback_list() {
        let policy =
            ReferrerPolicy::new(ReferrerToken::NoReferrer).with_fallback(ReferrerToken::StrictOrigin);
        assert_eq!(policy.render().unwrap(), "no-referrer, strict-origin");
    }

    #[test]
    fn test_parse_single_and_list() {
        let single: Wrapper = toml::from_str(r#"policy = "same-origin""#).unwrap();
        assert_eq!(single.policy.tokens, vec![ReferrerToken::SameOrigin]);

        let list: Wrapper = toml::from_str(r#"policy = ["no-referrer", "unsafe-url"]"#).unwrap();
        assert_eq!(
            list.policy.tokens,
            vec![ReferrerToken::NoReferrer, ReferrerToken::UnsafeUrl]
        );
    }

    #[test]
    fn test_unknown_token_rejected() {
        let parsed: Result<Wrapper, _> = toml::from_str(r#"policy = "everywhere""#);
        let message = parsed.unwrap_err().to_string();
        assert!(message.contains("strict-origin-when-cross-origin"));
    }

    #[test]
    fn test_empty_list_rejected() {
        let policy = ReferrerPolicy { tokens: Vec::new() };
        assert!(matches!(policy.render(), Err(PolicyError::Empty { .. })));
    }
}
