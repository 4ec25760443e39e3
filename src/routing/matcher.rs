//! Route template matching.
//!
//! # Responsibilities
//! - Compile `{name}` / `{name:convertor}` templates into anchored regexes
//! - Match path templates against the request path
//! - Match host templates against the request host (port stripped)
//!
//! # Design Decisions
//! - Templates compiled once at startup, immutable at runtime
//! - Literal text is escaped; only parameters become regex groups
//! - Host matching is case-insensitive
//! - Path matching is case-sensitive

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

static PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)(:[a-zA-Z_][a-zA-Z0-9_]*)?\}")
        .expect("parameter pattern is valid")
});

/// Error compiling a route template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("unknown path convertor `{convertor}` in route `{template}`")]
    UnknownConvertor { template: String, convertor: String },

    #[error("duplicated parameter name `{name}` in route `{template}`")]
    DuplicateParam { template: String, name: String },

    #[error("route `{template}` does not compile: {reason}")]
    Regex { template: String, reason: String },
}

/// How a parameter segment is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convertor {
    Str,
    Path,
    Int,
    Float,
    Uuid,
}

impl Convertor {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "str" => Some(Self::Str),
            "path" => Some(Self::Path),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "uuid" => Some(Self::Uuid),
            _ => None,
        }
    }

    pub fn regex(self) -> &'static str {
        match self {
            Self::Str => "[^/]+",
            Self::Path => ".*",
            Self::Int => "[0-9]+",
            Self::Float => r"[0-9]+(\.[0-9]+)?",
            Self::Uuid => "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subject {
    Path,
    Host,
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    subject: Subject,
    regex: Regex,
}

impl RoutePattern {
    /// Compile a template. Templates starting with `/` match paths; anything
    /// else is a host template such as `{tenant}.example.com`.
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        let subject = if template.starts_with('/') {
            Subject::Path
        } else {
            Subject::Host
        };

        let mut pattern = String::from("^");
        let mut seen = HashSet::new();
        let mut idx = 0;

        for caps in PARAM.captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            let name = caps.get(1).map_or("", |m| m.as_str());
            let convertor_name = caps
                .get(2)
                .map_or("str", |m| m.as_str().trim_start_matches(':'));

            let convertor =
                Convertor::from_name(convertor_name).ok_or_else(|| RouteError::UnknownConvertor {
                    template: template.to_string(),
                    convertor: convertor_name.to_string(),
                })?;

            if !seen.insert(name) {
                return Err(RouteError::DuplicateParam {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }

            pattern.push_str(&regex::escape(&template[idx..whole.start()]));
            pattern.push_str(&format!("(?P<{name}>{})", convertor.regex()));
            idx = whole.end();
        }

        let tail = &template[idx..];
        match subject {
            Subject::Path => pattern.push_str(&regex::escape(tail)),
            Subject::Host => {
                let hostname = tail.split(':').next().unwrap_or(tail);
                pattern.push_str(&regex::escape(hostname));
            }
        }
        pattern.push('$');

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(subject == Subject::Host)
            .build()
            .map_err(|e| RouteError::Regex {
                template: template.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            template: template.to_string(),
            subject,
            regex,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn is_host(&self) -> bool {
        self.subject == Subject::Host
    }

    /// Returns true if the request path (or host, for host templates) matches.
    pub fn matches(&self, path: &str, host: Option<&str>) -> bool {
        match self.subject {
            Subject::Path => self.regex.is_match(path),
            Subject::Host => host.is_some_and(|h| self.regex.is_match(strip_port(h))),
        }
    }
}

/// Drop a trailing `:port`, keeping bracketed IPv6 literals intact.
pub(crate) fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}

/// A set of templates; matches when any one of them does.
#[derive(Debug, Clone, Default)]
pub struct RouteSet {
    patterns: Vec<RoutePattern>,
}

impl RouteSet {
    pub fn compile<I, S>(templates: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = templates
            .into_iter()
            .map(|t| RoutePattern::compile(t.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, path: &str, host: Option<&str>) -> bool {
        self.patterns.iter().any(|p| p.matches(path, host))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_path() {
        let route = RoutePattern::compile("/logout").unwrap();
        assert!(route.matches("/logout", None));
        assert!(!route.matches("/logout/now", None));
        assert!(!route.matches("/Logout", None));
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let route = RoutePattern::compile("/files/a.b").unwrap();
        assert!(route.matches("/files/a.b", None));
        assert!(!route.matches("/files/aXb", None));
    }

    #[test]
    fn test_default_str_convertor() {
        let route = RoutePattern::compile("/users/{name}").unwrap();
        assert!(route.matches("/users/alice", None));
        assert!(!route.matches("/users/alice/posts", None));
        assert!(!route.matches("/users/", None));
    }

    #[test]
    fn test_int_and_float() {
        let int = RoutePattern::compile("/items/{id:int}").unwrap();
        assert!(int.matches("/items/42", None));
        assert!(!int.matches("/items/4.2", None));

        let float = RoutePattern::compile("/price/{value:float}").unwrap();
        assert!(float.matches("/price/4.2", None));
        assert!(float.matches("/price/4", None));
        assert!(!float.matches("/price/four", None));
    }

    #[test]
    fn test_path_convertor_spans_segments() {
        let route = RoutePattern::compile("/static/{rest:path}").unwrap();
        assert!(route.matches("/static/css/site.css", None));
        assert!(route.matches("/static/", None));
    }

    #[test]
    fn test_uuid_convertor() {
        let route = RoutePattern::compile("/sessions/{id:uuid}/end").unwrap();
        assert!(route.matches("/sessions/123e4567-e89b-12d3-a456-426614174000/end", None));
        assert!(!route.matches("/sessions/123/end", None));
    }

    #[test]
    fn test_unknown_convertor() {
        assert_eq!(
            RoutePattern::compile("/x/{id:slug}").unwrap_err(),
            RouteError::UnknownConvertor {
                template: "/x/{id:slug}".to_string(),
                convertor: "slug".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_param() {
        assert!(matches!(
            RoutePattern::compile("/{id}/{id:int}"),
            Err(RouteError::DuplicateParam { .. })
        ));
    }

    #[test]
    fn test_host_template() {
        let route = RoutePattern::compile("{tenant}.example.com:8443").unwrap();
        assert!(route.is_host());
        assert_eq!(route.template(), "{tenant}.example.com:8443");
        assert!(route.matches("/anything", Some("acme.example.com")));
        assert!(route.matches("/anything", Some("ACME.example.com:8443")));
        assert!(!route.matches("/anything", Some("example.com")));
        assert!(!route.matches("/anything", None));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
    }

    #[test]
    fn test_route_set_any() {
        let set = RouteSet::compile(["/logout", "/account/{id:int}/delete"]).unwrap();
        assert!(set.matches("/logout", None));
        assert!(set.matches("/account/7/delete", None));
        assert!(!set.matches("/account/seven/delete", None));
        assert_eq!(set.len(), 2);
    }
}
