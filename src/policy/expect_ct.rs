//! Expect-CT (deprecated by browsers, kept for older clients).

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{HeaderPolicy, PolicyError};

const HEADER: &str = "Expect-CT";

pub const EXPECT_CT: HeaderName = HeaderName::from_static("expect-ct");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpectCt {
    pub max_age: u64,

    pub enforce: bool,

    /// Absolute URL violations are reported to. Empty means none.
    pub report_uri: Option<String>,
}

impl Default for ExpectCt {
    fn default() -> Self {
        Self {
            max_age: 123,
            enforce: false,
            report_uri: None,
        }
    }
}

impl HeaderPolicy for ExpectCt {
    fn header_name(&self) -> HeaderName {
        EXPECT_CT
    }

    fn render(&self) -> Result<String, PolicyError> {
        if self.max_age == 0 {
            return Err(PolicyError::NonPositive {
                header: HEADER,
                field: "max-age",
            });
        }

        let mut value = format!("max-age={}", self.max_age);
        if self.enforce {
            value.push_str(", enforce");
        }
        if let Some(uri) = self.report_uri.as_deref().filter(|uri| !uri.is_empty()) {
            if Url::parse(uri).is_err() || uri.contains('"') {
                return Err(PolicyError::InvalidValue {
                    header: HEADER,
                    value: uri.to_string(),
                    expected: "an absolute report-uri".to_string(),
                });
            }
            value.push_str(&format!(", report-uri=\"{uri}\""));
        }
        Ok(value)
    }
}
