//! Clear-Site-Data, sent only on selected routes.

use axum::http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tower_http::set_header::SetResponseHeaderLayer;

use super::{HeaderPolicy, PolicyError};
use crate::routing::RouteSet;

const HEADER: &str = "Clear-Site-Data";

pub const CLEAR_SITE_DATA: HeaderName = HeaderName::from_static("clear-site-data");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClearSiteData {
    pub cache: bool,
    pub cookies: bool,
    pub storage: bool,

    /// Send `"*"` instead of the individual types.
    pub wildcard: bool,

    /// Route templates (e.g. `/logout`, `/users/{id:int}/reset`) that
    /// receive the header.
    pub routes: Vec<String>,
}

impl Default for ClearSiteData {
    fn default() -> Self {
        Self {
            cache: true,
            cookies: true,
            storage: true,
            wildcard: false,
            routes: Vec::new(),
        }
    }
}

impl ClearSiteData {
    /// Clear everything on the given routes.
    pub fn on_routes<I, S>(routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            routes: routes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Compile the route templates.
    pub fn route_set(&self) -> Result<RouteSet, PolicyError> {
        if self.routes.is_empty() {
            return Err(PolicyError::Empty {
                header: HEADER,
                reason: "cannot be set without routes",
            });
        }
        RouteSet::compile(&self.routes).map_err(|source| PolicyError::InvalidRoute {
            header: HEADER,
            source,
        })
    }
}

impl HeaderPolicy for ClearSiteData {
    fn header_name(&self) -> HeaderName {
        CLEAR_SITE_DATA
    }

    fn render(&self) -> Result<String, PolicyError> {
        if self.wildcard {
            return Ok("\"*\"".to_string());
        }

        let types: Vec<&str> = [
            (self.cache, "\"cache\""),
            (self.cookies, "\"cookies\""),
            (self.storage, "\"storage\""),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect();

        if types.is_empty() {
            return Err(PolicyError::Empty {
                header: HEADER,
                reason: "select at least one of cache, cookies, storage or wildcard",
            });
        }
        Ok(types.join(", "))
    }

    /// Always fails: a blanket layer would clear site data on every response.
    fn set_header_layer(&self) -> Result<SetResponseHeaderLayer<HeaderValue>, PolicyError> {
        Err(PolicyError::RouteScoped { header: HEADER })
    }
}
