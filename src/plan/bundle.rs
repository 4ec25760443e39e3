//! The configurable bundle: one plan from a `SecureHeadersConfig`.

use crate::config::schema::{SecureHeadersConfig, Toggle};
use crate::policy::{
    HeaderPolicy, OriginAgentCluster, XContentTypeOptions, XDownloadOptions, XXssProtection,
};

use super::{HeaderPlan, HeaderPlanBuilder, PlanError};

impl HeaderPlan {
    /// Build the plan for every enabled header section.
    ///
    /// Headers are planned in a fixed order so the rendered output is stable
    /// across reloads. Clear-Site-Data without routes is left out.
    pub fn from_config(config: &SecureHeadersConfig) -> Result<Self, PlanError> {
        let mut builder = HeaderPlan::builder().mode(config.mode);

        if let Some(csp) = config.csp.as_ref() {
            builder = builder.with_csp(csp.clone());
        }
        if let Some(policy) = config.permissions_policy.as_ref() {
            tracing::warn!(
                "Permissions-Policy is still a working draft; browser support varies"
            );
            builder = builder.with(policy);
        }
        if let Some(policy) = config.expect_ct.as_ref() {
            tracing::warn!("Expect-CT is deprecated and ignored by current browsers");
            builder = builder.with(policy);
        }
        builder = with_toggle(builder, &config.referrer_policy);
        builder = with_toggle(builder, &config.x_dns_prefetch_control);
        builder = with_toggle(builder, &config.x_permitted_cross_domain_policies);
        builder = with_toggle(builder, &config.hsts);
        if let Some(policy) = config.websocket_hsts.as_ref() {
            builder = builder.with_websocket(policy);
        }
        if config.x_xss_protection {
            builder = builder.with(&XXssProtection);
        }
        builder = with_toggle(builder, &config.x_frame_options);
        if config.x_download_options {
            builder = builder.with(&XDownloadOptions);
        }
        if config.x_content_type_options {
            builder = builder.with(&XContentTypeOptions);
        }
        if config.origin_agent_cluster {
            builder = builder.with(&OriginAgentCluster);
        }
        builder = with_toggle(builder, &config.cross_origin_embedder_policy);
        builder = with_toggle(builder, &config.cross_origin_opener_policy);
        builder = with_toggle(builder, &config.cross_origin_resource_policy);
        builder = with_toggle(builder, &config.cache_control);
        if let Some(policy) = config.clear_site_data.as_ref() {
            if policy.routes.is_empty() {
                tracing::debug!("Clear-Site-Data has no routes; not planned");
            } else {
                builder = builder.with_clear_site_data(policy);
            }
        }

        builder.build()
    }
}

fn with_toggle<P: HeaderPolicy>(builder: HeaderPlanBuilder, toggle: &Toggle<P>) -> HeaderPlanBuilder {
    match toggle.as_ref() {
        Some(policy) => builder.with(policy),
        None => builder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::RequestContext;
    use crate::policy::{ClearSiteData, PolicyError, StrictTransportSecurity};

    fn names(plan: &HeaderPlan, ctx: &RequestContext<'_>) -> Vec<String> {
        plan.preview(ctx)
            .into_iter()
            .map(|(name, _)| name.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_default_bundle() {
        let plan = HeaderPlan::from_config(&SecureHeadersConfig::default()).unwrap();
        assert_eq!(
            names(&plan, &RequestContext::http("/")),
            vec![
                "content-security-policy",
                "referrer-policy",
                "x-dns-prefetch-control",
                "x-permitted-cross-domain-policies",
                "strict-transport-security",
                "x-xss-protection",
                "x-frame-options",
                "x-download-options",
                "x-content-type-options",
                "origin-agent-cluster",
                "cache-control",
            ]
        );
    }

    #[test]
    fn test_websocket_gets_only_websocket_headers() {
        let config = SecureHeadersConfig {
            websocket_hsts: Toggle::On(StrictTransportSecurity::new(60)),
            ..SecureHeadersConfig::default()
        };
        let plan = HeaderPlan::from_config(&config).unwrap();
        let ctx = RequestContext {
            websocket: true,
            ..RequestContext::http("/ws")
        };

        let preview = plan.preview(&ctx);
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].1, "max-age=60; includeSubDomains");
    }

    #[test]
    fn test_clear_site_data_on_routes() {
        let config = SecureHeadersConfig {
            clear_site_data: Toggle::On(ClearSiteData::on_routes(["/logout"])),
            ..SecureHeadersConfig::default()
        };
        let plan = HeaderPlan::from_config(&config).unwrap();

        assert!(names(&plan, &RequestContext::http("/logout")).contains(&"clear-site-data".to_string()));
        assert!(!names(&plan, &RequestContext::http("/")).contains(&"clear-site-data".to_string()));
    }

    #[test]
    fn test_all_errors_reported() {
        let config = SecureHeadersConfig {
            hsts: Toggle::On(StrictTransportSecurity::new(0)),
            clear_site_data: Toggle::On(ClearSiteData::on_routes(["/x/{id:slug}"])),
            ..SecureHeadersConfig::default()
        };
        let err = HeaderPlan::from_config(&config).unwrap_err();

        assert_eq!(err.errors().len(), 2);
        assert!(matches!(err.errors()[0], PolicyError::NonPositive { .. }));
        assert!(matches!(err.errors()[1], PolicyError::InvalidRoute { .. }));
    }

    #[test]
    fn test_everything_off() {
        let config: SecureHeadersConfig = toml::from_str(
            r#"
            csp = false
            hsts = false
            cache_control = false
            referrer_policy = false
            x_frame_options = false
            x_dns_prefetch_control = false
            x_permitted_cross_domain_policies = false
            x_content_type_options = false
            x_download_options = false
            origin_agent_cluster = false
            x_xss_protection = false
            "#,
        )
        .unwrap();
        assert!(HeaderPlan::from_config(&config).unwrap().is_empty());
    }
}
