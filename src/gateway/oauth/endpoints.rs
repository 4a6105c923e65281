//! Usage: Compliance-realm base URI lookup (API, OAuth, PDF library) for direct and proxied access.
//!
//! Everything here is a pure function of (realm, shard, development flag, proxy flag). The only
//! network step, resolving a commercial tenant's API access point, lives in
//! [`resolve_api_base_uri`] and is invoked by callers that hold a bearer token.

use crate::domain::tenants::ComplianceLevel;
use crate::gateway::transport::{request_json, HttpRequestConfig, HttpTransport};
use crate::shared::error::AppResult;
use serde::Deserialize;

const COMMERCIAL_BASE_URIS_URL: &str = "https://api.na1.adobesign.com/api/rest/v6/baseUris";
const GOV_API_STAGE: &str = "https://api.na1.adobesignstage.us/api/rest/v6";
const GOV_API_PROD: &str = "https://api.na1.adobesign.us/api/rest/v6";
const GOV_OAUTH_STAGE: &str = "https://secure.na1.adobesignstage.us/api/gateway/adobesignauthservice";
const GOV_OAUTH_PROD: &str = "https://secure.na1.adobesign.us/api/gateway/adobesignauthservice";
const PDF_LIBRARY_BASE: &str = "https://secure.na4.adobesign.com/document/cp";
const API_REST_SUFFIX: &str = "/api/rest/v6";

const PROXY_COMMERCIAL_API: &str = "/commercial-api";
const PROXY_GOV_API: &str = "/gov-api";
const PROXY_OAUTH_API: &str = "/oauth-api";
const PROXY_PDF_API: &str = "/pdf-api";

pub const COMMERCIAL_SCOPES: &[&str] = &[
    "user_login:self",
    "library_read:account",
    "library_write:account",
];
pub const GOV_SCOPES: &[&str] = &["user_login", "library_read", "library_write"];

/// Inputs of the base-URI lookup, taken from settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub in_development: bool,
    pub use_proxy: bool,
    pub proxy_origin: String,
}

impl EndpointConfig {
    fn proxied(&self, prefix: &str) -> String {
        format!("{}{prefix}", self.proxy_origin.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiBase {
    Fixed(String),
    /// Commercial tenants publish their access point; GET this URL with a bearer token.
    Discover(String),
}

/// OAuth endpoints for one tenant (realm + shard).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub refresh_url: String,
    pub scopes: &'static [&'static str],
}

fn uses_gov_stage(realm: ComplianceLevel, in_development: bool) -> bool {
    realm == ComplianceLevel::GovStage || in_development
}

pub fn api_base_uri(realm: ComplianceLevel, cfg: &EndpointConfig) -> ApiBase {
    if cfg.use_proxy {
        let prefix = if realm.is_government() {
            PROXY_GOV_API
        } else {
            PROXY_COMMERCIAL_API
        };
        return ApiBase::Fixed(cfg.proxied(prefix));
    }
    match realm {
        ComplianceLevel::Commercial => ApiBase::Discover(COMMERCIAL_BASE_URIS_URL.to_string()),
        gov if uses_gov_stage(gov, cfg.in_development) => ApiBase::Fixed(GOV_API_STAGE.to_string()),
        _ => ApiBase::Fixed(GOV_API_PROD.to_string()),
    }
}

/// Government auth service root (also used as the proxy target for every realm's token calls).
pub fn oauth_base_uri(realm: ComplianceLevel, cfg: &EndpointConfig) -> String {
    if cfg.use_proxy {
        return cfg.proxied(PROXY_OAUTH_API);
    }
    if uses_gov_stage(realm, cfg.in_development) {
        GOV_OAUTH_STAGE.to_string()
    } else {
        GOV_OAUTH_PROD.to_string()
    }
}

pub fn pdf_library_base_uri(cfg: &EndpointConfig) -> String {
    if cfg.use_proxy {
        cfg.proxied(PROXY_PDF_API)
    } else {
        PDF_LIBRARY_BASE.to_string()
    }
}

fn normalize_shard(shard: &str) -> &str {
    let shard = shard.trim();
    if shard.is_empty() {
        "na1"
    } else {
        shard
    }
}

pub fn oauth_endpoints(realm: ComplianceLevel, shard: &str, cfg: &EndpointConfig) -> OAuthEndpoints {
    if realm.is_government() {
        let base = oauth_base_uri(realm, cfg);
        return OAuthEndpoints {
            authorize_url: format!("{base}/api/v1/authorize"),
            token_url: format!("{base}/api/v1/token"),
            refresh_url: format!("{base}/api/v1/token"),
            scopes: GOV_SCOPES,
        };
    }

    let shard = normalize_shard(shard);
    if cfg.use_proxy {
        let base = cfg.proxied(PROXY_OAUTH_API);
        return OAuthEndpoints {
            authorize_url: format!("https://secure.{shard}.adobesign.com/public/oauth/v2"),
            token_url: format!("{base}/oauth/v2/token"),
            refresh_url: format!("{base}/oauth/v2/refresh"),
            scopes: COMMERCIAL_SCOPES,
        };
    }
    OAuthEndpoints {
        authorize_url: format!("https://secure.{shard}.adobesign.com/public/oauth/v2"),
        token_url: format!("https://api.{shard}.adobesign.com/oauth/v2/token"),
        refresh_url: format!("https://api.{shard}.adobesign.com/oauth/v2/refresh"),
        scopes: COMMERCIAL_SCOPES,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaseUrisResponse {
    api_access_point: String,
}

/// `apiAccessPoint` minus its trailing slash, plus the REST v6 suffix.
pub(crate) fn rest_base_from_access_point(access_point: &str) -> String {
    let trimmed = access_point.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    format!("{trimmed}{API_REST_SUFFIX}")
}

pub async fn resolve_api_base_uri(
    transport: &dyn HttpTransport,
    realm: ComplianceLevel,
    cfg: &EndpointConfig,
    access_token: &str,
) -> AppResult<String> {
    match api_base_uri(realm, cfg) {
        ApiBase::Fixed(uri) => Ok(uri),
        ApiBase::Discover(url) => {
            let response: BaseUrisResponse =
                request_json(transport, HttpRequestConfig::get(url).bearer(access_token)).await?;
            Ok(rest_base_from_access_point(&response.api_access_point))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(in_development: bool) -> EndpointConfig {
        EndpointConfig {
            in_development,
            use_proxy: false,
            proxy_origin: "http://localhost:4200".to_string(),
        }
    }

    fn proxied() -> EndpointConfig {
        EndpointConfig {
            in_development: true,
            use_proxy: true,
            proxy_origin: "http://localhost:4200/".to_string(),
        }
    }

    #[test]
    fn proxy_mode_routes_every_realm_through_origin() {
        let cfg = proxied();
        assert_eq!(
            api_base_uri(ComplianceLevel::Commercial, &cfg),
            ApiBase::Fixed("http://localhost:4200/commercial-api".to_string())
        );
        assert_eq!(
            api_base_uri(ComplianceLevel::GovProd, &cfg),
            ApiBase::Fixed("http://localhost:4200/gov-api".to_string())
        );
        assert_eq!(
            oauth_base_uri(ComplianceLevel::GovStage, &cfg),
            "http://localhost:4200/oauth-api"
        );
        assert_eq!(pdf_library_base_uri(&cfg), "http://localhost:4200/pdf-api");
    }

    #[test]
    fn gov_realm_picks_stage_or_prod() {
        assert_eq!(
            api_base_uri(ComplianceLevel::GovStage, &direct(false)),
            ApiBase::Fixed(GOV_API_STAGE.to_string())
        );
        assert_eq!(
            api_base_uri(ComplianceLevel::GovProd, &direct(false)),
            ApiBase::Fixed(GOV_API_PROD.to_string())
        );
        assert_eq!(
            api_base_uri(ComplianceLevel::GovProd, &direct(true)),
            ApiBase::Fixed(GOV_API_STAGE.to_string())
        );
    }

    #[test]
    fn commercial_realm_requires_discovery() {
        assert!(matches!(
            api_base_uri(ComplianceLevel::Commercial, &direct(false)),
            ApiBase::Discover(_)
        ));
    }

    #[test]
    fn commercial_oauth_endpoints_follow_shard() {
        let endpoints = oauth_endpoints(ComplianceLevel::Commercial, " na2 ", &direct(false));
        assert_eq!(endpoints.token_url, "https://api.na2.adobesign.com/oauth/v2/token");
        assert_eq!(
            endpoints.refresh_url,
            "https://api.na2.adobesign.com/oauth/v2/refresh"
        );
        assert_eq!(
            endpoints.authorize_url,
            "https://secure.na2.adobesign.com/public/oauth/v2"
        );

        let defaulted = oauth_endpoints(ComplianceLevel::Commercial, "", &direct(false));
        assert!(defaulted.token_url.contains(".na1."));
    }

    #[test]
    fn gov_oauth_endpoints_share_token_url_for_both_grants() {
        let endpoints = oauth_endpoints(ComplianceLevel::GovProd, "na1", &direct(false));
        assert_eq!(endpoints.token_url, endpoints.refresh_url);
        assert!(endpoints.token_url.starts_with(GOV_OAUTH_PROD));
    }

    #[test]
    fn access_point_trailing_slash_is_dropped() {
        assert_eq!(
            rest_base_from_access_point("https://api.na3.adobesign.com/"),
            "https://api.na3.adobesign.com/api/rest/v6"
        );
        assert_eq!(
            rest_base_from_access_point("https://api.na3.adobesign.com"),
            "https://api.na3.adobesign.com/api/rest/v6"
        );
    }
}
