//! Usage: OAuth token endpoint helpers (authorization_code + refresh_token grants).

use crate::domain::tenants::{ComplianceLevel, TokenPair};
use crate::gateway::oauth::authorize::AuthorizationGrant;
use crate::gateway::oauth::endpoints::{oauth_endpoints, EndpointConfig};
use crate::gateway::transport::{HttpRequestConfig, HttpResponse, HttpTransport};
use crate::shared::error::{AppError, AppResult, ErrorKind};
use crate::shared::security::sanitize_body_snippet;
use serde_json::Value;
use std::time::Instant;

#[derive(Debug, Clone)]
pub(crate) struct TokenExchangeRequest {
    pub(crate) token_uri: String,
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) code: String,
    pub(crate) redirect_uri: String,
}

#[derive(Debug, Clone)]
pub(crate) struct TokenRefreshRequest {
    pub(crate) token_uri: String,
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) refresh_token: String,
}

#[derive(Debug, Clone)]
pub(crate) struct OAuthTokenSet {
    pub(crate) access_token: String,
    pub(crate) refresh_token: Option<String>,
    pub(crate) expires_in: Option<i64>,
}

pub(crate) async fn exchange_authorization_code(
    transport: &dyn HttpTransport,
    req: &TokenExchangeRequest,
) -> AppResult<OAuthTokenSet> {
    let form = vec![
        ("grant_type".to_string(), "authorization_code".to_string()),
        ("code".to_string(), req.code.trim().to_string()),
        ("redirect_uri".to_string(), req.redirect_uri.trim().to_string()),
        ("client_id".to_string(), req.client_id.trim().to_string()),
        ("client_secret".to_string(), req.client_secret.trim().to_string()),
    ];

    let response = transport
        .send(HttpRequestConfig::post(req.token_uri.trim()).form(form))
        .await
        .map_err(|e| format!("NETWORK_ERROR: oauth token exchange request failed: {}", e.message()))?;

    parse_token_response(response)
}

pub(crate) async fn refresh_access_token(
    transport: &dyn HttpTransport,
    req: &TokenRefreshRequest,
) -> AppResult<OAuthTokenSet> {
    let form = vec![
        ("grant_type".to_string(), "refresh_token".to_string()),
        ("refresh_token".to_string(), req.refresh_token.trim().to_string()),
        ("client_id".to_string(), req.client_id.trim().to_string()),
        ("client_secret".to_string(), req.client_secret.trim().to_string()),
    ];

    let response = transport
        .send(HttpRequestConfig::post(req.token_uri.trim()).form(form))
        .await
        .map_err(|e| format!("NETWORK_ERROR: oauth refresh request failed: {}", e.message()))?;

    parse_token_response(response)
}

/// Exchanges an authorization code for the tenant's first token pair.
#[allow(clippy::too_many_arguments)]
pub async fn get_token(
    transport: &dyn HttpTransport,
    compliance_level: ComplianceLevel,
    shard: &str,
    endpoint_cfg: &EndpointConfig,
    client_id: &str,
    client_secret: &str,
    authorization_grant: &AuthorizationGrant,
    redirect_uri: &str,
) -> AppResult<TokenPair> {
    let endpoints = oauth_endpoints(compliance_level, shard, endpoint_cfg);
    let request = TokenExchangeRequest {
        token_uri: endpoints.token_url,
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
        code: authorization_grant.code.clone(),
        redirect_uri: redirect_uri.to_string(),
    };

    // Any failure during login is terminal for that attempt and reported as an auth failure.
    let token_set = exchange_authorization_code(transport, &request)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::Auth => e,
            _ => AppError::of_kind(
                ErrorKind::Auth,
                format!("oauth token exchange failed ({compliance_level}/{shard}): {}", e.message()),
            ),
        })?;

    let refresh_token = token_set
        .refresh_token
        .ok_or_else(|| "AUTH_ERROR: oauth token response missing refresh_token".to_string())?;

    Ok(TokenPair {
        access_token: token_set.access_token,
        refresh_token,
        time_of_last_refresh: Instant::now(),
    })
}

fn parse_token_response(response: HttpResponse) -> AppResult<OAuthTokenSet> {
    if !response.is_success() {
        let (error_code, error_message) = parse_oauth_error_details(&response.body);
        let family = if (400..500).contains(&response.status) {
            "AUTH_ERROR"
        } else {
            "NETWORK_ERROR"
        };
        let mut msg = format!(
            "{family}: oauth token endpoint returned status={}",
            response.status
        );
        if let Some(code) = error_code {
            msg.push_str(" code=");
            msg.push_str(code.as_str());
        }
        if let Some(detail) = error_message {
            msg.push_str(" message=");
            msg.push_str(detail.chars().take(240).collect::<String>().as_str());
        }
        msg.push_str(" body=");
        msg.push_str(sanitize_body_snippet(&response.body).as_str());
        return Err(msg.into());
    }

    let value: Value = serde_json::from_str(&response.body)
        .map_err(|e| format!("NETWORK_ERROR: oauth token response json invalid: {e}"))?;

    let access_token = value
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| "NETWORK_ERROR: oauth token response missing access_token".to_string())?
        .to_string();

    let refresh_token = value
        .get("refresh_token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let expires_in = value.get("expires_in").and_then(parse_i64_lossy);

    Ok(OAuthTokenSet {
        access_token,
        refresh_token,
        expires_in,
    })
}

fn parse_i64_lossy(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_oauth_error_details(body: &str) -> (Option<String>, Option<String>) {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return (None, None),
    };

    let mut code = value
        .get("code")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let mut message = value
        .get("error_description")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    if let Some(error_value) = value.get("error") {
        if let Some(err_str) = error_value.as_str() {
            if code.is_none() {
                code = Some(err_str.trim().to_string());
            }
        } else if let Some(err_obj) = error_value.as_object() {
            if code.is_none() {
                code = err_obj
                    .get("code")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
            if message.is_none() {
                message = err_obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
        }
    }

    (code, message)
}
