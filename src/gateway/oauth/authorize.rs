//! Usage: Authorization-code leg of the OAuth flow (state nonce, authorize URL, grant extraction).

use crate::gateway::oauth::endpoints::OAuthEndpoints;
use crate::shared::error::AppResult;
use crate::shared::security::{constant_time_eq, random_nonce_hex};
use reqwest::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OAuthCallbackPayload {
    pub(crate) code: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) error_description: Option<String>,
}

/// Authorization code extracted from a verified redirect.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub code: String,
}

impl std::fmt::Debug for AuthorizationGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGrant")
            .field("code", &crate::shared::security::mask_token(&self.code))
            .finish()
    }
}

pub fn build_oauth_state() -> String {
    random_nonce_hex()
}

pub fn build_authorize_url(
    endpoints: &OAuthEndpoints,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
    login_email: &str,
) -> AppResult<String> {
    let mut url = Url::parse(&endpoints.authorize_url)
        .map_err(|e| format!("SEC_INVALID_INPUT: invalid oauth authorize url: {e}"))?;
    {
        let scope = endpoints.scopes.join(" ");
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", "code");
        query.append_pair("client_id", client_id.trim());
        query.append_pair("redirect_uri", redirect_uri.trim());
        query.append_pair("scope", &scope);
        query.append_pair("state", state);
        let login_email = login_email.trim();
        if !login_email.is_empty() {
            query.append_pair("login_hint", login_email);
        }
    }
    Ok(url.to_string())
}

pub(crate) fn parse_redirect_url(redirect_url: &str) -> AppResult<OAuthCallbackPayload> {
    let url = Url::parse(redirect_url.trim())
        .map_err(|e| format!("SEC_INVALID_INPUT: invalid oauth redirect url: {e}"))?;

    let mut code: Option<String> = None;
    let mut state: Option<String> = None;
    let mut error: Option<String> = None;
    let mut error_description: Option<String> = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            "error_description" => error_description = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(OAuthCallbackPayload {
        code,
        state,
        error,
        error_description,
    })
}

fn validate_state(payload: &OAuthCallbackPayload, expected_state: &str) -> AppResult<()> {
    let state = payload
        .state
        .as_deref()
        .ok_or_else(|| "SECURITY_ERROR: oauth redirect missing state".to_string())?;
    if expected_state.is_empty() || !constant_time_eq(state.as_bytes(), expected_state.as_bytes())
    {
        return Err("SECURITY_ERROR: oauth redirect state mismatch"
            .to_string()
            .into());
    }
    Ok(())
}

/// Pulls the authorization code out of a captured redirect after checking its anti-CSRF state.
pub fn get_auth_grant(redirect_url: &str, expected_state: &str) -> AppResult<AuthorizationGrant> {
    let payload = parse_redirect_url(redirect_url)?;
    validate_state(&payload, expected_state)?;

    if let Some(err_code) = payload.error.as_deref() {
        let description = payload
            .error_description
            .as_deref()
            .unwrap_or("oauth login failed");
        return Err(format!("AUTH_ERROR: oauth provider returned error={err_code}: {description}").into());
    }

    let code = payload
        .code
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| "AUTH_ERROR: oauth redirect missing code".to_string())?;
    Ok(AuthorizationGrant { code })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::ErrorKind;

    fn endpoints() -> OAuthEndpoints {
        OAuthEndpoints {
            authorize_url: "https://secure.na1.adobesign.com/public/oauth/v2".to_string(),
            token_url: "https://api.na1.adobesign.com/oauth/v2/token".to_string(),
            refresh_url: "https://api.na1.adobesign.com/oauth/v2/refresh".to_string(),
            scopes: &["library_read:account", "library_write:account"],
        }
    }

    #[test]
    fn authorize_url_carries_state_and_redirect() {
        let url = build_authorize_url(
            &endpoints(),
            "client-1",
            "http://localhost:43117/oauth/callback",
            "nonce123",
            "owner@example.com",
        )
        .expect("url");
        let parsed = Url::parse(&url).expect("parse");
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(pairs.contains(&("state".to_string(), "nonce123".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:43117/oauth/callback".to_string()
        )));
        assert!(pairs.contains(&(
            "scope".to_string(),
            "library_read:account library_write:account".to_string()
        )));
        assert!(pairs.contains(&("login_hint".to_string(), "owner@example.com".to_string())));
    }

    #[test]
    fn grant_is_returned_when_state_matches() {
        let grant = get_auth_grant(
            "https://migrationtool.com/?code=abc123&state=xyz&api_access_point=https%3A%2F%2Fapi.na1.adobesign.com%2F",
            "xyz",
        )
        .expect("grant");
        assert_eq!(grant.code, "abc123");
    }

    #[test]
    fn state_mismatch_is_a_security_error() {
        let err = get_auth_grant("https://migrationtool.com/?code=abc&state=foo", "bar")
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Security);
        assert!(err.to_string().contains("state mismatch"));
    }

    #[test]
    fn missing_state_is_a_security_error() {
        let err = get_auth_grant("https://migrationtool.com/?code=abc", "bar")
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Security);
    }

    #[test]
    fn empty_expected_state_never_matches() {
        let err = get_auth_grant("https://migrationtool.com/?code=abc&state=", "")
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Security);
    }

    #[test]
    fn provider_error_is_an_auth_error_once_state_checks_out() {
        let err = get_auth_grant(
            "https://migrationtool.com/?error=access_denied&error_description=nope&state=xyz",
            "xyz",
        )
        .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(err.message().contains("access_denied"));
    }

    #[test]
    fn malformed_redirect_is_invalid_input() {
        let err = get_auth_grant("not a url", "xyz").expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
