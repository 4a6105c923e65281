//! Usage: Proactive token swap (refresh decision and execution) for a tenant session.

use crate::domain::tenants::{OAuthSession, TokenPair};
use crate::gateway::oauth::endpoints::{oauth_endpoints, EndpointConfig};
use crate::gateway::oauth::token_exchange::{refresh_access_token, TokenRefreshRequest};
use crate::gateway::transport::HttpTransport;
use crate::shared::error::AppResult;
use crate::shared::security::mask_token;
use std::time::{Duration, Instant};

/// When to swap: once `token_lifetime * refresh_margin` has elapsed since the last refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshPolicy {
    pub token_lifetime: Duration,
    pub refresh_margin: f64,
}

impl RefreshPolicy {
    pub fn new(token_lifetime: Duration, refresh_margin: f64) -> Self {
        Self {
            token_lifetime,
            refresh_margin,
        }
    }

    pub fn threshold(&self) -> Duration {
        let margin = if self.refresh_margin.is_finite() {
            self.refresh_margin.max(0.0)
        } else {
            1.0
        };
        self.token_lifetime.mul_f64(margin)
    }
}

pub fn should_refresh_now(time_of_last_refresh: Instant, now: Instant, policy: RefreshPolicy) -> bool {
    let elapsed = now.saturating_duration_since(time_of_last_refresh);
    elapsed >= policy.threshold()
}

/// Returns the session's current pair untouched (no network call) while it is fresh enough,
/// otherwise performs a refresh grant and returns a whole new pair stamped with `now`.
pub async fn swap_tokens(
    transport: &dyn HttpTransport,
    endpoint_cfg: &EndpointConfig,
    session: &OAuthSession,
    policy: RefreshPolicy,
    now: Instant,
) -> AppResult<TokenPair> {
    let current = &session.token_pair;
    if !should_refresh_now(current.time_of_last_refresh, now, policy) {
        return Ok(current.clone());
    }

    let endpoints = oauth_endpoints(session.compliance_level, &session.shard, endpoint_cfg);
    let request = TokenRefreshRequest {
        token_uri: endpoints.refresh_url,
        client_id: session.credentials.client_id.clone(),
        client_secret: session.credentials.client_secret.clone(),
        refresh_token: current.refresh_token.clone(),
    };
    let tokens = refresh_access_token(transport, &request).await?;

    // Some realms only rotate the access token; the refresh token then stays valid.
    let refresh_token = tokens
        .refresh_token
        .unwrap_or_else(|| current.refresh_token.clone());
    let time_of_last_refresh = now.max(current.time_of_last_refresh + Duration::from_nanos(1));

    tracing::info!(
        role = %session.role,
        access_token = %mask_token(&tokens.access_token),
        expires_in = ?tokens.expires_in,
        "oauth tokens swapped"
    );

    Ok(TokenPair {
        access_token: tokens.access_token,
        refresh_token,
        time_of_last_refresh,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_refresh_now_respects_margin_window() {
        let policy = RefreshPolicy::new(Duration::from_secs(300), 0.1);
        let base = Instant::now();
        assert!(!should_refresh_now(base, base + Duration::from_secs(29), policy));
        assert!(should_refresh_now(base, base + Duration::from_secs(30), policy));
        assert!(should_refresh_now(base, base + Duration::from_secs(3000), policy));
    }

    #[test]
    fn clock_going_backwards_counts_as_no_elapsed_time() {
        let policy = RefreshPolicy::new(Duration::from_secs(300), 0.1);
        let base = Instant::now() + Duration::from_secs(60);
        assert!(!should_refresh_now(base, base - Duration::from_secs(10), policy));
    }

    #[test]
    fn zero_margin_refreshes_every_time() {
        let policy = RefreshPolicy::new(Duration::from_secs(300), 0.0);
        let base = Instant::now();
        assert!(should_refresh_now(base, base, policy));
    }

    #[test]
    fn non_finite_margin_falls_back_to_full_lifetime() {
        let policy = RefreshPolicy::new(Duration::from_secs(10), f64::NAN);
        assert_eq!(policy.threshold(), Duration::from_secs(10));
    }
}
