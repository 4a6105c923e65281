//! Usage: Login initiation bookkeeping (per-role pending login + login-initiation order).

use crate::domain::tenants::{ComplianceLevel, Credentials, OAuthSession, TenantRole, TokenPair};
use crate::gateway::oauth::authorize::{build_authorize_url, build_oauth_state};
use crate::gateway::oauth::correlator::RedirectAttribution;
use crate::gateway::oauth::endpoints::{oauth_endpoints, EndpointConfig};
use crate::shared::error::AppResult;

/// Everything known about a role between "login clicked" and "redirect received".
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub role: TenantRole,
    pub credentials: Credentials,
    pub compliance_level: ComplianceLevel,
    pub shard: String,
    pub initial_oauth_state: String,
}

impl PendingLogin {
    pub fn into_session(self, token_pair: TokenPair) -> OAuthSession {
        OAuthSession {
            role: self.role,
            credentials: self.credentials,
            compliance_level: self.compliance_level,
            shard: self.shard,
            initial_oauth_state: self.initial_oauth_state,
            token_pair,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginBook {
    logged_in: Vec<TenantRole>,
    source: Option<PendingLogin>,
    dest: Option<PendingLogin>,
}

impl LoginBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a login for `role` and returns the authorize URL the shell should open.
    /// A repeated login for the same role replaces the earlier one and moves it to the back.
    pub fn begin_login(
        &mut self,
        role: TenantRole,
        credentials: Credentials,
        compliance_level: ComplianceLevel,
        shard: &str,
        endpoint_cfg: &EndpointConfig,
        redirect_uri: &str,
    ) -> AppResult<String> {
        if credentials.client_id.trim().is_empty() {
            return Err(format!("SEC_INVALID_INPUT: {role} client id is required").into());
        }
        if credentials.client_secret.trim().is_empty() {
            return Err(format!("SEC_INVALID_INPUT: {role} client secret is required").into());
        }

        let state = build_oauth_state();
        let endpoints = oauth_endpoints(compliance_level, shard, endpoint_cfg);
        let authorize_url = build_authorize_url(
            &endpoints,
            &credentials.client_id,
            redirect_uri,
            &state,
            &credentials.login_email,
        )?;

        let pending = PendingLogin {
            role,
            credentials,
            compliance_level,
            shard: shard.trim().to_string(),
            initial_oauth_state: state,
        };
        match role {
            TenantRole::Source => self.source = Some(pending),
            TenantRole::Dest => self.dest = Some(pending),
        }
        self.logged_in.retain(|r| *r != role);
        self.logged_in.push(role);

        tracing::info!(role = %role, realm = %compliance_level, "oauth login initiated");
        Ok(authorize_url)
    }

    pub fn logged_in(&self) -> &[TenantRole] {
        &self.logged_in
    }

    pub fn pending(&self, role: TenantRole) -> Option<&PendingLogin> {
        match role {
            TenantRole::Source => self.source.as_ref(),
            TenantRole::Dest => self.dest.as_ref(),
        }
    }

    pub fn attribution(&self, redirect_urls: Vec<String>) -> RedirectAttribution {
        RedirectAttribution {
            redirect_urls,
            logged_in: self.logged_in.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
