//! Usage: Tenant-side value types (roles, credentials, compliance realms, token pairs, sessions).

use crate::shared::security::mask_token;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantRole {
    Source,
    Dest,
}

impl TenantRole {
    pub const ALL: [TenantRole; 2] = [TenantRole::Source, TenantRole::Dest];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Dest => "dest",
        }
    }
}

impl fmt::Display for TenantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceLevel {
    #[default]
    #[serde(rename = "commercial")]
    Commercial,
    #[serde(rename = "gov-stage")]
    GovStage,
    #[serde(rename = "gov-prod")]
    GovProd,
}

impl ComplianceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commercial => "commercial",
            Self::GovStage => "gov-stage",
            Self::GovProd => "gov-prod",
        }
    }

    pub fn is_government(self) -> bool {
        matches!(self, Self::GovStage | Self::GovProd)
    }
}

impl fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supplied by the user when a login is initiated; never mutated afterwards.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub login_email: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &mask_token(&self.client_secret))
            .field("login_email", &self.login_email)
            .finish()
    }
}

/// Access/refresh token pair for one tenant. Replaced as a whole on every refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub time_of_last_refresh: Instant,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &mask_token(&self.access_token))
            .field("refresh_token", &mask_token(&self.refresh_token))
            .field("time_of_last_refresh", &self.time_of_last_refresh)
            .finish()
    }
}

/// A logged-in tenant. Exactly one exists per role while the console is alive.
#[derive(Debug, Clone)]
pub struct OAuthSession {
    pub role: TenantRole,
    pub credentials: Credentials,
    pub compliance_level: ComplianceLevel,
    pub shard: String,
    pub initial_oauth_state: String,
    pub token_pair: TokenPair,
}

impl OAuthSession {
    pub fn access_token(&self) -> &str {
        &self.token_pair.access_token
    }
}

/// The two live sessions, owned by the orchestration context.
#[derive(Debug, Clone)]
pub struct TenantSessions {
    pub source: OAuthSession,
    pub dest: OAuthSession,
}

impl TenantSessions {
    pub fn get_mut(&mut self, role: TenantRole) -> &mut OAuthSession {
        match role {
            TenantRole::Source => &mut self.source,
            TenantRole::Dest => &mut self.dest,
        }
    }
}

/// Snapshot of one library document on the source tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner_email: String,
}
