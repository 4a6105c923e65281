//! Usage: Attribute the two captured OAuth redirects to the source and destination tenants.
//!
//! Both redirects look alike (same host, same path, opaque code/state), so attribution uses
//! only the order in which the two roles initiated their logins: the n-th initiated login
//! produced the n-th captured redirect.

use crate::domain::tenants::TenantRole;
use crate::shared::error::AppResult;

pub const EXPECTED_REDIRECTS: usize = 2;

/// Captured redirect URLs (shell capture order) plus login-initiation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectAttribution {
    pub redirect_urls: Vec<String>,
    pub logged_in: Vec<TenantRole>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRedirects {
    pub source: String,
    pub dest: String,
}

impl ResolvedRedirects {
    pub fn for_role(&self, role: TenantRole) -> &str {
        match role {
            TenantRole::Source => &self.source,
            TenantRole::Dest => &self.dest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    Resolved(ResolvedRedirects),
    /// Not every login has redirected back yet; keep waiting.
    Incomplete { captured: usize },
}

fn login_position(logged_in: &[TenantRole], role: TenantRole) -> AppResult<usize> {
    let mut positions = logged_in
        .iter()
        .enumerate()
        .filter(|(_, r)| **r == role)
        .map(|(idx, _)| idx);
    let position = positions
        .next()
        .ok_or_else(|| format!("SEC_INVALID_INPUT: {role} login was never initiated"))?;
    if positions.next().is_some() {
        return Err(format!("SEC_INVALID_INPUT: {role} appears twice in login order").into());
    }
    Ok(position)
}

pub fn correlate(attribution: &RedirectAttribution) -> AppResult<Correlation> {
    let captured = attribution.redirect_urls.len();
    if captured < EXPECTED_REDIRECTS {
        tracing::debug!(captured, "oauth redirects incomplete; waiting");
        return Ok(Correlation::Incomplete { captured });
    }
    if captured > EXPECTED_REDIRECTS {
        return Err(format!(
            "SEC_INVALID_INPUT: captured {captured} oauth redirects, expected {EXPECTED_REDIRECTS}"
        )
        .into());
    }

    if attribution.logged_in.len() != EXPECTED_REDIRECTS {
        return Err(format!(
            "SEC_INVALID_INPUT: expected {EXPECTED_REDIRECTS} initiated logins, got {}",
            attribution.logged_in.len()
        )
        .into());
    }
    let source_index = login_position(&attribution.logged_in, TenantRole::Source)?;
    let dest_index = login_position(&attribution.logged_in, TenantRole::Dest)?;

    Ok(Correlation::Resolved(ResolvedRedirects {
        source: attribution.redirect_urls[source_index].clone(),
        dest: attribution.redirect_urls[dest_index].clone(),
    }))
}
