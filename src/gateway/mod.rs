//! Usage: Outbound edges: the HTTP transport and the OAuth flow against both tenants.

pub mod oauth;
pub mod transport;
