//! Usage: OAuth flow helpers for tenant login, redirect attribution, token exchange, and refresh.

pub mod authorize;
pub mod callback_server;
pub mod correlator;
pub mod endpoints;
pub mod refresh;
pub(crate) mod token_exchange;

pub use token_exchange::get_token;
