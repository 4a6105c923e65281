//! Usage: Domain modules (tenants, login bookkeeping, document listing, migration).

pub mod console_log;
pub mod documents;
pub mod login;
pub mod migration;
pub mod tenants;
