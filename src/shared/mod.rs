//! Usage: Cross-cutting helpers shared by every layer.

pub mod error;
pub(crate) mod mutex_ext;
pub mod security;
