//! Usage: Application layer (console orchestration context, shell link, logging setup).

pub mod console;
pub mod logging;
pub mod shell_link;
