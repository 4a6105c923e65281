//! Two-tenant library document migrator: OAuth login for a source and a destination account,
//! paginated listing of the source library, and a retry-until-done migration loop.

pub mod app;
pub mod domain;
pub mod gateway;
pub mod infra;
pub mod shared;
pub mod test_support;

pub use app::console::{DocumentRow, LoginOutcome, MigrationConsole};
pub use app::shell_link::{shell_link, ConsoleEndpoint, ShellEndpoint};
pub use domain::migration::{DocumentTransfer, MigrationReport, TransferContext};
pub use domain::tenants::{
    ComplianceLevel, Credentials, LibraryDocument, OAuthSession, TenantRole, TenantSessions,
    TokenPair,
};
pub use gateway::transport::{HttpTransport, ReqwestTransport};
pub use infra::settings::AppSettings;
pub use shared::error::{AppError, AppResult, ErrorKind};
