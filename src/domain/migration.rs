//! Usage: Migration orchestrator: drive selected documents through the transfer collaborator.
//!
//! Per document: refresh both tenants' tokens (source, then dest), attempt the transfer, and
//! either advance or retry the same document. There is no retry ceiling and no delay between
//! attempts; the loop only ends when every selected document has been transferred.

use crate::domain::console_log::ConsoleLog;
use crate::domain::tenants::{OAuthSession, TenantRole, TenantSessions};
use crate::gateway::oauth::endpoints::{pdf_library_base_uri, EndpointConfig};
use crate::gateway::oauth::refresh::{swap_tokens, RefreshPolicy};
use crate::gateway::transport::{BoxFuture, HttpTransport};
use crate::shared::error::AppResult;
use std::time::Instant;

pub const SEPARATOR: &str =
    "========================================================================";

/// What the transfer collaborator may see: both live sessions as of the latest refresh.
#[derive(Debug, Clone, Copy)]
pub struct TransferContext<'a> {
    pub source: &'a OAuthSession,
    pub dest: &'a OAuthSession,
    pub endpoint_cfg: &'a EndpointConfig,
}

impl TransferContext<'_> {
    /// Where the transfer downloads the source document's PDF from.
    pub fn pdf_library_base(&self) -> String {
        pdf_library_base_uri(self.endpoint_cfg)
    }
}

/// Download-then-reupload of one library document, treated as an opaque unit of work.
/// Any `Err` means "retry this document".
pub trait DocumentTransfer: Send + Sync {
    fn migrate<'a>(
        &'a self,
        ctx: TransferContext<'a>,
        document_id: &'a str,
    ) -> BoxFuture<'a, AppResult<()>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: usize,
    pub attempts: usize,
    pub failed_attempts: usize,
}

pub struct MigrationOrchestrator<'a> {
    transport: &'a dyn HttpTransport,
    endpoint_cfg: &'a EndpointConfig,
    transfer: &'a dyn DocumentTransfer,
    policy: RefreshPolicy,
}

impl<'a> MigrationOrchestrator<'a> {
    pub fn new(
        transport: &'a dyn HttpTransport,
        endpoint_cfg: &'a EndpointConfig,
        transfer: &'a dyn DocumentTransfer,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            transport,
            endpoint_cfg,
            transfer,
            policy,
        }
    }

    async fn refresh_tokens(&self, sessions: &mut TenantSessions) -> AppResult<()> {
        for role in TenantRole::ALL {
            let session = sessions.get_mut(role);
            let pair = swap_tokens(
                self.transport,
                self.endpoint_cfg,
                session,
                self.policy,
                Instant::now(),
            )
            .await
            .map_err(|e| {
                tracing::error!(role = %role, "token refresh failed during migration: {}", e);
                e
            })?;
            session.token_pair = pair;
        }
        Ok(())
    }

    /// Migrates `selection` in order. Transfer failures never escape; a failed token refresh
    /// does, because continuing would mean calling the tenant with a stale token.
    pub async fn run(
        &self,
        sessions: &mut TenantSessions,
        selection: &[String],
        log: &mut ConsoleLog,
    ) -> AppResult<MigrationReport> {
        let total = selection.len();
        let mut report = MigrationReport::default();
        let mut i = 0;

        while i < total {
            let k = i + 1;
            if let Err(err) = self.refresh_tokens(sessions).await {
                log.log(format!(
                    "Token refresh failed before migrating document {k} of the {total} documents: {err}"
                ));
                return Err(err);
            }

            log.log(format!(
                "Beginning migration of document {k} of the {total} documents."
            ));
            report.attempts += 1;

            let ctx = TransferContext {
                source: &sessions.source,
                dest: &sessions.dest,
                endpoint_cfg: self.endpoint_cfg,
            };
            match self.transfer.migrate(ctx, &selection[i]).await {
                Ok(()) => {
                    log.log(format!(
                        "Document {k} of the {total} documents has been sucessfully migrated."
                    ));
                    log.log(SEPARATOR);
                    report.migrated += 1;
                    i += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        document_id = %selection[i],
                        attempt = report.attempts,
                        "document transfer failed; retrying: {}",
                        err
                    );
                    log.log(format!(
                        "Migration of document {k} of the {total} failed. Retrying migration of document {k}."
                    ));
                    report.failed_attempts += 1;
                }
            }
        }

        Ok(report)
    }
}
