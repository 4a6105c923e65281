//! Usage: The migration console: single orchestration context owning sessions, rows, and the log.
//!
//! Every operation takes `&mut self`, so exactly one of login, listing, migration, or deletion
//! holds the state at a time.

use crate::app::shell_link::ConsoleEndpoint;
use crate::domain::console_log::ConsoleLog;
use crate::domain::documents::{deletion_sweep, load_library, SweepReport};
use crate::domain::login::LoginBook;
use crate::domain::migration::{DocumentTransfer, MigrationOrchestrator, MigrationReport};
use crate::domain::tenants::{
    ComplianceLevel, Credentials, LibraryDocument, OAuthSession, TenantRole, TenantSessions,
};
use crate::gateway::oauth::authorize::get_auth_grant;
use crate::gateway::oauth::callback_server::{
    capture_redirects, AuthCookieStore, BoundRedirectListener, RedirectCapture,
};
use crate::gateway::oauth::correlator::{
    correlate, Correlation, ResolvedRedirects, EXPECTED_REDIRECTS,
};
use crate::gateway::oauth::endpoints::{resolve_api_base_uri, EndpointConfig};
use crate::gateway::oauth::get_token;
use crate::gateway::oauth::refresh::swap_tokens;
use crate::gateway::transport::HttpTransport;
use crate::infra::settings::AppSettings;
use crate::shared::error::AppResult;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub document: LibraryDocument,
    pub is_selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    /// Fewer redirects than logins; nothing was attributed.
    Waiting { captured: usize },
}

pub struct MigrationConsole<T> {
    transport: T,
    settings: AppSettings,
    endpoint_cfg: EndpointConfig,
    log: ConsoleLog,
    logins: LoginBook,
    sessions: Option<TenantSessions>,
    rows: Vec<DocumentRow>,
    ready_for_download: bool,
}

impl<T: HttpTransport> MigrationConsole<T> {
    pub fn new(transport: T, settings: AppSettings) -> Self {
        let endpoint_cfg = settings.endpoint_config();
        Self {
            transport,
            settings,
            endpoint_cfg,
            log: ConsoleLog::new(),
            logins: LoginBook::new(),
            sessions: None,
            rows: Vec::new(),
            ready_for_download: false,
        }
    }

    pub fn log(&self) -> &ConsoleLog {
        &self.log
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn sessions(&self) -> Option<&TenantSessions> {
        self.sessions.as_ref()
    }

    pub fn logins(&self) -> &LoginBook {
        &self.logins
    }

    pub fn rows(&self) -> &[DocumentRow] {
        &self.rows
    }

    pub fn ready_for_download(&self) -> bool {
        self.ready_for_download
    }

    /// Records the login and returns the authorize URL for the shell to open.
    pub fn begin_login(
        &mut self,
        role: TenantRole,
        credentials: Credentials,
        compliance_level: ComplianceLevel,
        shard: &str,
    ) -> AppResult<String> {
        self.logins.begin_login(
            role,
            credentials,
            compliance_level,
            shard,
            &self.endpoint_cfg,
            &self.settings.redirect_uri,
        )
    }

    async fn login_role(
        &self,
        resolved: &ResolvedRedirects,
        role: TenantRole,
    ) -> AppResult<OAuthSession> {
        let pending = self
            .logins
            .pending(role)
            .cloned()
            .ok_or_else(|| format!("SEC_INVALID_INPUT: {role} login was never initiated"))?;
        let grant = get_auth_grant(resolved.for_role(role), &pending.initial_oauth_state)?;
        let token_pair = get_token(
            &self.transport,
            pending.compliance_level,
            &pending.shard,
            &self.endpoint_cfg,
            &pending.credentials.client_id,
            &pending.credentials.client_secret,
            &grant,
            &self.settings.redirect_uri,
        )
        .await?;
        Ok(pending.into_session(token_pair))
    }

    /// Attributes the captured redirects and logs both tenants in (source first).
    /// Auth and security failures are logged and returned; nothing is retried.
    pub async fn complete_login(&mut self, redirect_urls: Vec<String>) -> AppResult<LoginOutcome> {
        let attribution = self.logins.attribution(redirect_urls);
        let resolved = match correlate(&attribution) {
            Ok(Correlation::Resolved(resolved)) => resolved,
            Ok(Correlation::Incomplete { captured }) => {
                self.log.log(format!(
                    "Waiting for both accounts to finish logging in ({captured} of 2 redirects received)."
                ));
                return Ok(LoginOutcome::Waiting { captured });
            }
            Err(err) => {
                self.log.log(format!("Login failed: {}", err.message()));
                return Err(err);
            }
        };

        let mut logged_in = Vec::with_capacity(TenantRole::ALL.len());
        for role in TenantRole::ALL {
            match self.login_role(&resolved, role).await {
                Ok(session) => {
                    self.log.log(format!(
                        "Logged in to the {role} account ({}).",
                        session.compliance_level
                    ));
                    logged_in.push(session);
                }
                Err(err) => {
                    tracing::warn!(role = %role, code = err.code(), "tenant login failed");
                    self.log
                        .log(format!("Login to the {role} account failed: {}", err.message()));
                    return Err(err);
                }
            }
        }

        let mut sessions = logged_in.into_iter();
        if let (Some(source), Some(dest)) = (sessions.next(), sessions.next()) {
            self.sessions = Some(TenantSessions { source, dest });
        }
        Ok(LoginOutcome::LoggedIn)
    }

    /// Announces console init over the shell link and logs in with whatever the shell delivers.
    pub async fn init(&mut self, link: ConsoleEndpoint) -> AppResult<LoginOutcome> {
        let redirects = link.init().await?;
        self.complete_login(redirects).await
    }

    /// Serves the loopback redirect URI until both logins redirect back, then logs in.
    /// Each wait for a redirect is bounded by `callback_timeout_seconds`.
    pub async fn capture_and_login<C: AuthCookieStore>(
        &mut self,
        listener: &mut BoundRedirectListener,
        capture: &mut RedirectCapture<C>,
    ) -> AppResult<LoginOutcome> {
        let timeout = self.settings.callback_timeout();
        if let Err(err) = capture_redirects(listener, capture, EXPECTED_REDIRECTS, timeout).await {
            self.log.log(format!("Login failed: {}", err.message()));
            return Err(err);
        }
        self.complete_login(capture.redirects().to_vec()).await
    }

    fn require_sessions(&self) -> AppResult<&TenantSessions> {
        self.sessions
            .as_ref()
            .ok_or_else(|| "AUTH_ERROR: both accounts must be logged in first".to_string().into())
    }

    /// Keeps the source token fresh before a source-only operation.
    async fn refresh_source(&mut self) -> AppResult<()> {
        let policy = self.settings.migration_refresh_policy();
        let sessions = self
            .sessions
            .as_mut()
            .ok_or_else(|| "AUTH_ERROR: both accounts must be logged in first".to_string())?;
        let pair = swap_tokens(
            &self.transport,
            &self.endpoint_cfg,
            &sessions.source,
            policy,
            Instant::now(),
        )
        .await?;
        sessions.source.token_pair = pair;
        Ok(())
    }

    async fn source_api_base(&self) -> AppResult<String> {
        let source = &self.require_sessions()?.source;
        resolve_api_base_uri(
            &self.transport,
            source.compliance_level,
            &self.endpoint_cfg,
            source.access_token(),
        )
        .await
    }

    fn rebuild_rows(&mut self, documents: Vec<LibraryDocument>) {
        self.rows = documents
            .into_iter()
            .map(|document| DocumentRow {
                document,
                is_selected: false,
            })
            .collect();
        self.ready_for_download = true;
    }

    /// Rebuilds the document rows from a fresh listing. On failure the rows are cleared.
    pub async fn get_document_list(&mut self, owner_filter: &str) -> AppResult<usize> {
        let result = self.fetch_documents(owner_filter).await;
        match result {
            Ok(documents) => {
                let count = documents.len();
                self.rebuild_rows(documents);
                Ok(count)
            }
            Err(err) => {
                self.rows.clear();
                self.ready_for_download = false;
                self.log
                    .log(format!("Loading documents failed: {}", err.message()));
                Err(err)
            }
        }
    }

    async fn fetch_documents(&mut self, owner_filter: &str) -> AppResult<Vec<LibraryDocument>> {
        self.refresh_source().await?;
        let api_base = self.source_api_base().await?;
        let access_token = self.require_sessions()?.source.access_token().to_string();
        load_library(
            &self.transport,
            &api_base,
            &access_token,
            owner_filter,
            self.settings.dev_page_limit,
            &mut self.log,
        )
        .await
    }

    /// Returns false when no row carries `document_id`.
    pub fn set_selected(&mut self, document_id: &str, is_selected: bool) -> bool {
        match self.rows.iter_mut().find(|row| row.document.id == document_id) {
            Some(row) => {
                row.is_selected = is_selected;
                true
            }
            None => false,
        }
    }

    /// Selected ids in display order; this order is the migration order.
    pub fn selected_document_ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|row| row.is_selected)
            .map(|row| row.document.id.clone())
            .collect()
    }

    pub async fn migrate_selected(
        &mut self,
        transfer: &dyn DocumentTransfer,
    ) -> AppResult<MigrationReport> {
        let selection = self.selected_document_ids();
        let policy = self.settings.migration_refresh_policy();
        let sessions = self
            .sessions
            .as_mut()
            .ok_or_else(|| "AUTH_ERROR: both accounts must be logged in first".to_string())?;

        tracing::info!(documents = selection.len(), "migration started");
        let orchestrator =
            MigrationOrchestrator::new(&self.transport, &self.endpoint_cfg, transfer, policy);
        let report = orchestrator.run(sessions, &selection, &mut self.log).await?;
        tracing::info!(
            migrated = report.migrated,
            failed_attempts = report.failed_attempts,
            "migration finished"
        );
        Ok(report)
    }

    /// Deletes the selected documents from the source account, refreshing the rows after each.
    pub async fn delete_selected(&mut self) -> AppResult<SweepReport> {
        let selection = self.selected_document_ids();
        self.refresh_source().await?;
        let api_base = self.source_api_base().await?;
        let access_token = self.require_sessions()?.source.access_token().to_string();

        let report = deletion_sweep(
            &self.transport,
            &api_base,
            &access_token,
            &selection,
            self.settings.dev_page_limit,
            &mut self.log,
        )
        .await;
        if let Some(documents) = report.listing.clone() {
            self.rebuild_rows(documents);
        }
        Ok(report)
    }

    /// Ends the app session: sessions, logins, and rows are dropped. The log is kept.
    pub fn reset(&mut self) {
        self.logins.reset();
        self.sessions = None;
        self.rows.clear();
        self.ready_for_download = false;
        self.log.log("Session reset.");
    }
}
