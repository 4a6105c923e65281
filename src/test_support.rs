//! Usage: Public test helpers for integration tests (scripted HTTP transport, scripted transfer).

use crate::domain::migration::{DocumentTransfer, TransferContext};
use crate::domain::tenants::{ComplianceLevel, Credentials, OAuthSession, TenantRole, TokenPair};
use crate::gateway::transport::{BoxFuture, HttpRequestConfig, HttpResponse, HttpTransport};
use crate::shared::error::{AppError, AppResult};
use crate::shared::mutex_ext::MutexExt;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Instant;

/// Replays queued responses in order and records every request it receives.
/// An exhausted script answers with a `NETWORK_ERROR`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<AppResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequestConfig>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, body: impl Into<String>) -> &Self {
        self.responses
            .lock_or_recover()
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push_response(status, body.to_string())
    }

    pub fn push_error(&self, err: AppError) -> &Self {
        self.responses.lock_or_recover().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequestConfig> {
        self.requests.lock_or_recover().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock_or_recover().len()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock_or_recover().len()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send<'a>(&'a self, config: HttpRequestConfig) -> BoxFuture<'a, AppResult<HttpResponse>> {
        Box::pin(async move {
            let url = config.url.clone();
            self.requests.lock_or_recover().push(config);
            self.responses
                .lock_or_recover()
                .pop_front()
                .unwrap_or_else(|| Err(format!("NETWORK_ERROR: no scripted response for {url}").into()))
        })
    }
}

/// One call to [`ScriptedTransfer::migrate`], with the access tokens it was handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferAttempt {
    pub document_id: String,
    pub source_access_token: String,
    pub dest_access_token: String,
    pub pdf_library_base: String,
}

/// Fails each document a configured number of times, then succeeds.
#[derive(Debug, Default)]
pub struct ScriptedTransfer {
    failures: Mutex<HashMap<String, usize>>,
    attempts: Mutex<Vec<TransferAttempt>>,
}

impl ScriptedTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_times(self, document_id: &str, times: usize) -> Self {
        self.failures
            .lock_or_recover()
            .insert(document_id.to_string(), times);
        self
    }

    pub fn attempts(&self) -> Vec<TransferAttempt> {
        self.attempts.lock_or_recover().clone()
    }
}

impl DocumentTransfer for ScriptedTransfer {
    fn migrate<'a>(
        &'a self,
        ctx: TransferContext<'a>,
        document_id: &'a str,
    ) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            self.attempts.lock_or_recover().push(TransferAttempt {
                document_id: document_id.to_string(),
                source_access_token: ctx.source.access_token().to_string(),
                dest_access_token: ctx.dest.access_token().to_string(),
                pdf_library_base: ctx.pdf_library_base(),
            });
            let mut failures = self.failures.lock_or_recover();
            match failures.get_mut(document_id) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    Err(format!("TRANSFER_ERROR: scripted failure for {document_id}").into())
                }
                _ => Ok(()),
            }
        })
    }
}

/// A logged-in session stamped with the given refresh instant.
pub fn session(
    role: TenantRole,
    compliance_level: ComplianceLevel,
    access_token: &str,
    refresh_token: &str,
    time_of_last_refresh: Instant,
) -> OAuthSession {
    OAuthSession {
        role,
        credentials: Credentials {
            client_id: format!("{role}-client"),
            client_secret: format!("{role}-secret"),
            login_email: format!("{role}@example.com"),
        },
        compliance_level,
        shard: "na1".to_string(),
        initial_oauth_state: crate::gateway::oauth::authorize::build_oauth_state(),
        token_pair: TokenPair {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            time_of_last_refresh,
        },
    }
}
