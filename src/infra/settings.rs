//! Usage: Persisted migrator settings (`settings.json` inside a caller-supplied directory).

use crate::gateway::oauth::endpoints::EndpointConfig;
use crate::gateway::oauth::refresh::RefreshPolicy;
use crate::shared::error::AppResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_PROXY_ORIGIN: &str = "http://localhost:4200";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:43117/oauth/callback";
// Nominal lifetime of 5 minutes with a 1/50 * 5 margin: refresh once 30 seconds have passed.
pub const DEFAULT_MIGRATION_TOKEN_LIFETIME_SECONDS: u32 = 300;
pub const DEFAULT_MIGRATION_REFRESH_MARGIN: f64 = 0.1;
pub const DEFAULT_CALLBACK_TIMEOUT_SECONDS: u32 = 300;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECONDS: u32 = 10;
const MAX_MIGRATION_TOKEN_LIFETIME_SECONDS: u32 = 24 * 60 * 60;
const MAX_CALLBACK_TIMEOUT_SECONDS: u32 = 60 * 60;
const MAX_HTTP_CONNECT_TIMEOUT_SECONDS: u32 = 5 * 60;
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub schema_version: u32,
    pub in_development: bool,
    pub use_proxy: bool,
    pub proxy_origin: String,
    pub redirect_uri: String,
    // None walks every page of the source library.
    pub dev_page_limit: Option<u32>,
    pub migration_token_lifetime_seconds: u32,
    pub migration_refresh_margin: f64,
    pub callback_timeout_seconds: u32,
    pub http_connect_timeout_seconds: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            in_development: true,
            use_proxy: false,
            proxy_origin: DEFAULT_PROXY_ORIGIN.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            dev_page_limit: None,
            migration_token_lifetime_seconds: DEFAULT_MIGRATION_TOKEN_LIFETIME_SECONDS,
            migration_refresh_margin: DEFAULT_MIGRATION_REFRESH_MARGIN,
            callback_timeout_seconds: DEFAULT_CALLBACK_TIMEOUT_SECONDS,
            http_connect_timeout_seconds: DEFAULT_HTTP_CONNECT_TIMEOUT_SECONDS,
        }
    }
}

impl AppSettings {
    pub fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig {
            in_development: self.in_development,
            use_proxy: self.use_proxy,
            proxy_origin: self.proxy_origin.clone(),
        }
    }

    pub fn migration_refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy::new(
            Duration::from_secs(u64::from(self.migration_token_lifetime_seconds)),
            self.migration_refresh_margin,
        )
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.callback_timeout_seconds))
    }

    pub fn http_connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.http_connect_timeout_seconds))
    }
}

fn is_valid_margin(margin: f64) -> bool {
    margin.is_finite() && margin > 0.0 && margin <= 1.0
}

fn sanitize_dev_page_limit(settings: &mut AppSettings) -> bool {
    if settings.dev_page_limit == Some(0) {
        settings.dev_page_limit = None;
        return true;
    }
    false
}

fn sanitize_refresh_policy(settings: &mut AppSettings) -> bool {
    let mut changed = false;
    if settings.migration_token_lifetime_seconds == 0 {
        settings.migration_token_lifetime_seconds = DEFAULT_MIGRATION_TOKEN_LIFETIME_SECONDS;
        changed = true;
    }
    if settings.migration_token_lifetime_seconds > MAX_MIGRATION_TOKEN_LIFETIME_SECONDS {
        settings.migration_token_lifetime_seconds = MAX_MIGRATION_TOKEN_LIFETIME_SECONDS;
        changed = true;
    }
    if !is_valid_margin(settings.migration_refresh_margin) {
        settings.migration_refresh_margin = DEFAULT_MIGRATION_REFRESH_MARGIN;
        changed = true;
    }
    changed
}

fn sanitize_timeouts(settings: &mut AppSettings) -> bool {
    let mut changed = false;
    if settings.callback_timeout_seconds == 0 {
        settings.callback_timeout_seconds = DEFAULT_CALLBACK_TIMEOUT_SECONDS;
        changed = true;
    }
    if settings.callback_timeout_seconds > MAX_CALLBACK_TIMEOUT_SECONDS {
        settings.callback_timeout_seconds = MAX_CALLBACK_TIMEOUT_SECONDS;
        changed = true;
    }
    if settings.http_connect_timeout_seconds == 0 {
        settings.http_connect_timeout_seconds = DEFAULT_HTTP_CONNECT_TIMEOUT_SECONDS;
        changed = true;
    }
    if settings.http_connect_timeout_seconds > MAX_HTTP_CONNECT_TIMEOUT_SECONDS {
        settings.http_connect_timeout_seconds = MAX_HTTP_CONNECT_TIMEOUT_SECONDS;
        changed = true;
    }
    changed
}

fn sanitize_urls(settings: &mut AppSettings) -> bool {
    let mut changed = false;
    if settings.proxy_origin.trim().is_empty() {
        settings.proxy_origin = DEFAULT_PROXY_ORIGIN.to_string();
        changed = true;
    }
    if settings.redirect_uri.trim().is_empty() {
        settings.redirect_uri = DEFAULT_REDIRECT_URI.to_string();
        changed = true;
    }
    changed
}

fn stamp_schema_version(settings: &mut AppSettings) -> bool {
    if settings.schema_version == SCHEMA_VERSION {
        return false;
    }
    settings.schema_version = SCHEMA_VERSION;
    true
}

pub fn settings_path(dir: &Path) -> PathBuf {
    dir.join(SETTINGS_FILE_NAME)
}

fn parse_settings_json(content: &str) -> AppResult<AppSettings> {
    serde_json::from_str(content)
        .map_err(|e| format!("failed to parse settings.json: {e}").into())
}

pub fn read(dir: &Path) -> AppResult<AppSettings> {
    let path = settings_path(dir);

    if !path.exists() {
        let settings = AppSettings::default();
        // Best-effort: create default settings.json on first read so it is discoverable/editable.
        if let Err(err) = write(dir, &settings) {
            tracing::warn!("failed to create default settings.json: {}", err);
        }
        return Ok(settings);
    }

    let content =
        std::fs::read_to_string(&path).map_err(|e| format!("failed to read settings: {e}"))?;
    let mut settings = parse_settings_json(&content)?;

    let mut repaired = false;
    repaired |= stamp_schema_version(&mut settings);
    repaired |= sanitize_dev_page_limit(&mut settings);
    repaired |= sanitize_refresh_policy(&mut settings);
    repaired |= sanitize_timeouts(&mut settings);
    repaired |= sanitize_urls(&mut settings);
    if repaired {
        // Best-effort: persist repaired values while keeping read semantics.
        if let Err(err) = write(dir, &settings) {
            tracing::warn!("failed to persist repaired settings.json: {}", err);
        }
    }

    Ok(settings)
}

fn validate(settings: &AppSettings) -> AppResult<()> {
    if settings.dev_page_limit == Some(0) {
        return Err("SEC_INVALID_INPUT: dev_page_limit must be >= 1 when set".into());
    }
    if settings.migration_token_lifetime_seconds == 0 {
        return Err("SEC_INVALID_INPUT: migration_token_lifetime_seconds must be >= 1".into());
    }
    if settings.migration_token_lifetime_seconds > MAX_MIGRATION_TOKEN_LIFETIME_SECONDS {
        return Err(format!(
            "SEC_INVALID_INPUT: migration_token_lifetime_seconds must be <= {MAX_MIGRATION_TOKEN_LIFETIME_SECONDS}"
        )
        .into());
    }
    if !is_valid_margin(settings.migration_refresh_margin) {
        return Err("SEC_INVALID_INPUT: migration_refresh_margin must be in (0, 1]".into());
    }
    if settings.callback_timeout_seconds == 0
        || settings.callback_timeout_seconds > MAX_CALLBACK_TIMEOUT_SECONDS
    {
        return Err(format!(
            "SEC_INVALID_INPUT: callback_timeout_seconds must be between 1 and {MAX_CALLBACK_TIMEOUT_SECONDS}"
        )
        .into());
    }
    if settings.http_connect_timeout_seconds == 0
        || settings.http_connect_timeout_seconds > MAX_HTTP_CONNECT_TIMEOUT_SECONDS
    {
        return Err(format!(
            "SEC_INVALID_INPUT: http_connect_timeout_seconds must be between 1 and {MAX_HTTP_CONNECT_TIMEOUT_SECONDS}"
        )
        .into());
    }
    if settings.redirect_uri.trim().is_empty() {
        return Err("SEC_INVALID_INPUT: redirect_uri is required".into());
    }
    if settings.use_proxy && settings.proxy_origin.trim().is_empty() {
        return Err("SEC_INVALID_INPUT: proxy_origin is required when use_proxy is on".into());
    }
    Ok(())
}

pub fn write(dir: &Path, settings: &AppSettings) -> AppResult<AppSettings> {
    validate(settings)?;

    std::fs::create_dir_all(dir).map_err(|e| format!("failed to create settings dir: {e}"))?;
    let path = settings_path(dir);
    let tmp_path = path.with_file_name("settings.json.tmp");
    let backup_path = path.with_file_name("settings.json.bak");

    let content = serde_json::to_vec_pretty(settings)
        .map_err(|e| format!("failed to serialize settings: {e}"))?;

    std::fs::write(&tmp_path, content)
        .map_err(|e| format!("failed to write temp settings file: {e}"))?;

    if backup_path.exists() {
        let _ = std::fs::remove_file(&backup_path);
    }

    if path.exists() {
        std::fs::rename(&path, &backup_path)
            .map_err(|e| format!("failed to create settings backup: {e}"))?;
    }

    if let Err(e) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::rename(&backup_path, &path);
        return Err(format!("failed to finalize settings: {e}").into());
    }

    if backup_path.exists() {
        let _ = std::fs::remove_file(&backup_path);
    }

    Ok(settings.clone())
}
