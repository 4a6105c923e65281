#![allow(dead_code)]

use serde_json::{json, Value};
use template_migrator_lib::AppSettings;

/// Settings that route every realm through a local origin (a wiremock server in tests).
pub fn proxied_settings(origin: &str) -> AppSettings {
    AppSettings {
        in_development: true,
        use_proxy: true,
        proxy_origin: origin.to_string(),
        ..Default::default()
    }
}

/// `count` documents named `{prefix}-{n}`; every `owner_every`-th one belongs to `owner`.
pub fn documents(prefix: &str, count: usize, owner: &str, owner_every: usize) -> Vec<Value> {
    (1..=count)
        .map(|n| {
            let owner_email = if owner_every > 0 && n % owner_every == 0 {
                owner.to_string()
            } else {
                format!("other{n}@example.com")
            };
            json!({
                "id": format!("{prefix}-{n}"),
                "name": format!("Template {prefix} {n}"),
                "ownerEmail": owner_email,
                "status": "ACTIVE"
            })
        })
        .collect()
}

pub fn page_body(documents: Vec<Value>, next_cursor: Option<&str>) -> Value {
    match next_cursor {
        Some(cursor) => json!({ "libraryDocumentList": documents, "page": { "nextCursor": cursor } }),
        None => json!({ "libraryDocumentList": documents, "page": {} }),
    }
}

pub fn token_body(access_token: &str, refresh_token: Option<&str>) -> Value {
    match refresh_token {
        Some(refresh) => json!({
            "access_token": access_token,
            "refresh_token": refresh,
            "token_type": "Bearer",
            "expires_in": 3600
        }),
        None => json!({ "access_token": access_token, "token_type": "Bearer", "expires_in": 3600 }),
    }
}

pub fn count_entries(entries: &[String], prefix: &str) -> usize {
    entries.iter().filter(|e| e.starts_with(prefix)).count()
}
