mod support;

use std::time::{Duration, Instant};
use template_migrator_lib::gateway::oauth::refresh::{swap_tokens, RefreshPolicy};
use template_migrator_lib::gateway::transport::RequestBody;
use template_migrator_lib::test_support::{session, ScriptedTransport};
use template_migrator_lib::{AppSettings, ComplianceLevel, TenantRole};

fn policy() -> RefreshPolicy {
    RefreshPolicy::new(Duration::from_secs(300), 0.1)
}

#[tokio::test]
async fn fresh_pair_is_returned_without_a_network_call() {
    let last = Instant::now();
    let current = session(TenantRole::Source, ComplianceLevel::Commercial, "at", "rt", last);
    let transport = ScriptedTransport::new();
    let cfg = AppSettings::default().endpoint_config();

    let pair = swap_tokens(&transport, &cfg, &current, policy(), last + Duration::from_secs(29))
        .await
        .expect("swap");

    assert_eq!(pair, current.token_pair);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn due_pair_is_replaced_with_a_strictly_newer_one() {
    let last = Instant::now();
    let current = session(TenantRole::Dest, ComplianceLevel::GovProd, "at", "rt", last);
    let transport = ScriptedTransport::new();
    transport.push_json(200, support::token_body("at2", Some("rt2")));
    let cfg = template_migrator_lib::gateway::oauth::endpoints::EndpointConfig {
        in_development: false,
        use_proxy: false,
        proxy_origin: String::new(),
    };

    let now = last + Duration::from_secs(30);
    let pair = swap_tokens(&transport, &cfg, &current, policy(), now)
        .await
        .expect("swap");

    assert_eq!(pair.access_token, "at2");
    assert_eq!(pair.refresh_token, "rt2");
    assert!(pair.time_of_last_refresh > current.token_pair.time_of_last_refresh);
    assert_eq!(pair.time_of_last_refresh, now);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url,
        "https://secure.na1.adobesign.us/api/gateway/adobesignauthservice/api/v1/token"
    );
    let Some(RequestBody::Form(fields)) = &requests[0].data else {
        panic!("refresh must be a form post");
    };
    assert!(fields.contains(&("grant_type".to_string(), "refresh_token".to_string())));
    assert!(fields.contains(&("refresh_token".to_string(), "rt".to_string())));
    assert!(fields.contains(&("client_id".to_string(), "dest-client".to_string())));
}

#[tokio::test]
async fn clock_reading_equal_to_last_refresh_still_moves_forward() {
    let last = Instant::now();
    let current = session(TenantRole::Source, ComplianceLevel::Commercial, "at", "rt", last);
    let transport = ScriptedTransport::new();
    transport.push_json(200, support::token_body("at2", None));
    let cfg = AppSettings::default().endpoint_config();
    let always = RefreshPolicy::new(Duration::from_secs(300), 0.0);

    let pair = swap_tokens(&transport, &cfg, &current, always, last)
        .await
        .expect("swap");
    assert!(pair.time_of_last_refresh > last);
    assert_eq!(pair.refresh_token, "rt");
}

#[tokio::test]
async fn rejected_refresh_is_an_auth_error() {
    let last = Instant::now();
    let current = session(TenantRole::Source, ComplianceLevel::Commercial, "at", "rt", last);
    let transport = ScriptedTransport::new();
    transport.push_json(
        401,
        serde_json::json!({ "code": "INVALID_REFRESH_TOKEN", "message": "token revoked" }),
    );
    let cfg = AppSettings::default().endpoint_config();

    let err = swap_tokens(&transport, &cfg, &current, policy(), last + Duration::from_secs(60))
        .await
        .expect_err("must fail");
    assert_eq!(err.code(), "AUTH_ERROR");
    assert!(err.message().contains("INVALID_REFRESH_TOKEN"));
}
