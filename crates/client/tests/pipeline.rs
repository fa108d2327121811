// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod support;

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};

use disker_client::api::{CampaignScope, DraftFile, NewDraft};
use disker_client::{ApiError, ApiRequest};
use support::*;

const PING: &str = "/api/v1/ping";
const DRAFTS: &str = "/api/v1/talents/campaign_posts/44/drafts";

#[tokio::test]
async fn offline_makes_no_network_attempt() {
    let server = MockServer::start().await;
    server.script(CAMPAIGNS, vec![(200, campaigns_body())]);
    let h = signed_in(fast_config(&server.url()), "access", Some("refresh"));
    h.connectivity.set_online(false);

    let result = h.client.campaigns(CampaignScope::Active).await;

    assert!(matches!(result, Err(ApiError::Offline)), "got {result:?}");
    assert_eq!(server.total_hits(), 0);
    // Offline never touches the session.
    assert_eq!(h.client.store().access_token().as_deref(), Some("access"));
}

#[tokio::test]
async fn offline_public_request_is_not_retried() {
    let server = MockServer::start().await;
    let h = harness(fast_config(&server.url()));
    h.connectivity.set_online(false);

    let result = h.client.send(ApiRequest::get(PING)).await;

    assert!(matches!(result, Err(ApiError::Offline)));
    assert_eq!(server.total_hits(), 0);
}

#[tokio::test]
async fn deadline_aborts_slow_response() {
    let server = MockServer::start().await;
    server.script(PING, vec![(200, "{}".into())]);
    server.delay(PING, Duration::from_secs(2));
    let mut config = fast_config(&server.url());
    config.max_retries = 0;
    let h = harness(config);

    let started = std::time::Instant::now();
    let result = h.client.send(ApiRequest::get(PING).timeout(Duration::from_millis(100))).await;

    assert!(matches!(result, Err(ApiError::Timeout(d)) if d == Duration::from_millis(100)));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn timeouts_are_retried() {
    let server = MockServer::start().await;
    server.script(PING, vec![(200, "{}".into())]);
    server.delay(PING, Duration::from_millis(500));
    let mut config = fast_config(&server.url());
    config.timeout_ms = 50;
    config.max_retries = 2;
    let h = harness(config);

    let result = h.client.send(ApiRequest::get(PING)).await;

    assert!(matches!(result, Err(ApiError::Timeout(_))));
    assert_eq!(server.hits(PING), 3);
}

#[tokio::test]
async fn connection_refused_is_network_error() -> anyhow::Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    let mut config = fast_config(&format!("http://{addr}"));
    config.max_retries = 1;
    let h = harness(config);

    let result = h.client.send(ApiRequest::get(PING)).await;

    match result {
        Err(ApiError::Network(_)) => {}
        other => panic!("expected network error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn public_budget_is_three_retries() {
    let server = MockServer::start().await;
    server.script(PING, vec![(500, r#"{"meta":{"message":"Internal error"}}"#.into())]);
    let h = harness(fast_config(&server.url()));

    let result = h.client.send(ApiRequest::get(PING)).await;

    match result {
        Err(ApiError::Http { status: 500, message }) => assert_eq!(message, "Internal error"),
        other => panic!("expected 500, got {other:?}"),
    }
    assert_eq!(server.hits(PING), 4);
}

#[tokio::test]
async fn authenticated_budget_is_two_retries() {
    let server = MockServer::start().await;
    server.script(PING, vec![(503, r#"{"meta":{"message":"Service unavailable"}}"#.into())]);
    let h = signed_in(fast_config(&server.url()), "access", Some("refresh"));

    let result = h.client.send_authenticated(ApiRequest::get(PING)).await;

    match result {
        Err(ApiError::Http { status: 503, message }) => assert_eq!(message, "Service unavailable"),
        other => panic!("expected 503, got {other:?}"),
    }
    assert_eq!(server.hits(PING), 3);
    assert_eq!(server.hits(REFRESH), 0);
}

#[tokio::test]
async fn non_json_error_body_is_not_retried() {
    let server = MockServer::start().await;
    server.script(PING, vec![(503, "<html>unavailable</html>".into())]);
    let h = signed_in(fast_config(&server.url()), "access", Some("refresh"));

    let result = h.client.send_authenticated(ApiRequest::get(PING)).await;

    match result {
        Err(ApiError::Decode { status: 503, message }) => {
            assert_eq!(message, "Invalid JSON response");
        }
        other => panic!("expected decode error, got {other:?}"),
    }
    assert_eq!(server.hits(PING), 1);
    assert_eq!(server.hits(REFRESH), 0);
}

#[tokio::test]
async fn non_json_rejection_still_refreshes() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.script(CAMPAIGNS, vec![(401, "Unauthorized".into()), (200, campaigns_body())]);
    server.script(REFRESH, vec![(200, token_body(Some("fresh"), None))]);
    let h = signed_in(fast_config(&server.url()), "stale", Some("refresh"));

    let page = h.client.campaigns(CampaignScope::Active).await?;

    assert_eq!(page.campaigns.len(), 1);
    assert_eq!(server.hits(REFRESH), 1);
    assert_eq!(
        server.authorizations(CAMPAIGNS),
        [Some("Bearer stale".to_owned()), Some("Bearer fresh".to_owned())]
    );
    Ok(())
}

#[tokio::test]
async fn recovers_after_transient_failure() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.script(CAMPAIGNS, vec![(502, "{}".into()), (200, campaigns_body())]);
    let h = signed_in(fast_config(&server.url()), "access", Some("refresh"));

    let page = h.client.campaigns(CampaignScope::Applied).await?;

    assert_eq!(page.campaigns.len(), 1);
    assert_eq!(page.pagination.map(|p| p.total_count), Some(1));
    assert_eq!(server.hits(CAMPAIGNS), 2);
    let queries: Vec<_> = server.requests(CAMPAIGNS).into_iter().map(|r| r.query).collect();
    assert_eq!(queries, [Some("scope=applied".to_owned()), Some("scope=applied".to_owned())]);
    Ok(())
}

#[tokio::test]
async fn forbidden_is_surfaced_without_refresh() {
    let server = MockServer::start().await;
    server.script(CAMPAIGNS, vec![(403, r#"{"meta":{"message":"Not allowed"}}"#.into())]);
    let h = signed_in(fast_config(&server.url()), "access", Some("refresh"));

    let result = h.client.campaigns(CampaignScope::Active).await;

    assert!(matches!(result, Err(ApiError::Http { status: 403, .. })));
    assert_eq!(server.hits(CAMPAIGNS), 1);
    assert_eq!(server.hits(REFRESH), 0);
    assert_eq!(h.client.store().access_token().as_deref(), Some("access"));
}

#[tokio::test]
async fn caller_authorization_is_replaced() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.script(PING, vec![(200, "{}".into())]);
    let h = signed_in(fast_config(&server.url()), "held", Some("refresh"));

    let request = ApiRequest::get(PING).header(AUTHORIZATION, HeaderValue::from_static("Bearer forged"));
    h.client.send_authenticated(request).await?;

    assert_eq!(server.authorizations(PING), [Some("Bearer held".to_owned())]);
    Ok(())
}

#[tokio::test]
async fn no_token_means_no_authorization_header() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.script(PING, vec![(200, "{}".into())]);
    let h = harness(fast_config(&server.url()));

    let request = ApiRequest::get(PING).header(AUTHORIZATION, HeaderValue::from_static("Bearer forged"));
    h.client.send_authenticated(request).await?;

    assert_eq!(server.authorizations(PING), [None]);
    Ok(())
}

#[tokio::test]
async fn public_request_keeps_caller_headers() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.script(PING, vec![(200, "{}".into())]);
    let h = signed_in(fast_config(&server.url()), "held", None);

    let request = ApiRequest::get(PING)
        .header(HeaderName::from_static("x-client"), HeaderValue::from_static("disker-tests"));
    h.client.send(request).await?;

    let seen = server.requests(PING);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].authorization(), None);
    assert_eq!(seen[0].headers.get("x-client").and_then(|v| v.to_str().ok()), Some("disker-tests"));
    assert_eq!(seen[0].headers.get("accept").and_then(|v| v.to_str().ok()), Some("application/json"));
    Ok(())
}

#[tokio::test]
async fn json_body_sets_content_type() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.script(PING, vec![(200, "{}".into())]);
    let h = harness(fast_config(&server.url()));

    let request = ApiRequest::post(PING).json(&serde_json::json!({ "hello": "world" }))?;
    h.client.send(request).await?;

    let seen = server.requests(PING);
    assert_eq!(seen[0].content_type(), "application/json");
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&seen[0].body)?, serde_json::json!({ "hello": "world" }));
    Ok(())
}

#[tokio::test]
async fn multipart_draft_is_rebuilt_for_each_attempt() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let created = serde_json::json!({
        "meta": { "message": "Draft created" },
        "data": { "draft": { "id": 9, "title": "Cut 1", "status": "pending", "file_url": "https://cdn/x.mp4" } }
    });
    server.script(DRAFTS, vec![(500, "{}".into()), (201, created.to_string())]);
    let h = signed_in(fast_config(&server.url()), "access", Some("refresh"));

    let draft = h
        .client
        .create_draft(
            44,
            NewDraft {
                title: "Cut 1".into(),
                url: Some("https://example.com/cut1".into()),
                file: Some(DraftFile {
                    file_name: "cut1.mp4".into(),
                    mime: Some("video/mp4".into()),
                    bytes: Bytes::from_static(b"FRAMEDATA"),
                }),
            },
        )
        .await?;

    assert_eq!(draft.id, 9);
    assert_eq!(draft.status, "pending");
    let attempts = server.requests(DRAFTS);
    assert_eq!(attempts.len(), 2);
    for attempt in &attempts {
        assert!(attempt.content_type().starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&attempt.body);
        assert!(body.contains("name=\"draft[title]\""));
        assert!(body.contains("name=\"draft[url]\""));
        assert!(body.contains("filename=\"cut1.mp4\""));
        assert!(body.contains("FRAMEDATA"));
        assert_eq!(attempt.authorization().as_deref(), Some("Bearer access"));
    }
    Ok(())
}

#[tokio::test]
async fn malformed_success_body_is_decode_error() {
    let server = MockServer::start().await;
    server.script(CAMPAIGNS, vec![(200, "<html>".into())]);
    let h = signed_in(fast_config(&server.url()), "access", Some("refresh"));

    let result = h.client.campaigns(CampaignScope::Active).await;

    assert!(matches!(result, Err(ApiError::Decode { status: 200, .. })));
    assert_eq!(server.hits(CAMPAIGNS), 1);
}
