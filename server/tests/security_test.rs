// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Security tests for the contact form endpoint.
//!
//! These tests simulate floods and injection attempts against the full
//! router and check that the endpoint contains them.

mod harness;

use axum::http::StatusCode;
use harness::fixture::{body_json, Fixture, VALID_BODY};
use harness::generators;
use harness::metrics::FloodMetrics;
use serde_json::json;

#[tokio::test]
async fn test_single_ip_flood_is_capped() {
    let fixture = Fixture::new(json!({"limits": {"rateLimitPerHour": 5}}));

    let mut metrics = FloodMetrics::new();
    metrics.start();
    for _ in 0..40 {
        let response = fixture.post_from("10.9.9.9", VALID_BODY).await;
        metrics.record(response.status(), "10.9.9.9");
    }
    metrics.finish();
    println!("{metrics}");

    assert_eq!(metrics.count(StatusCode::OK), 5);
    assert_eq!(metrics.count(StatusCode::TOO_MANY_REQUESTS), 35);
    assert_eq!(fixture.mail_count(), 5);
}

#[tokio::test]
async fn test_distributed_submitters_are_not_blocked() {
    let fixture = Fixture::new(json!({"limits": {"rateLimitPerHour": 1}}));
    let ips = generators::generate_ips(30);

    let mut metrics = FloodMetrics::new();
    metrics.start();
    for ip in &ips {
        let ip = ip.to_string();
        let response = fixture.post_from(&ip, VALID_BODY).await;
        metrics.record(response.status(), &ip);
    }
    metrics.finish();

    assert_eq!(metrics.count(StatusCode::OK), ips.len());
    assert_eq!(metrics.block_rate(), 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_burst_cannot_exceed_allowance() {
    let fixture = std::sync::Arc::new(Fixture::new(json!({"limits": {"rateLimitPerHour": 3}})));

    let handles: Vec<_> = (0..24)
        .map(|_| {
            let fixture = fixture.clone();
            tokio::spawn(async move { fixture.post_from("10.1.1.1", VALID_BODY).await.status() })
        })
        .collect();

    let mut metrics = FloodMetrics::new();
    for handle in handles {
        metrics.record(handle.await.unwrap(), "10.1.1.1");
    }

    assert_eq!(metrics.max_accepted_per_ip(), 3);
    assert_eq!(metrics.count(StatusCode::TOO_MANY_REQUESTS), 21);
}

#[tokio::test]
async fn test_invalid_submissions_consume_allowance() {
    let fixture = Fixture::new(json!({"limits": {"rateLimitPerHour": 3}}));

    for _ in 0..3 {
        let response = fixture.post_from("10.2.2.2", "name=&email=&message=").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    let response = fixture.post_from("10.2.2.2", VALID_BODY).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_header_injection_in_email_is_rejected() {
    let fixture = Fixture::new(json!({"limits": {"rateLimitPerHour": 100}}));

    for email in generators::header_injection_emails() {
        let body = generators::form_body("Jo", email, "", "Hello there, this is a test.");
        let response = fixture.post(&body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{email:?}");
        assert_eq!(
            body_json(response).await["errors"]["email"],
            "Please enter a valid email address."
        );
    }
    assert_eq!(fixture.mail_count(), 0);
}

#[tokio::test]
async fn test_header_injection_in_name_is_rejected() {
    let fixture = Fixture::new(json!({"limits": {"rateLimitPerHour": 100}}));

    for name in generators::header_injection_names() {
        let body = generators::form_body(name, "jo@example.com", "", "Hello there, this is a test.");
        let response = fixture.post(&body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{name:?}");
    }
    assert_eq!(fixture.mail_count(), 0);
}

#[tokio::test]
async fn test_configured_header_values_cannot_break_lines() {
    let fixture = Fixture::new(json!({
        "mail": {
            "to": {"team@example.com": "Team\r\nBcc: leak@example.com"},
            "from": "site@example.com\nX-Injected: 1"
        }
    }));

    assert_eq!(fixture.post(VALID_BODY).await.status(), StatusCode::OK);
    let record = &fixture.mail_records()[0];
    let headers = record.split("\n\nHeaders:\n").nth(1).unwrap();
    let lines: Vec<&str> = headers.lines().collect();
    assert_eq!(lines.len(), 5, "{headers}");
    assert_eq!(lines[2], "From: site@example.com X-Injected: 1");
    assert_eq!(lines[3], "To: Team Bcc: leak@example.com <team@example.com>");
}

#[tokio::test]
async fn test_script_in_configured_texts_is_stripped() {
    let fixture = Fixture::new(json!({
        "limits": {"rateLimitPerHour": 100},
        "messages": {
            "successHtml": "<p onclick=\"steal()\">Sent</p><script>steal()</script>",
            "badRequestHtml": "<style>*{}</style><b>Fix</b> it<iframe src=x></iframe>",
            "fieldErrors": {"nameRequired": "<em>Name</em><!-- x --> <img src=x onerror=alert(1)>needed"}
        }
    }));

    let body = body_json(fixture.post(VALID_BODY).await).await;
    assert_eq!(body["message"], "<p>Sent</p>");

    let body = body_json(fixture.post("name=&email=jo%40example.com&message=Hello+there+friend").await).await;
    assert_eq!(body["message"], "<b>Fix</b> it");
    assert_eq!(body["errors"]["name"], "<em>Name</em> needed");
}

#[tokio::test]
async fn test_script_payloads_in_message_are_not_echoed() {
    let fixture = Fixture::new(json!({"limits": {"rateLimitPerHour": 100}}));

    for payload in generators::script_payloads() {
        let message = format!("{payload} hello there");
        let body = generators::form_body("Jo", "jo@example.com", "", &message);
        let response = fixture.post(&body).await;
        assert_eq!(response.status(), StatusCode::OK, "{payload}");

        let text = body_json(response).await.to_string();
        assert!(!text.to_lowercase().contains("<script"), "{payload}");
        assert!(!text.contains("onerror"), "{payload}");
    }
}
