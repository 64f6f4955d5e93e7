//! Chain and tick integration tests
//!
//! These drive monitoring and cleanup chains against a mock server and check
//! how variables flow between requests and how failures end (or don't end) a
//! chain.

use super::{get, post, test_client};
use http_monitor::runner::{run_chain, run_tick, seed_store, ChainKind};
use http_monitor::{ExecutionError, ExtractionRule, MonitorDefinition, VariableStore};
use std::collections::BTreeMap;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn definition(server: &MockServer) -> MonitorDefinition {
    MonitorDefinition::new("login-flow", Duration::from_secs(60)).with_variable("base", server.uri())
}

#[tokio::test]
async fn test_token_from_header_feeds_next_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string(r#"{"user":"probe"}"#))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Token", "abc123"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .and(query_param("auth", "abc123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let definition = definition(&server)
        .with_request(
            post("login", "{{base}}/login")
                .with_body(r#"{"user":"probe"}"#)
                .extracting(ExtractionRule::header("token", "X-Token")),
        )
        .with_request(get("fetch", "{{base}}/data?auth={{token}}"));

    let report = run_tick(&test_client(), &definition).await;

    assert!(report.is_healthy());
    assert_eq!(report.monitoring.executed, 2);
    assert_eq!(report.monitoring.store.get("token"), Some("abc123"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[1].url.query(), Some("auth=abc123"));
}

#[tokio::test]
async fn test_monitoring_chain_stops_at_first_failure() {
    let server = MockServer::start().await;

    Mock::given(path("/first"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id": 7}"#))
        .expect(1)
        .mount(&server)
        .await;

    // Sees the id extracted by the first request, then fails.
    Mock::given(path("/items/7"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(path("/third"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let specs = vec![
        get("first", "{{base}}/first").extracting(ExtractionRule::json_path("id", "$.id")),
        get("second", "{{base}}/items/{{id}}"),
        get("third", "{{base}}/third"),
    ];

    let mut variables = BTreeMap::new();
    variables.insert("base".to_string(), server.uri());

    let outcome = run_chain(
        &test_client(),
        ChainKind::Monitoring,
        &specs,
        seed_store(&variables),
    )
    .await;

    assert_eq!(outcome.executed, 2);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.skipped, 1);

    let failure = outcome.first_error.unwrap();
    assert_eq!(failure.request, "second");
    assert!(matches!(
        failure.error,
        ExecutionError::UnexpectedStatus { actual: 404, .. }
    ));
    assert_eq!(outcome.store.get("id"), Some("7"));
}

#[tokio::test]
async fn test_cleanup_chain_runs_past_failures() {
    let server = MockServer::start().await;

    Mock::given(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(path("/release"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(path("/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let definition = definition(&server)
        .with_request(get("ok", "{{base}}/ok"))
        .with_cleanup(post("release", "{{base}}/release"))
        .with_cleanup(post("logout", "{{base}}/logout").expecting([204]));

    let report = run_tick(&test_client(), &definition).await;

    // Cleanup failures never make a tick unhealthy.
    assert!(report.is_healthy());
    assert_eq!(report.cleanup.executed, 2);
    assert_eq!(report.cleanup.failed, 1);
    assert_eq!(report.cleanup.skipped, 0);
    assert_eq!(report.cleanup.first_error.unwrap().request, "release");
}

#[tokio::test]
async fn test_cleanup_sees_variables_after_monitoring_failure() {
    let server = MockServer::start().await;

    Mock::given(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Token", "t0k"))
        .mount(&server)
        .await;

    Mock::given(path("/data"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    Mock::given(path("/never"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/logout"))
        .and(header("Authorization", "Bearer t0k"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let definition = definition(&server)
        .with_request(
            post("login", "{{base}}/login").extracting(ExtractionRule::header("token", "x-token")),
        )
        .with_request(get("data", "{{base}}/data"))
        .with_request(get("never", "{{base}}/never"))
        .with_cleanup(
            post("logout", "{{base}}/logout").with_header("Authorization", "Bearer {{token}}"),
        );

    let report = run_tick(&test_client(), &definition).await;

    assert!(!report.is_healthy());
    assert_eq!(report.monitoring.first_error.as_ref().unwrap().request, "data");
    assert!(report.cleanup.is_success());
}

#[tokio::test]
async fn test_cleanup_extractions_visible_to_later_cleanup() {
    let server = MockServer::start().await;

    Mock::given(path("/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"sessions": ["s-1"]}"#))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/sessions/s-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let definition = definition(&server)
        .with_cleanup(
            get("list", "{{base}}/sessions")
                .extracting(ExtractionRule::json_path("session", "$.sessions[0]")),
        )
        .with_cleanup(http_monitor::RequestSpec::new(
            "delete",
            http_monitor::HttpMethod::DELETE,
            "{{base}}/sessions/{{session}}",
        ));

    let report = run_tick(&test_client(), &definition).await;

    assert!(report.cleanup.is_success());
    assert_eq!(report.cleanup.store.get("session"), Some("s-1"));
}

#[tokio::test]
async fn test_cleanup_continues_after_partial_extraction_failure() {
    let server = MockServer::start().await;

    Mock::given(path("/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"sessions": ["s-1"]}"#))
        .expect(1)
        .mount(&server)
        .await;

    // The lock header extracts, then the missing `$.lease` fails the request.
    Mock::given(path("/locks"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Lock", "lock-9")
                .set_body_string(r#"{"held": true}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Sees the session from the first request but not the lock from the
    // failed one, which is sent as the raw placeholder.
    Mock::given(method("DELETE"))
        .and(path("/sessions/s-1"))
        .and(header("X-Lock", "{{lock}}"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let definition = definition(&server)
        .with_cleanup(
            get("list", "{{base}}/sessions")
                .extracting(ExtractionRule::json_path("session", "$.sessions[0]")),
        )
        .with_cleanup(
            post("lock", "{{base}}/locks")
                .extracting(ExtractionRule::header("lock", "X-Lock"))
                .extracting(ExtractionRule::json_path("lease", "$.lease")),
        )
        .with_cleanup(
            http_monitor::RequestSpec::new(
                "delete",
                http_monitor::HttpMethod::DELETE,
                "{{base}}/sessions/{{session}}",
            )
            .with_header("X-Lock", "{{lock}}"),
        );

    let report = run_tick(&test_client(), &definition).await;

    assert!(report.is_healthy());
    assert_eq!(report.cleanup.executed, 3);
    assert_eq!(report.cleanup.failed, 1);
    assert_eq!(report.cleanup.skipped, 0);

    let failure = report.cleanup.first_error.as_ref().unwrap();
    assert_eq!(failure.request, "lock");
    assert!(matches!(
        &failure.error,
        ExecutionError::Extraction { variable, .. } if variable == "lease"
    ));

    assert_eq!(report.cleanup.store.get("session"), Some("s-1"));
    assert_eq!(report.cleanup.store.get("lock"), None);
    assert_eq!(report.cleanup.store.get("lease"), None);
}

#[tokio::test]
async fn test_partial_extraction_is_discarded() {
    let server = MockServer::start().await;

    Mock::given(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Token", "abc123")
                .set_body_string(r#"{"user": {}}"#),
        )
        .mount(&server)
        .await;

    let specs = vec![get("login", &format!("{}/login", server.uri()))
        .extracting(ExtractionRule::header("token", "X-Token"))
        .extracting(ExtractionRule::json_path("user_id", "$.user.id"))];

    let outcome = run_chain(
        &test_client(),
        ChainKind::Monitoring,
        &specs,
        VariableStore::new(),
    )
    .await;

    let failure = outcome.first_error.unwrap();
    match failure.error {
        ExecutionError::Extraction { variable, .. } => assert_eq!(variable, "user_id"),
        other => panic!("expected extraction error, got {:?}", other),
    }
    assert_eq!(outcome.store.get("token"), None);
    assert_eq!(outcome.store.extracted_count(), 0);
}

#[tokio::test]
async fn test_each_tick_starts_from_fresh_store() {
    let server = MockServer::start().await;

    Mock::given(path("/ping"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Seen", "yes"))
        .mount(&server)
        .await;

    let definition = definition(&server).with_request(
        get("ping", "{{base}}/ping")
            .with_header("X-Run", "{{run-id}}")
            .with_header("X-Previous", "{{seen}}")
            .extracting(ExtractionRule::header("seen", "X-Seen")),
    );

    let client = test_client();
    let first = run_tick(&client, &definition).await;
    let second = run_tick(&client, &definition).await;
    assert!(first.is_healthy() && second.is_healthy());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let run_ids: Vec<String> = requests
        .iter()
        .map(|r| r.headers.get("X-Run").unwrap().to_str().unwrap().to_string())
        .collect();
    assert_ne!(run_ids[0], run_ids[1]);

    // The value extracted in tick one never reaches tick two.
    for request in &requests {
        assert_eq!(
            request.headers.get("X-Previous").unwrap().to_str().unwrap(),
            "{{seen}}"
        );
    }
}

#[tokio::test]
async fn test_transport_failure_ends_monitoring_chain() {
    // Nothing listens on port 1.
    let specs = vec![
        get("down", "http://127.0.0.1:1/health"),
        get("after", "http://127.0.0.1:1/after"),
    ];

    let outcome = run_chain(
        &test_client(),
        ChainKind::Monitoring,
        &specs,
        VariableStore::new(),
    )
    .await;

    assert_eq!(outcome.executed, 1);
    assert_eq!(outcome.skipped, 1);
    assert!(outcome.first_error.unwrap().error.is_transport());
}
