mod support;

use std::time::Duration;

use leadgate_crm::{ApiRequest, UpstreamError};
use serde_json::json;
use support::{client, Reply, StubUpstream};

#[tokio::test]
async fn request_carries_bearer_and_version_headers() {
    let stub = StubUpstream::start().await;
    stub.on("GET", "/contacts/", vec![Reply::Json(200, json!({"contacts": []}))]);
    stub.on("GET", "/tasks", vec![Reply::Json(200, json!({"tasks": []}))]);
    let (client, _) = client(&stub, "client_a", "loc-a");

    client.request(&ApiRequest::get("/contacts/").query("locationId", "loc-a")).await;
    client.request(&ApiRequest::get("/tasks")).await;

    let requests = stub.requests();
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer pit-client_a"));
    assert_eq!(requests[0].version.as_deref(), Some("2021-07-28"));
    assert_eq!(requests[0].query.as_deref(), Some("locationId=loc-a"));
    assert_eq!(requests[1].version, None);
}

#[tokio::test]
async fn empty_body_with_ok_status_is_bare_success() {
    let stub = StubUpstream::start().await;
    stub.on("DELETE", "/tasks/t1", vec![Reply::Raw(200, String::new())]);
    let (client, _) = client(&stub, "client_a", "loc-a");

    let envelope = client.request(&ApiRequest::delete("/tasks").segment("t1")).await;

    assert_eq!(envelope.into_value(), json!({"status": "success"}));
}

#[tokio::test]
async fn non_json_body_does_not_raise() {
    let stub = StubUpstream::start().await;
    stub.on("GET", "/tasks", vec![Reply::Raw(200, "upstream exploded".to_owned())]);
    let (client, _) = client(&stub, "client_a", "loc-a");

    let envelope = client.request(&ApiRequest::get("/tasks")).await;

    assert!(envelope.is_malformed());
    assert_eq!(envelope.status(), Some("error"));
    assert!(envelope.message().is_some());
}

#[tokio::test]
async fn unreachable_upstream_yields_error_envelope() {
    let (factory, _) = support::factory("http://127.0.0.1:1");
    let client = factory.build(&support::tenant("client_a", "loc-a")).expect("client");

    let envelope = client.request(&ApiRequest::get("/tasks")).await;

    assert_eq!(envelope.status(), Some("error"));
    assert_eq!(envelope.http_status(), None);
}

#[tokio::test]
async fn execute_retries_server_errors_on_schedule() {
    let stub = StubUpstream::start().await;
    stub.on(
        "GET",
        "/tasks",
        vec![
            Reply::Json(503, json!({"message": "busy"})),
            Reply::Json(503, json!({"message": "busy"})),
            Reply::Json(503, json!({"message": "busy"})),
            Reply::Json(200, json!({"tasks": [{"id": "t1"}]})),
        ],
    );
    let (client, sleeper) = client(&stub, "client_a", "loc-a");

    let envelope = client.execute(&ApiRequest::get("/tasks")).await.expect("fourth attempt succeeds");

    assert_eq!(envelope.list("tasks").map(Vec::len), Some(1));
    assert_eq!(stub.count("GET", "/tasks"), 4);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_millis(1_000), Duration::from_millis(2_000), Duration::from_millis(4_000)]
    );
}

#[tokio::test]
async fn execute_surfaces_not_found_after_one_attempt() {
    let stub = StubUpstream::start().await;
    stub.on("GET", "/tasks/missing", vec![Reply::Json(404, json!({"message": "Task not found"}))]);
    let (client, sleeper) = client(&stub, "client_a", "loc-a");

    let error = client
        .execute(&ApiRequest::get("/tasks").segment("missing"))
        .await
        .expect_err("404 is terminal");

    match error {
        UpstreamError::Status { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("Task not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(stub.count("GET", "/tasks/missing"), 1);
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn rate_limit_is_retried() {
    let stub = StubUpstream::start().await;
    stub.on(
        "GET",
        "/organizations",
        vec![Reply::Json(429, json!({"message": "slow down"})), Reply::Json(200, json!({"organizations": []}))],
    );
    let (client, sleeper) = client(&stub, "client_a", "loc-a");

    client.execute(&ApiRequest::get("/organizations")).await.expect("second attempt succeeds");

    assert_eq!(stub.count("GET", "/organizations"), 2);
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(1_000)]);
}
