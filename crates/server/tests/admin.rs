mod support;

use axum::http::StatusCode;
use leadgate_server::routes::router;
use serde_json::json;
use support::{send, send_text, state, StubUpstream};

#[tokio::test]
async fn client_lifecycle_is_redacted_and_reports_outcomes() {
    let stub = StubUpstream::start().await;
    let app = router(state(&stub.base_url, &[], None).await);

    let (status, body) = send(
        app.clone(),
        "POST",
        "/clients",
        Some(json!({"clientId": "client_x", "locationId": "loc-x", "apiKey": "pit-secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "client_x");
    assert_eq!(body["hasCredential"], true);
    assert!(!body.to_string().contains("pit-secret"));

    let (status, _) = send(
        app.clone(),
        "POST",
        "/clients",
        Some(json!({"id": "client_x", "locationId": "loc-y", "credential": "pit-other", "displayName": "X Co"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app.clone(), "GET", "/clients", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["clients"][0]["locationId"], "loc-y");
    assert_eq!(body["clients"][0]["displayName"], "X Co");

    let (status, body) = send(app.clone(), "GET", "/clients/client_x", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "client_x");

    let (status, body) = send(app.clone(), "DELETE", "/clients/client_x", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);

    let (status, _) = send(app, "GET", "/clients/client_x", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn client_without_credential_is_rejected() {
    let stub = StubUpstream::start().await;
    let app = router(state(&stub.base_url, &[], None).await);

    let (status, body) =
        send(app.clone(), "POST", "/clients", Some(json!({"id": "client_y", "locationId": "loc-y"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|error| error.contains("no credential")));
    let (_, list) = send(app, "GET", "/clients", None).await;
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn sessions_require_a_known_client_and_vanish_with_it() {
    let stub = StubUpstream::start().await;
    let app = router(state(&stub.base_url, &[("client_a", "loc-a")], None).await);

    let (status, _) =
        send(app.clone(), "POST", "/sessions", Some(json!({"sessionKey": "s1", "clientId": "ghost"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        app.clone(),
        "POST",
        "/sessions",
        Some(json!({"sessionKey": "s1", "clientId": "client_a", "contactId": "c9"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sessionKey"], "s1");
    assert_eq!(body["contactId"], "c9");

    let (status, body) = send(app.clone(), "POST", "/sessions", Some(json!({"clientId": "client_a"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["sessionKey"].as_str().is_some_and(|key| !key.is_empty()));

    let (_, body) = send(app.clone(), "GET", "/sessions", None).await;
    assert_eq!(body["count"], 2);

    let (status, body) = send(app.clone(), "GET", "/sessions/s1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientId"], "client_a");

    let (status, _) = send(app.clone(), "DELETE", "/sessions/s1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(app.clone(), "GET", "/sessions/s1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(app.clone(), "DELETE", "/clients/client_a", None).await;
    let (_, body) = send(app, "GET", "/sessions", None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn health_reports_client_count_and_unknown_routes_are_json() {
    let stub = StubUpstream::start().await;
    let app = router(state(&stub.base_url, &[("client_a", "loc-a")], None).await);

    let (status, body) = send(app.clone(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["clients"]["count"], 1);
    assert_eq!(body["environment"]["GHL_API_KEY"], false);

    let (status, body) = send(app, "GET", "/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some_and(|error| error.contains("/nowhere")));
}

#[tokio::test]
async fn malformed_client_body_is_a_json_bad_request() {
    let stub = StubUpstream::start().await;
    let app = router(state(&stub.base_url, &[], None).await);

    let (status, content_type, body) =
        send_text(app, "POST", "/clients", Some("application/json"), "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert!(body["error"].as_str().is_some_and(|error| error.starts_with("invalid JSON body")));
}

#[tokio::test]
async fn session_body_without_content_type_is_still_parsed() {
    let stub = StubUpstream::start().await;
    let app = router(state(&stub.base_url, &[("client_a", "loc-a")], None).await);

    let (status, _, body) =
        send_text(app.clone(), "POST", "/sessions", None, r#"{"sessionKey": "s-1", "clientId": "client_a"}"#).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["sessionKey"], "s-1");

    let (status, content_type, body) = send_text(app, "POST", "/sessions", None, r#"{"sessionKey": "s-2"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert!(body["error"].as_str().is_some_and(|error| error.contains("clientId")));
}
