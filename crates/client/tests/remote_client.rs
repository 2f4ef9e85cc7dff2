//! Integration tests for the remote client's resilience behavior,
//! driven against a local wiremock server.

use foliant_client::{RemoteApi, RemoteClient};
use foliant_core::RemoteError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> RemoteClient {
    RemoteClient::new(server.uri(), "test-token", Duration::from_secs(2))
        .with_backoff(Duration::from_millis(1), Duration::from_millis(4))
}

async fn mount_auth(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/anonymous"))
        .and(body_json(json!({ "accessToken": "test-token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "authToken": token })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn health_check_needs_no_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "OK" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.health_check().await.unwrap();
    assert_eq!(result["status"], "OK");
    assert!(client.reachable().await);
}

#[tokio::test]
async fn first_authenticated_call_exchanges_token() {
    let server = MockServer::start().await;
    mount_auth(&server, "jwt-auto").await;
    Mock::given(method("GET"))
        .and(path("/api/v1/portfolio/holdings"))
        .and(wiremock::matchers::header("Authorization", "Bearer jwt-auto"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "holdings": [] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.portfolio_holdings().await.unwrap();
    assert!(result["holdings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_first_calls_authenticate_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/anonymous"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "authToken": "jwt-single" }))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accounts": [] })))
        .mount(&server)
        .await;

    let client = Arc::new(client_for(&server));
    let a = {
        let client = client.clone();
        tokio::spawn(async move { client.accounts().await })
    };
    let b = {
        let client = client.clone();
        tokio::spawn(async move { client.accounts().await })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();
    // expect(1) on the auth mock verifies the single exchange on drop
}

#[tokio::test]
async fn reauth_on_401_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/anonymous"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "authToken": "jwt-new" })))
        .expect(2)
        .mount(&server)
        .await;

    // First data attempt is rejected, the replay succeeds.
    Mock::given(method("GET"))
        .and(path("/api/v1/portfolio/holdings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Unauthorized" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/portfolio/holdings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "holdings": [{ "symbol": "AAPL" }] }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.portfolio_holdings().await.unwrap();
    assert_eq!(result["holdings"][0]["symbol"], "AAPL");
}

#[tokio::test]
async fn second_401_is_terminal_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/anonymous"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "authToken": "jwt" })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/order"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.orders().await {
        Err(RemoteError::Unauthorized(_)) => {}
        other => panic!("Expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_security_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/anonymous"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.accounts().await {
        Err(RemoteError::Unauthorized(_)) => {}
        other => panic!("Expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn bad_request_is_not_retried() {
    let server = MockServer::start().await;
    mount_auth(&server, "jwt").await;
    Mock::given(method("POST"))
        .and(path("/api/v1/import"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("activities must not be empty"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.import_activities(&json!([])).await {
        Err(RemoteError::BadRequest { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("activities"));
        }
        other => panic!("Expected BadRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_is_upstream_and_not_retried() {
    let server = MockServer::start().await;
    mount_auth(&server, "jwt").await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.user_settings().await {
        Err(RemoteError::Upstream(message)) => assert!(message.contains("503")),
        other => panic!("Expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_payload_is_upstream() {
    let server = MockServer::start().await;
    mount_auth(&server, "jwt").await;
    Mock::given(method("GET"))
        .and(path("/api/v1/portfolio/performance"))
        .and(query_param("range", "ytd"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.portfolio_performance("ytd").await {
        Err(RemoteError::Upstream(message)) => assert!(message.contains("JSON")),
        other => panic!("Expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn connection_failure_exhausts_three_attempts() {
    // Nothing listens on this port; every attempt fails to connect.
    let client = RemoteClient::new(
        "http://127.0.0.1:1",
        "test-token",
        Duration::from_millis(250),
    )
    .with_backoff(Duration::from_millis(1), Duration::from_millis(4));

    match client.health_check().await {
        Err(RemoteError::Transient { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("Expected Transient after 3 attempts, got {other:?}"),
    }
}

#[tokio::test]
async fn lookup_symbol_passes_query() {
    let server = MockServer::start().await;
    mount_auth(&server, "jwt").await;
    Mock::given(method("GET"))
        .and(path("/api/v1/symbol/lookup"))
        .and(query_param("query", "apple"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "items": [{ "symbol": "AAPL", "name": "Apple Inc." }] }),
        ))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.lookup_symbol("apple").await.unwrap();
    assert_eq!(result["items"][0]["symbol"], "AAPL");
}
