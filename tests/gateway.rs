use brighttimes_client::{
    gateway::{ApiRequest, AuthGateway, GatewayOutcome, LoginReason},
    ClientError, SessionCredentials, SessionManager,
};
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::json;
use std::time::Duration;
use url::Url;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn session_with(access: Option<&str>, refresh: Option<&str>) -> SessionManager {
    let session = SessionManager::in_memory();
    if let Some(access) = access {
        session
            .begin(&SessionCredentials {
                access_token: access.to_string(),
                refresh_token: refresh.map(str::to_string),
                username: "sarah".to_string(),
            })
            .await
            .unwrap();
    }
    session
}

fn gateway(refresh_base: &str, session: SessionManager) -> AuthGateway {
    let refresh_url = Url::parse(&format!("{}/auth/refresh", refresh_base)).unwrap();
    AuthGateway::new(reqwest::Client::new(), session, refresh_url)
}

fn mine_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/activities/mine", server.uri())).unwrap()
}

/// An address nothing listens on.
fn unreachable_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn mount_refresh(server: &MockServer, bearer: &'static str, new_access: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("Authorization", bearer))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": new_access })))
        .expect(times)
        .mount(server)
        .await;
}

async fn assert_session_cleared(session: &SessionManager) {
    assert_eq!(session.access_token().await.unwrap(), None);
    assert_eq!(session.refresh_token().await.unwrap(), None);
    assert_eq!(session.username().await.unwrap(), None);
}

fn expect_response(outcome: GatewayOutcome) -> reqwest::Response {
    match outcome {
        GatewayOutcome::Response(response) => response,
        GatewayOutcome::LoginRequired(redirect) => {
            panic!("Expected a response, got redirect: {:?}", redirect)
        }
    }
}

fn expect_redirect(outcome: GatewayOutcome) -> LoginReason {
    match outcome {
        GatewayOutcome::LoginRequired(redirect) => {
            assert_eq!(redirect.location, "/login");
            redirect.reason
        }
        GatewayOutcome::Response(response) => {
            panic!("Expected a login redirect, got status {}", response.status())
        }
    }
}

#[test_log::test(tokio::test)]
async fn test_success_is_single_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "Bearer R1", "A2", 0).await;

    let session = session_with(Some("A1"), Some("R1")).await;
    let gateway = gateway(&server.uri(), session.clone());

    let response = expect_response(gateway.request(&ApiRequest::get(mine_url(&server))).await.unwrap());
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!([{"id": 1}]));
    assert_eq!(session.access_token().await.unwrap().as_deref(), Some("A1"));
}

#[test_log::test(tokio::test)]
async fn test_server_error_is_returned_without_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "Bearer R1", "A2", 0).await;

    let gateway = gateway(&server.uri(), session_with(Some("A1"), Some("R1")).await);
    let response = expect_response(gateway.request(&ApiRequest::get(mine_url(&server))).await.unwrap());
    assert_eq!(response.status(), 500);
}

#[test_log::test(tokio::test)]
async fn test_expired_token_is_refreshed_and_retried_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Token has expired"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "Bearer R1", "A2", 1).await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "Creative Art Workshop"},
            {"id": 2, "title": "Science Experiments Fun"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with(Some("A1"), Some("R1")).await;
    let gateway = gateway(&server.uri(), session.clone());

    let response = expect_response(gateway.request(&ApiRequest::get(mine_url(&server))).await.unwrap());
    assert_eq!(response.status(), 200);
    let body: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(body.len(), 2);

    assert_eq!(session.access_token().await.unwrap().as_deref(), Some("A2"));
    assert_eq!(session.refresh_token().await.unwrap().as_deref(), Some("R1"));
    assert_eq!(session.username().await.unwrap().as_deref(), Some("sarah"));
}

#[test_log::test(tokio::test)]
async fn test_second_unauthorized_is_returned_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "Bearer R1", "A2", 1).await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid token"})))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with(Some("A1"), Some("R1")).await;
    let gateway = gateway(&server.uri(), session.clone());

    let response = expect_response(gateway.request(&ApiRequest::get(mine_url(&server))).await.unwrap());
    assert_eq!(response.status(), 401);
    // The refreshed token is kept; the caller decides what a hard 401 means.
    assert_eq!(session.access_token().await.unwrap().as_deref(), Some("A2"));
}

#[test_log::test(tokio::test)]
async fn test_rejected_refresh_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("Authorization", "Bearer R1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Token has expired"})))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with(Some("A1"), Some("R1")).await;
    let gateway = gateway(&server.uri(), session.clone());

    let outcome = gateway.request(&ApiRequest::get(mine_url(&server))).await.unwrap();
    assert_eq!(expect_redirect(outcome), LoginReason::RefreshRejected(401));
    assert_session_cleared(&session).await;
}

#[test_log::test(tokio::test)]
async fn test_missing_refresh_token_skips_refresh_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = session_with(Some("A1"), None).await;
    let gateway = gateway(&server.uri(), session.clone());

    let outcome = gateway.request(&ApiRequest::get(mine_url(&server))).await.unwrap();
    assert_eq!(expect_redirect(outcome), LoginReason::MissingRefreshToken);
    assert_session_cleared(&session).await;
}

#[test_log::test(tokio::test)]
async fn test_no_access_token_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = gateway(&server.uri(), session_with(None, None).await);
    let outcome = gateway.request(&ApiRequest::get(mine_url(&server))).await.unwrap();
    assert_eq!(expect_redirect(outcome), LoginReason::MissingAccessToken);
}

#[test_log::test(tokio::test)]
async fn test_retry_preserves_caller_headers_and_body() {
    let server = MockServer::start().await;
    let payload = json!({
        "title": "Story Time Adventure",
        "topic": "Reading",
        "age_group": "3-6 years",
        "date": "2024-01-17",
        "time": "11:00 AM",
        "join_link": "https://zoom.us/j/456789123"
    });

    for (bearer, status) in [("Bearer A1", 401), ("Bearer A2", 201)] {
        Mock::given(method("POST"))
            .and(path("/activities"))
            .and(header("Authorization", bearer))
            .and(header("X-Request-Source", "dashboard"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(payload.clone()))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"message": "Activity created", "id": 3})))
            .expect(1)
            .mount(&server)
            .await;
    }
    mount_refresh(&server, "Bearer R1", "A2", 1).await;

    let gateway = gateway(&server.uri(), session_with(Some("A1"), Some("R1")).await);
    let request = ApiRequest::post(Url::parse(&format!("{}/activities", server.uri())).unwrap())
        .header(
            HeaderName::from_static("x-request-source"),
            HeaderValue::from_static("dashboard"),
        )
        .json(&payload)
        .unwrap();

    let response = expect_response(gateway.request(&request).await.unwrap());
    assert_eq!(response.status(), 201);
}

#[test_log::test(tokio::test)]
async fn test_unreachable_refresh_endpoint_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with(Some("A1"), Some("R1")).await;
    let gateway = gateway(&unreachable_base(), session.clone());

    let outcome = gateway.request(&ApiRequest::get(mine_url(&server))).await.unwrap();
    assert_eq!(expect_redirect(outcome), LoginReason::RefreshUnreachable);
    assert_session_cleared(&session).await;
}

#[test_log::test(tokio::test)]
async fn test_network_error_on_primary_request_propagates() {
    let session = session_with(Some("A1"), Some("R1")).await;
    let base = unreachable_base();
    let gateway = gateway(&base, session.clone());

    let url = Url::parse(&format!("{}/activities/mine", base)).unwrap();
    let err = gateway.request(&ApiRequest::get(url)).await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));

    // Nothing was learned about the token, so the session stays.
    assert_eq!(session.access_token().await.unwrap().as_deref(), Some("A1"));
}

#[test_log::test(tokio::test)]
async fn test_network_error_on_retry_propagates_and_keeps_new_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "Bearer R1", "A2", 1).await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with(Some("A1"), Some("R1")).await;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let refresh_url = Url::parse(&format!("{}/auth/refresh", server.uri())).unwrap();
    let gateway = AuthGateway::new(http, session.clone(), refresh_url);

    let err = gateway
        .request(&ApiRequest::get(mine_url(&server)))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));

    assert_eq!(session.access_token().await.unwrap().as_deref(), Some("A2"));
    assert_eq!(session.refresh_token().await.unwrap().as_deref(), Some("R1"));
}

async fn mount_concurrent_scenario(server: &MockServer, refresh_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("Authorization", "Bearer R1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "A2"}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(refresh_calls)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/activities/mine"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(server)
        .await;
}

#[test_log::test(tokio::test)]
async fn test_concurrent_unauthorized_calls_share_one_refresh() {
    let server = MockServer::start().await;
    mount_concurrent_scenario(&server, 1).await;

    let gateway = gateway(&server.uri(), session_with(Some("A1"), Some("R1")).await);
    let request = ApiRequest::get(mine_url(&server));

    let (first, second) = tokio::join!(gateway.request(&request), gateway.request(&request));
    assert_eq!(expect_response(first.unwrap()).status(), 200);
    assert_eq!(expect_response(second.unwrap()).status(), 200);
}

#[test_log::test(tokio::test)]
async fn test_uncoalesced_calls_refresh_independently() {
    let server = MockServer::start().await;
    mount_concurrent_scenario(&server, 2).await;

    let gateway = gateway(&server.uri(), session_with(Some("A1"), Some("R1")).await)
        .with_coalesced_refresh(false);
    let request = ApiRequest::get(mine_url(&server));

    let (first, second) = tokio::join!(gateway.request(&request), gateway.request(&request));
    assert_eq!(expect_response(first.unwrap()).status(), 200);
    assert_eq!(expect_response(second.unwrap()).status(), 200);
}
