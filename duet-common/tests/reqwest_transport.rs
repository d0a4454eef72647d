use std::sync::Arc;
use std::thread;

use duet_common::reqwest::Method;
use duet_common::{
    CallAnnotations, ContentType, CookieInterceptor, CookieStore, DualResponse, DuetClient,
    DuetError, LoggingInterceptor, ParameterAnnotations, ReqwestTransport, TransportConfig,
};
use httpmock::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Debug, PartialEq, Deserialize)]
struct ApiError {
    error: String,
}

fn client(server: &MockServer) -> DuetClient {
    DuetClient::builder(server.base_url())
        .transport(ReqwestTransport::new().unwrap())
        .interceptor(LoggingInterceptor)
        .build()
        .unwrap()
}

#[test]
fn test_json_success() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/users")
            .header("Content-Type", "application/json")
            .json_body(json!({"id": 1, "name": "Ada"}));
        then.status(201)
            .header("Content-Type", "application/json")
            .json_body(json!({"id": 1, "name": "Ada"}));
    });

    let annotations = CallAnnotations::new()
        .with_content_type(ContentType::APP_JSON)
        .with_endpoint_info("Create user");
    let user = User {
        id: 1,
        name: "Ada".to_string(),
    };
    let response: DualResponse<User, ApiError> = client(&server)
        .request(Method::POST, "/users", &annotations)
        .body(&user, &ParameterAnnotations::EMPTY)
        .execute()
        .unwrap();

    mock.assert();
    assert_eq!(response.status_code(), 201);
    assert_eq!(response.status_message(), "Created");
    assert_eq!(response.success_body(), Some(&user));
    assert_eq!(response.error_body(), None);
    assert_eq!(response.endpoint_info(), "Create user");
}

#[test]
fn test_json_error_with_charset() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/users/404");
        then.status(404)
            .header("Content-Type", "application/json; charset=UTF-8")
            .body(r#"{"error":"not found"}"#);
    });

    let annotations = CallAnnotations::new();
    let response: DualResponse<User, ApiError> = client(&server)
        .request(Method::GET, "/users/404", &annotations)
        .execute()
        .unwrap();

    assert!(!response.is_successful());
    assert_eq!(response.success_body(), None);
    assert_eq!(
        response.error_body(),
        Some(&ApiError {
            error: "not found".to_string()
        })
    );
    response.assert_response(|asserter| {
        asserter
            .assert_is_error_response()
            .assert_http_status_code_is(404)
            .assert_headers(|headers| {
                headers.content_type_contains("application/json");
            });
    });
}

#[test]
fn test_malformed_body_is_conversion_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/broken");
        then.status(200)
            .header("Content-Type", "application/json")
            .body("{not json");
    });

    let annotations = CallAnnotations::new();
    let error = client(&server)
        .request(Method::GET, "/broken", &annotations)
        .execute::<User, ()>()
        .unwrap_err();
    assert!(matches!(error, DuetError::Conversion { .. }), "{}", error);
}

#[test]
fn test_no_content_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(DELETE).path("/users/1");
        then.status(204);
    });

    let annotations = CallAnnotations::new();
    let response: DualResponse<User, ApiError> = client(&server)
        .request(Method::DELETE, "/users/1", &annotations)
        .execute()
        .unwrap();
    assert!(response.raw_response().body.is_none());
    assert_eq!(response.success_body(), None);
}

#[test]
fn test_connection_failure_is_http_call_error() {
    let transport = ReqwestTransport::with_config(
        &TransportConfig::new()
            .timeout(std::time::Duration::from_secs(2))
            .disable_proxy(),
    )
    .unwrap();
    let client = DuetClient::builder("http://127.0.0.1:1")
        .transport(transport)
        .build()
        .unwrap();

    let annotations = CallAnnotations::new();
    let error = client
        .request(Method::GET, "/", &annotations)
        .execute::<String, String>()
        .unwrap_err();
    match error {
        DuetError::HttpCall { endpoint, .. } => assert_eq!(endpoint, "GET http://127.0.0.1:1/"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_cookies_are_replayed_per_thread() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).header("Set-Cookie", "session=abc; Path=/");
    });
    let profile = server.mock(|when, then| {
        when.method(GET).path("/profile").header("Cookie", "session=abc");
        then.status(200).header("Content-Type", "text/plain").body("ada");
    });

    let store = Arc::new(CookieStore::new());
    let client = DuetClient::builder(server.base_url())
        .transport(ReqwestTransport::new().unwrap())
        .interceptor(CookieInterceptor::new(store.clone()))
        .build()
        .unwrap();
    let annotations = CallAnnotations::new();

    client
        .request(Method::POST, "/login", &annotations)
        .execute::<(), ()>()
        .unwrap();
    assert_eq!(store.cookies_named("session").len(), 1);

    let response = client
        .request(Method::GET, "/profile", &annotations)
        .execute::<String, ()>()
        .unwrap();
    profile.assert();
    assert_eq!(response.success_body().map(String::as_str), Some("ada"));

    // 其他线程看不到当前线程的会话
    let other = {
        let store = store.clone();
        thread::spawn(move || store.cookies().len()).join().unwrap()
    };
    assert_eq!(other, 0);

    store.clear();
    assert!(store.cookies().is_empty());
}
