mod common;

use std::collections::HashMap;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use http_body_util::BodyExt;
use opa_authorizer::app::build_router;
use opa_authorizer::config::Config;
use opa_authorizer::services::authz::build_authorizer;
use opa_authorizer::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app_with(overrides: &[(&str, &str)]) -> Router {
    let mut env: HashMap<String, String> = HashMap::from([
        ("ISSUER".to_string(), ISSUER.to_string()),
        ("AUDIENCE".to_string(), AUDIENCE.to_string()),
        ("JWKS_JSON".to_string(), JWKS_JSON.to_string()),
        (
            "POLICY_DIR".to_string(),
            format!("{}/policies", env!("CARGO_MANIFEST_DIR")),
        ),
    ]);
    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }

    let config = Config::from_lookup(|key| env.get(key).cloned()).expect("test config");
    let authorizer = build_authorizer(&config).expect("authorizer should build");
    build_router(AppState::new(authorizer), &config)
}

fn app() -> Router {
    app_with(&[])
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn http_event(authorization: Option<&str>, method: &str, path: &str) -> Value {
    let mut event = json!({
        "version": "2.0",
        "type": "REQUEST",
        "routeArn": format!("arn:aws:execute-api:us-east-1:123456789012:abc/$default/{method}{path}"),
        "rawPath": path,
        "requestContext": {"http": {"method": method, "path": path}},
    });
    if let Some(value) = authorization {
        event["headers"] = json!({"Authorization": value});
    }
    event
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn http_api_allows_listed_route() {
    let header = format!("Bearer {}", valid_token());

    let (status, body) = post_json(
        app(),
        "/api/v1/authorize/http",
        http_event(Some(&header), "GET", "/google"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"isAuthorized": true}));
}

#[tokio::test]
async fn http_api_denies_unlisted_route_and_bad_tokens() {
    let valid = format!("Bearer {}", valid_token());
    let expired = format!(
        "Bearer {}",
        signed_token(ISSUER, AUDIENCE, now() - 7200, now() - 60)
    );

    for event in [
        http_event(Some(&valid), "GET", "/admin"),
        http_event(Some(&valid), "DELETE", "/google"),
        http_event(Some(&expired), "GET", "/google"),
        http_event(None, "GET", "/google"),
    ] {
        let (status, body) = post_json(app(), "/api/v1/authorize/http", event).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"isAuthorized": false}));
    }
}

#[tokio::test]
async fn rest_api_token_event_returns_policy_document() {
    let arn = "arn:aws:execute-api:us-east-1:123456789012:abc/prod/GET/bing";

    let (status, body) = post_json(
        app(),
        "/api/v1/authorize/rest",
        json!({
            "type": "TOKEN",
            "authorizationToken": format!("Bearer {}", valid_token()),
            "methodArn": arn,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["principalId"], "user-123");
    assert_eq!(body["policyDocument"]["Version"], "2012-10-17");
    assert_eq!(body["policyDocument"]["Statement"][0]["Effect"], "Allow");
    assert_eq!(
        body["policyDocument"]["Statement"][0]["Action"],
        json!(["execute-api:Invoke"])
    );
    assert_eq!(body["policyDocument"]["Statement"][0]["Resource"][0], arn);
}

#[tokio::test]
async fn rest_api_without_token_is_denied() {
    let (status, body) = post_json(
        app(),
        "/api/v1/authorize/rest",
        json!({
            "type": "REQUEST",
            "methodArn": "arn:aws:execute-api:us-east-1:123456789012:abc/prod/GET/google",
            "httpMethod": "GET",
            "path": "/google",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["principalId"], "unknown");
    assert_eq!(body["policyDocument"]["Statement"][0]["Effect"], "Deny");
}

#[tokio::test]
async fn malformed_event_is_bad_request() {
    let (status, body) = post_json(
        app(),
        "/api/v1/authorize/http",
        json!({"version": "1.0", "routeArn": "arn"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn non_boolean_query_is_a_server_error() {
    // `data.authz.routes` evaluates to an array, not a decision.
    let app = app_with(&[("POLICY_QUERY", "data.authz.routes")]);
    let header = format!("Bearer {}", valid_token());

    let (status, body) = post_json(
        app,
        "/api/v1/authorize/http",
        http_event(Some(&header), "GET", "/google"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "POLICY_EVALUATION_ERROR");
}
