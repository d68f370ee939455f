//! HTTP requests through a bootstrapped server to in-process routers.

use local_api::{bootstrap, BridgeError, CompletionResult, ControlFlow, Event, HyperServer};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

mod common;

/// Behaves like the proxy router of a typical API: GET -> 200, POST -> 201.
fn proxy_router(event: Event, control_flow: ControlFlow) {
    let (status_code, called) = match event.request_context.http_method.as_str() {
        "POST" => (201, "handlePostRequest"),
        _ => (200, "handleGetRequest"),
    };

    control_flow.succeed(CompletionResult {
        headers: Some(json!({ "called": called }).as_object().cloned().unwrap_or_default()),
        status_code: Some(status_code),
        body: Some(json!("OK")),
    });
}

#[tokio::test]
async fn get_request() {
    let (server, logger) = common::start(Arc::new(proxy_router)).await;

    let resp = common::client().get(common::url(&server, "/")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["called"], "handleGetRequest");
    assert_eq!(resp.text().await.unwrap(), json!("OK").to_string());
    // one line for the port, one for the response
    assert_eq!(logger.infos().len(), 2);

    server.close().await;
}

#[tokio::test]
async fn post_request() {
    let (server, _logger) = common::start(Arc::new(proxy_router)).await;

    let resp = common::client()
        .post(common::url(&server, "/"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 201);
    assert_eq!(resp.headers()["called"], "handlePostRequest");
    assert_eq!(resp.text().await.unwrap(), "\"OK\"");

    server.close().await;
}

#[tokio::test]
async fn plain_ok_has_no_custom_headers() {
    let router = |_: Event, control_flow: ControlFlow| {
        control_flow.succeed(CompletionResult {
            status_code: Some(200),
            body: Some(json!("OK")),
            ..Default::default()
        })
    };
    let (server, _logger) = common::start(Arc::new(router)).await;

    let resp = common::client().get(common::url(&server, "/")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("called").is_none());
    assert_eq!(resp.headers()["content-type"], "application/json; charset=utf-8");
    assert_eq!(resp.text().await.unwrap(), "\"OK\"");

    server.close().await;
}

#[tokio::test]
async fn error_becomes_500() {
    let router = |_: Event, control_flow: ControlFlow| control_flow.fail("Fail");
    let (server, logger) = common::start(Arc::new(router)).await;

    let resp = common::client().get(common::url(&server, "/anything")).send().await.unwrap();

    assert_eq!(resp.status(), 500);
    assert_eq!(resp.text().await.unwrap(), r#"{"message":"Fail"}"#);
    assert_eq!(logger.errors(), vec!["Fail".to_string()]);

    server.close().await;
}

#[tokio::test]
async fn empty_result_gets_defaults() {
    let router = |_: Event, control_flow: ControlFlow| control_flow.succeed(CompletionResult::default());
    let (server, logger) = common::start(Arc::new(router)).await;

    let resp = common::client().get(common::url(&server, "/")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({}));
    assert_eq!(
        logger.infos()[1],
        "{\n    \"headers\": {},\n    \"statusCode\": 200,\n    \"body\": {}\n}"
    );

    server.close().await;
}

#[tokio::test]
async fn router_sees_the_request() {
    // echo the event back
    let router = |event: Event, control_flow: ControlFlow| {
        control_flow.succeed(CompletionResult {
            body: serde_json::to_value(&event).ok(),
            ..Default::default()
        })
    };
    let (server, _logger) = common::start(Arc::new(router)).await;

    let event: Value = common::client()
        .patch(common::url(&server, "/test?test-value=42"))
        .header("x-test", "yes")
        .json(&json!({"a": {"b": {"c": [1, 2, 3], "d": 42}}, "e": 42}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(event["requestContext"]["resourcePath"], "/test?test-value=42");
    assert_eq!(event["requestContext"]["httpMethod"], "PATCH");
    assert_eq!(event["headers"]["x-test"], "yes");
    assert_eq!(event["headers"]["content-type"], "application/json");
    assert_eq!(event["queryStringParameters"], json!({"test-value": "42"}));
    assert_eq!(event["body"], json!({"a": {"b": {"c": [1, 2, 3], "d": 42}}, "e": 42}));

    server.close().await;
}

#[tokio::test]
async fn router_can_complete_later() {
    let router = |_: Event, control_flow: ControlFlow| {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            control_flow.succeed(CompletionResult {
                status_code: Some(202),
                ..Default::default()
            });
        });
    };
    let (server, _logger) = common::start(Arc::new(router)).await;

    let resp = common::client().get(common::url(&server, "/")).send().await.unwrap();

    assert_eq!(resp.status(), 202);

    server.close().await;
}

#[tokio::test]
async fn dropped_control_flow_is_an_error() {
    let router = |_: Event, control_flow: ControlFlow| drop(control_flow);
    let (server, _logger) = common::start(Arc::new(router)).await;

    let resp = common::client().get(common::url(&server, "/")).send().await.unwrap();

    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(body["message"].is_string());

    server.close().await;
}

#[tokio::test]
async fn port_in_use() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();
    let logger = Arc::new(common::RecordingLogger::default());

    let result = bootstrap(HyperServer::new(), logger, Arc::new(proxy_router), &common::options(port)).await;

    assert!(matches!(result, Err(BridgeError::Bind { .. })));
}
