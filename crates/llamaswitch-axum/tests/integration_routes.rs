//! Integration tests for the control API and the OpenAI-compatible routes.
//!
//! Requests go through the real router with `tower::ServiceExt::oneshot`;
//! model processes are real `sh` children, readiness is faked.

#![cfg(unix)]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{body_bytes, body_json, get, post_json, test_app};
use llamaswitch_axum::{CorsConfig, ServerContext, create_spa_router};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const LOAD_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_health_returns_ok() {
    let app = test_app(true, LOAD_TIMEOUT);

    let response = app.router.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], b"OK");
}

#[tokio::test]
async fn test_config_lists_models_with_extra_fields() {
    let app = test_app(true, LOAD_TIMEOUT);

    let response = app.router.oneshot(get("/api/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["default_ctx"], 4096);
    assert_eq!(body["models"]["sleeper"]["label"], "Sleepy");
    assert!(
        body["models"]["missing"]["cmd"]
            .as_str()
            .unwrap()
            .contains("${PORT}")
    );
}

#[tokio::test]
async fn test_status_when_idle() {
    let app = test_app(true, LOAD_TIMEOUT);

    let response = app.router.oneshot(get("/api/status")).await.unwrap();
    let body = body_json(response).await;

    assert_eq!(body["running"], false);
    assert_eq!(body["phase"], "stopped");
    assert_eq!(body["ready"], false);
    assert!(body["model"].is_null());
    assert!(body["port"].is_null());
    assert_eq!(body["stats"]["ctx_used"], 0);
    assert_eq!(body["stats"]["gen_speed"], 0.0);
}

#[tokio::test]
async fn test_start_unknown_model_is_not_found() {
    let app = test_app(true, LOAD_TIMEOUT);

    let response = app
        .router
        .oneshot(post_json("/api/start", &json!({"model_key": "nope"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_start_rejects_non_positive_context() {
    let app = test_app(true, LOAD_TIMEOUT);

    let response = app
        .router
        .oneshot(post_json(
            "/api/start",
            &json!({"model_key": "sleeper", "ctx": 0}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!app.controller.status().running);
}

#[tokio::test]
async fn test_start_malformed_body_is_json_bad_request() {
    let app = test_app(true, LOAD_TIMEOUT);

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/start", &json!({"ctx": 8192})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("model_key"));

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/start")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].is_string());
    assert!(!app.controller.status().running);
}

#[tokio::test]
async fn test_start_missing_binary_is_server_error() {
    let app = test_app(true, LOAD_TIMEOUT);

    let response = app
        .router
        .oneshot(post_json("/api/start", &json!({"model_key": "missing"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!app.controller.status().running);
}

#[tokio::test]
async fn test_start_status_stop_cycle() {
    let app = test_app(true, LOAD_TIMEOUT);

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/start",
            &json!({"model_key": "sleeper", "ctx": 2048}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let started = body_json(response).await;
    assert_eq!(started["status"], "started");
    let port = started["port"].as_u64().unwrap();
    assert!(port > 0);
    let command = started["command"].as_str().unwrap();
    assert!(command.contains(&port.to_string()));
    assert!(command.contains("2048"));

    tokio_test::assert_ok!(app.controller.wait_until_ready(LOAD_TIMEOUT).await);

    let status = body_json(
        app.router
            .clone()
            .oneshot(get("/api/status"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status["running"], true);
    assert_eq!(status["ready"], true);
    assert_eq!(status["model"], "sleeper");
    assert_eq!(status["ctx"], 2048);
    assert_eq!(status["port"], port);
    assert_eq!(status["stats"]["ctx_limit"], 2048);
    assert!(status["pid"].as_u64().is_some());

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/stop", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "stopped");

    let status = body_json(app.router.oneshot(get("/api/status")).await.unwrap()).await;
    assert_eq!(status["running"], false);
    assert_eq!(status["phase"], "stopped");
    assert!(status["last_crash"].is_null());
}

#[tokio::test]
async fn test_stop_when_idle_is_ok() {
    let app = test_app(true, LOAD_TIMEOUT);

    let response = app
        .router
        .oneshot(post_json("/api/stop", &json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logs_capture_output_and_clear() {
    let app = test_app(true, LOAD_TIMEOUT);
    let outcome = app.controller.start("sleeper", None).await.unwrap();

    let expected = format!("loading on {} with 4096", outcome.port);
    let mut lines = Vec::new();
    for _ in 0..50 {
        let response = app.router.clone().oneshot(get("/api/logs")).await.unwrap();
        lines = serde_json::from_value::<Vec<String>>(body_json(response).await).unwrap();
        if lines.iter().any(|l| l.contains(&expected)) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(
        lines.iter().any(|l| l.contains(&expected)),
        "log lines: {lines:?}"
    );

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/logs/clear", &json!({})))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "cleared");

    let response = app.router.oneshot(get("/api/logs")).await.unwrap();
    assert_eq!(body_json(response).await, json!([]));

    app.controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_models_list_has_both_shapes() {
    let app = test_app(true, LOAD_TIMEOUT);

    let response = app.router.oneshot(get("/v1/models")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["object"], "list");
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["missing", "sleeper", "vision"]);
    assert_eq!(body["data"][0]["owned_by"], "llamacpp");
    assert_eq!(body["data"][0]["meta"]["n_vocab"], 32000);

    let vision = &body["models"][2];
    assert_eq!(vision["name"], "vision");
    assert_eq!(vision["type"], "model");
    assert_eq!(vision["details"]["format"], "gguf");
    assert!(
        vision["capabilities"]
            .as_array()
            .unwrap()
            .contains(&json!("multimodal"))
    );
}

#[tokio::test]
async fn test_proxy_rejects_bad_requests() {
    let app = test_app(true, LOAD_TIMEOUT);

    let invalid = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(invalid).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Invalid JSON");

    let response = app
        .router
        .clone()
        .oneshot(post_json("/v1/chat/completions", &json!({"messages": []})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Model field required");

    let response = app
        .router
        .oneshot(post_json("/v1/completions", &json!({"model": "nope"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(!app.controller.status().running);
}

#[tokio::test]
async fn test_proxy_loads_model_and_forwards() {
    let app = test_app(true, LOAD_TIMEOUT);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-test-echo", "passed-through")
        .body(Body::from(
            json!({"model": "sleeper", "messages": [{"role": "user", "content": "hi"}]})
                .to_string(),
        ))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-upstream"], "fake-llama");
    let body = body_json(response).await;
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "sleeper");
    assert_eq!(body["echo"], "passed-through");

    let status = app.controller.status();
    assert_eq!(status.model.as_deref(), Some("sleeper"));
    assert!(status.ready);

    // Same model again: no restart.
    let pid = status.pid;
    let response = app
        .router
        .oneshot(post_json(
            "/v1/completions",
            &json!({"model": "sleeper", "prompt": "hi", "stream": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    let text = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
    assert!(text.ends_with("data: [DONE]\n\n"));
    assert_eq!(app.controller.status().pid, pid);

    app.controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_proxy_switches_models() {
    let app = test_app(true, LOAD_TIMEOUT);
    app.controller.start("sleeper", None).await.unwrap();
    tokio_test::assert_ok!(app.controller.wait_until_ready(LOAD_TIMEOUT).await);

    let response = app
        .router
        .oneshot(post_json("/v1/chat/completions", &json!({"model": "vision"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["model"], "vision");
    assert_eq!(app.controller.status().model.as_deref(), Some("vision"));

    app.controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_proxy_times_out_when_model_never_ready() {
    let app = test_app(false, Duration::from_millis(300));

    let response = app
        .router
        .oneshot(post_json("/v1/chat/completions", &json!({"model": "sleeper"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = body_json(response).await;
    assert!(
        body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Model failed to load within")
    );

    app.controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_spa_router_serves_index_for_client_routes() {
    let app = test_app(true, LOAD_TIMEOUT);
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>dashboard</html>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

    let ctx = Arc::new(ServerContext::new(app.controller.clone(), LOAD_TIMEOUT));
    let router = create_spa_router(ctx, dir.path(), &CorsConfig::AllowAll);

    let response = router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], b"<html>dashboard</html>");

    let response = router.clone().oneshot(get("/app.js")).await.unwrap();
    assert_eq!(&body_bytes(response).await[..], b"console.log(1)");

    let response = router.clone().oneshot(get("/settings/models")).await.unwrap();
    assert_eq!(&body_bytes(response).await[..], b"<html>dashboard</html>");

    let response = router.oneshot(get("/api/status")).await.unwrap();
    assert_eq!(body_json(response).await["running"], false);
}
