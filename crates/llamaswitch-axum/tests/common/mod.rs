//! Shared fixtures for llamaswitch-axum integration tests.
//!
//! Models are `sh` scripts that just sleep. Readiness is decided by
//! [`FakeLlamaProbe`], which on the first successful check also starts an
//! in-process stand-in for llama-server on the session's port, so proxied
//! requests have something to talk to.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use http_body_util::BodyExt;
use llamaswitch_axum::{CorsConfig, ServerContext, create_router};
use llamaswitch_core::{
    ControllerConfig, MetricsSample, ModelCatalog, ModelConfig, ProbeError, ServerProbe,
};
use llamaswitch_runtime::SessionController;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub struct FakeLlamaProbe {
    ready: bool,
    started: Mutex<HashSet<u16>>,
}

impl FakeLlamaProbe {
    pub fn new(ready: bool) -> Self {
        Self {
            ready,
            started: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl ServerProbe for FakeLlamaProbe {
    async fn check_ready(&self, port: u16) -> Result<(), ProbeError> {
        if !self.ready {
            return Err(ProbeError::Status(503));
        }
        let mut started = self.started.lock().await;
        if !started.contains(&port) {
            let listener = TcpListener::bind(("127.0.0.1", port))
                .await
                .map_err(|e| ProbeError::Unreachable(e.to_string()))?;
            tokio::spawn(async move {
                let _ = axum::serve(listener, fake_llama_router()).await;
            });
            started.insert(port);
        }
        Ok(())
    }

    async fn scrape_stats(&self, _port: u16) -> Result<MetricsSample, ProbeError> {
        Ok(MetricsSample {
            gen_speed: Some(25.0),
            ..MetricsSample::default()
        })
    }
}

fn fake_llama_router() -> Router {
    Router::new()
        .route("/v1/chat/completions", post(fake_chat))
        .route("/v1/completions", post(fake_stream))
}

async fn fake_chat(headers: HeaderMap, body: String) -> Response {
    let request: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    let echo = headers
        .get("x-test-echo")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    (
        [("x-upstream", "fake-llama")],
        axum::Json(serde_json::json!({
            "object": "chat.completion",
            "model": request["model"],
            "echo": echo,
        })),
    )
        .into_response()
}

async fn fake_stream() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/event-stream")],
        "data: {\"content\":\"hi\"}\n\ndata: [DONE]\n\n",
    )
        .into_response()
}

pub fn catalog() -> Arc<ModelCatalog> {
    let mut sleeper = ModelConfig::new(
        "sleeper",
        "sh -c 'echo loading on ${PORT} with ${CTX}; exec sleep 30'",
    );
    sleeper
        .extra
        .insert("label".to_string(), serde_json::json!("Sleepy"));
    Arc::new(ModelCatalog::from_models([
        sleeper,
        ModelConfig::new("vision", "sh -c 'exec sleep 30' --mmproj proj.gguf"),
        ModelConfig::new("missing", "/nonexistent/llama-server --port ${PORT}"),
    ]))
}

pub struct TestApp {
    pub router: Router,
    pub controller: SessionController,
}

pub fn test_app(probe_ready: bool, load_timeout: Duration) -> TestApp {
    let config = ControllerConfig::default()
        .with_grace_period(Duration::from_millis(500))
        .with_probe_interval(Duration::from_millis(50));
    let controller = SessionController::new(
        config,
        catalog(),
        Arc::new(FakeLlamaProbe::new(probe_ready)),
    );
    let ctx = Arc::new(ServerContext::new(controller.clone(), load_timeout));
    TestApp {
        router: create_router(ctx, &CorsConfig::AllowAll),
        controller,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
