//! OpenAI-compatible handlers.
//!
//! Completion requests name a model; if it is not the one running it is
//! loaded first (replacing whatever was running) and the request is held
//! until the server reports ready.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use serde_json::Value;
use tracing::info;

use crate::dto::ModelList;
use crate::error::HttpError;
use crate::forward::forward;
use crate::state::AppState;

/// `GET /v1/models`
pub async fn models(State(state): State<AppState>) -> Json<ModelList> {
    let models = state.controller.catalog().models();
    Json(ModelList::from_models(models.values()))
}

/// `POST /v1/chat/completions` and `POST /v1/completions`
pub async fn proxy(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    let model = requested_model(&body)?;
    let controller = &state.controller;

    if let Some(outcome) = controller.ensure_running(&model).await? {
        info!(model_key = %model, port = outcome.port, "Auto-loading model for request");
    }
    let port = controller.wait_until_ready(state.load_timeout).await?;

    let path = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |p| p.as_str());
    let url = format!("http://{}:{port}{path}", controller.config().probe_host);
    forward(&state.upstream, method, &url, &headers, body).await
}

/// The `model` field of an OpenAI request body.
fn requested_model(body: &[u8]) -> Result<String, HttpError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| HttpError::BadRequest("Invalid JSON".to_string()))?;
    value
        .get("model")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .ok_or_else(|| HttpError::BadRequest("Model field required".to_string()))
}
