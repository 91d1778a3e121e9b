//! Session handlers - start, stop and status of the model server.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use tracing::info;

use crate::dto::{StartRequest, StartResponse, StatusMessage, StatusResponse};
use crate::error::HttpError;
use crate::state::AppState;

/// `GET /api/status`
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.controller.status().into())
}

/// `POST /api/start`
pub async fn start(
    State(state): State<AppState>,
    req: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<StartResponse>, HttpError> {
    let Json(req) = req.map_err(|e| HttpError::BadRequest(e.body_text()))?;
    info!(model_key = %req.model_key, ctx = ?req.ctx, "Start requested");
    let outcome = state.controller.start(&req.model_key, req.ctx).await?;
    Ok(Json(StartResponse {
        status: "started".to_string(),
        port: outcome.port,
        command: outcome.command,
    }))
}

/// `POST /api/stop`
pub async fn stop(State(state): State<AppState>) -> Result<Json<StatusMessage>, HttpError> {
    state.controller.stop().await?;
    Ok(Json(StatusMessage::new("stopped")))
}
