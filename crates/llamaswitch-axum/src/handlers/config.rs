//! Config handler - the model catalog as loaded.

use axum::Json;
use axum::extract::State;

use crate::dto::ConfigResponse;
use crate::state::AppState;

/// `GET /api/config`
pub async fn get(State(state): State<AppState>) -> Json<ConfigResponse> {
    let controller = &state.controller;
    Json(ConfigResponse {
        models: controller.catalog().models().as_ref().clone(),
        default_ctx: controller.config().default_ctx,
    })
}
