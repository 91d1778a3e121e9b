//! Log handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::StatusMessage;
use crate::state::AppState;

/// `GET /api/logs` - captured output of the current (or last) session.
pub async fn list(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.controller.logs())
}

/// `POST /api/logs/clear`
pub async fn clear(State(state): State<AppState>) -> Json<StatusMessage> {
    state.controller.clear_logs();
    Json(StatusMessage::new("cleared"))
}
