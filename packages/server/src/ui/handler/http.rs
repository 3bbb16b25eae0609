//! HTTP endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::infrastructure::dto::http::{HealthResponse, ServerStats};
use crate::ui::state::AppState;

/// GET /api/health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /api/stats
pub async fn server_stats(State(state): State<Arc<AppState>>) -> Json<ServerStats> {
    let active_sessions = state.store.lock().await.session_count();
    Json(ServerStats { active_sessions })
}
