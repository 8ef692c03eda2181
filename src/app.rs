use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::game::handlers::record_game_result;
use crate::promo::handlers::validate_promo_code;
use crate::shared::AppState;
use crate::stats::handlers::{get_leaderboard, get_user_stats, get_user_stats_simple};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// GET /
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Tic-tac-toe backend is running".to_string(),
        timestamp: Utc::now(),
    })
}

/// Builds the HTTP router with every route wired to `state`
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/game-result", post(record_game_result))
        .route("/user/:id/stats", get(get_user_stats))
        .route("/user/:id/stats/simple", get(get_user_stats_simple))
        .route("/promo-code/validate", post(validate_promo_code))
        .route("/leaderboard", get(get_leaderboard))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
