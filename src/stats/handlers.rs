use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use tracing::{info, instrument};

use super::{
    models::{LeaderboardEntry, SimpleStatsResponse, UserStats},
    service::StatsService,
};
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// GET /user/:id/stats
#[instrument(name = "get_user_stats", skip(state, user_id))]
pub async fn get_user_stats(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserStats>, AppError> {
    let Path(user_id) = user_id?;
    let stats = state.stats_service().user_stats(user_id).await?;

    info!(
        user_id = user_id,
        total_games = stats.total_games,
        "User stats served"
    );
    Ok(Json(stats))
}

/// GET /user/:id/stats/simple
#[instrument(name = "get_user_stats_simple", skip(state, user_id))]
pub async fn get_user_stats_simple(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SimpleStatsResponse>, AppError> {
    let Path(user_id) = user_id?;
    Ok(Json(state.stats_service().simple_stats(user_id).await?))
}

/// HTTP handler for the win leaderboard
///
/// GET /leaderboard?limit=N
/// Returns at most N users ordered by wins, 10 when no limit is given
#[instrument(name = "get_leaderboard", skip(state, query))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(StatsService::DEFAULT_LEADERBOARD_LIMIT);

    let entries = state.stats_service().leaderboard(limit).await?;

    info!(limit = limit, entries = entries.len(), "Leaderboard served");
    Ok(Json(entries))
}
