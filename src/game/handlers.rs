use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{info, instrument};

use super::service::NewGameResult;
use super::types::{GameResultRequest, GameResultResponse};
use crate::shared::{AppError, AppState};

/// HTTP handler for recording a finished game
///
/// POST /game-result
/// Returns the stored result; wins carry a fresh promo code
#[instrument(name = "record_game_result", skip(state, payload))]
pub async fn record_game_result(
    State(state): State<AppState>,
    payload: Result<Json<GameResultRequest>, JsonRejection>,
) -> Result<Json<GameResultResponse>, AppError> {
    let Json(request) = payload?;
    let submission = NewGameResult::try_from(request)?;

    info!(
        user_id = submission.user_id,
        status = %submission.outcome,
        difficulty = %submission.difficulty,
        "Recording game result"
    );

    let recorded = state.game_result_service().record_result(submission).await?;

    Ok(Json(recorded.into()))
}
