use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::models::{Difficulty, GameOutcome};
use super::service::{NewGameResult, RecordedGame};
use crate::shared::AppError;
use crate::user::models::normalize_username;

/// Request payload for recording a finished game
///
/// `status` and `difficulty` stay raw strings so an unknown value becomes a
/// validation error with a readable message.
#[derive(Debug, Deserialize)]
pub struct GameResultRequest {
    #[serde(alias = "userId")]
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    pub status: String,
    pub difficulty: String,
}

impl TryFrom<GameResultRequest> for NewGameResult {
    type Error = AppError;

    fn try_from(request: GameResultRequest) -> Result<Self, Self::Error> {
        let outcome = GameOutcome::from_str(&request.status).map_err(|_| {
            AppError::Validation(format!(
                "status must be one of win, loss, draw (got '{}')",
                request.status
            ))
        })?;
        let difficulty = Difficulty::from_str(&request.difficulty).map_err(|_| {
            AppError::Validation(format!(
                "difficulty must be one of relaxed, strategic, master (got '{}')",
                request.difficulty
            ))
        })?;

        Ok(NewGameResult {
            user_id: request.user_id,
            username: normalize_username(request.username.as_deref()),
            outcome,
            difficulty,
        })
    }
}

/// Response for a recorded game
#[derive(Debug, Serialize, Deserialize)]
pub struct GameResultResponse {
    pub id: i64,
    pub user_id: i64,
    pub status: GameOutcome,
    pub difficulty: Difficulty,
    pub promo_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<RecordedGame> for GameResultResponse {
    fn from(recorded: RecordedGame) -> Self {
        Self {
            id: recorded.result.id,
            user_id: recorded.result.user_id,
            status: recorded.result.outcome,
            difficulty: recorded.result.difficulty,
            promo_code: recorded.promo_code.map(|promo| promo.code),
            created_at: recorded.result.created_at,
        }
    }
}
