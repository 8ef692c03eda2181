use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Outcome of a finished game from the player's perspective
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
    Draw,
}

/// AI strength the game was played against. Informational only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Relaxed,
    Strategic,
    Master,
}

/// A recorded game. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub id: i64, // Store-assigned, strictly increasing
    pub user_id: i64,
    #[serde(rename = "status")]
    pub outcome: GameOutcome,
    pub difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
}

impl GameResult {
    pub fn is_win(&self) -> bool {
        self.outcome == GameOutcome::Win
    }
}
