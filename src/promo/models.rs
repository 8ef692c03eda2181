use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A one-time reward code. `is_used` flips from false to true exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub user_id: i64,
    pub game_result_id: Option<i64>, // None for codes issued outside a game
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PromoCode {
    /// Creates an unused code. With a TTL the code expires that long after creation.
    pub fn new(
        code: String,
        user_id: i64,
        game_result_id: Option<i64>,
        ttl: Option<Duration>,
    ) -> Self {
        let now = Utc::now();
        Self {
            code,
            user_id,
            game_result_id,
            is_used: false,
            used_at: None,
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn mark_used(&mut self, used_at: DateTime<Utc>) {
        self.is_used = true;
        self.used_at = Some(used_at);
    }
}
