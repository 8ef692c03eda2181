use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::models::{rank_by_wins, LeaderboardEntry, OutcomeCounts, SimpleStatsResponse, UserStats};
use crate::game::models::GameOutcome;
use crate::shared::AppError;
use crate::store::{ResultFilter, Store};

/// Read-only aggregation over recorded results
pub struct StatsService {
    store: Arc<dyn Store>,
}

impl StatsService {
    pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn user_stats(&self, user_id: i64) -> Result<UserStats, AppError> {
        let Some(user) = self.store.get_user(user_id).await? else {
            debug!("Unknown user, returning empty stats");
            return Ok(UserStats::empty(user_id));
        };

        let results = self
            .store
            .find_results(ResultFilter::all().for_user(user_id))
            .await?;
        Ok(UserStats::from_results(user_id, Some(&user), &results))
    }

    #[instrument(skip(self))]
    pub async fn simple_stats(&self, user_id: i64) -> Result<SimpleStatsResponse, AppError> {
        let results = self
            .store
            .find_results(ResultFilter::all().for_user(user_id))
            .await?;
        Ok(SimpleStatsResponse {
            user_id,
            stats: OutcomeCounts::from_results(&results),
        })
    }

    #[instrument(skip(self))]
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, AppError> {
        let wins = self
            .store
            .find_results(ResultFilter::all().with_outcome(GameOutcome::Win))
            .await?;
        let users: HashMap<_, _> = self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        Ok(rank_by_wins(&wins, &users, limit))
    }
}
