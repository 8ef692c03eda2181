use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::models::{Difficulty, GameOutcome, GameResult};
use crate::promo::{models::PromoCode, service::PromoIssuer};
use crate::shared::AppError;
use crate::store::{Store, StoreTransaction};
use crate::user::User;

/// A validated finished-game submission
#[derive(Debug, Clone)]
pub struct NewGameResult {
    pub user_id: i64,
    pub username: Option<String>,
    pub outcome: GameOutcome,
    pub difficulty: Difficulty,
}

/// A stored result together with the code it earned, if any
#[derive(Debug, Clone)]
pub struct RecordedGame {
    pub result: GameResult,
    pub promo_code: Option<PromoCode>,
}

/// Records finished games and rewards wins with a promo code
pub struct GameResultService {
    store: Arc<dyn Store>,
    issuer: PromoIssuer,
}

impl GameResultService {
    pub fn new(store: Arc<dyn Store>, issuer: PromoIssuer) -> Self {
        Self { store, issuer }
    }

    /// Stores a result, creating the user on first sight. A win also gets a
    /// promo code in the same transaction; if issuance fails nothing is stored.
    #[instrument(skip(self, submission), fields(user_id = submission.user_id, outcome = %submission.outcome))]
    pub async fn record_result(&self, submission: NewGameResult) -> Result<RecordedGame, AppError> {
        if submission.user_id <= 0 {
            return Err(AppError::Validation(
                "user_id must be a positive integer".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;

        ensure_user(
            tx.as_mut(),
            submission.user_id,
            submission.username.as_deref(),
        )
        .await?;

        let result = GameResult {
            id: tx.next_result_id().await?,
            user_id: submission.user_id,
            outcome: submission.outcome,
            difficulty: submission.difficulty,
            created_at: Utc::now(),
        };
        tx.insert_result(&result).await?;

        let promo_code = if result.is_win() {
            Some(
                self.issuer
                    .issue_for_win(tx.as_mut(), result.user_id, result.id)
                    .await?,
            )
        } else {
            None
        };

        tx.commit().await?;

        info!(
            result_id = result.id,
            difficulty = %result.difficulty,
            promo_issued = promo_code.is_some(),
            "Game result recorded"
        );

        Ok(RecordedGame { result, promo_code })
    }
}

/// Creates the user if missing. An existing user's name is never overwritten.
async fn ensure_user(
    tx: &mut dyn StoreTransaction,
    user_id: i64,
    username: Option<&str>,
) -> Result<(), AppError> {
    if tx.get_user(user_id).await?.is_some() {
        return Ok(());
    }

    let user = User::new(user_id, username);
    tx.insert_user(&user).await?;
    debug!(user_id = user_id, username = ?user.username, "User created on first game");
    Ok(())
}
