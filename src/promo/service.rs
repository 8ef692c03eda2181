use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{generators::CodeGenerator, models::PromoCode};
use crate::shared::AppError;
use crate::store::{Store, StoreTransaction};

/// Who may redeem a code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedemptionPolicy {
    /// Any requester holding the code may redeem it
    #[default]
    AnyRequester,
    /// Only the user the code was issued to; others see the code as unknown
    OwnerOnly,
}

/// Configuration for promo code issuance and redemption
#[derive(Debug, Clone)]
pub struct PromoConfig {
    pub max_attempts: u32,
    pub ttl: Option<Duration>,
    pub redemption_policy: RedemptionPolicy,
}

impl PromoConfig {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
}

impl Default for PromoConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            ttl: None,
            redemption_policy: RedemptionPolicy::AnyRequester,
        }
    }
}

/// Mints reward codes for winning results
///
/// Issuance runs inside the caller's transaction so the result and its code
/// become visible together.
pub struct PromoIssuer {
    generator: Arc<dyn CodeGenerator>,
    config: PromoConfig,
}

impl PromoIssuer {
    pub fn new(generator: Arc<dyn CodeGenerator>, config: PromoConfig) -> Self {
        Self { generator, config }
    }

    #[instrument(skip(self, tx))]
    pub async fn issue_for_win(
        &self,
        tx: &mut dyn StoreTransaction,
        user_id: i64,
        game_result_id: i64,
    ) -> Result<PromoCode, AppError> {
        let code = self.unused_code(tx).await?;
        let promo = PromoCode::new(code, user_id, Some(game_result_id), self.config.ttl);
        tx.insert_promo_code(&promo).await?;

        info!(
            code = %promo.code,
            user_id = user_id,
            game_result_id = game_result_id,
            "Promo code issued"
        );
        Ok(promo)
    }

    /// Draws candidates until one is not yet stored, at most `max_attempts` times
    async fn unused_code(&self, tx: &mut dyn StoreTransaction) -> Result<String, AppError> {
        for attempt in 1..=self.config.max_attempts {
            let candidate = self.generator.generate();
            if !tx.promo_code_exists(&candidate).await? {
                return Ok(candidate);
            }
            debug!(attempt = attempt, code = %candidate, "Promo code collision, retrying");
        }
        Err(AppError::CodeSpaceExhausted(self.config.max_attempts))
    }
}

/// Validates and consumes promo codes
pub struct PromoRedeemer {
    store: Arc<dyn Store>,
    policy: RedemptionPolicy,
}

impl PromoRedeemer {
    pub fn new(store: Arc<dyn Store>, policy: RedemptionPolicy) -> Self {
        Self { store, policy }
    }

    /// Marks `code` as used and returns the updated record
    ///
    /// Concurrent calls for the same code are serialized by the store
    /// transaction, and the final flip is conditional on the code still being
    /// unused, so exactly one of them succeeds.
    #[instrument(skip(self))]
    pub async fn redeem(&self, code: &str, user_id: i64) -> Result<PromoCode, AppError> {
        let mut tx = self.store.begin().await?;

        let mut promo = tx
            .get_promo_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Promo code {code} not found")))?;

        if self.policy == RedemptionPolicy::OwnerOnly && promo.user_id != user_id {
            debug!(owner = promo.user_id, "Redemption attempted by a different user");
            return Err(AppError::NotFound(format!("Promo code {code} not found")));
        }

        if promo.is_used {
            return Err(AppError::AlreadyUsed(code.to_string()));
        }

        let now = Utc::now();
        if promo.is_expired_at(now) {
            return Err(AppError::Expired(code.to_string()));
        }

        if !tx.mark_promo_used(code, now).await? {
            return Err(AppError::AlreadyUsed(code.to_string()));
        }
        tx.commit().await?;

        promo.mark_used(now);
        info!(code = %code, owner = promo.user_id, "Promo code redeemed");
        Ok(promo)
    }
}
