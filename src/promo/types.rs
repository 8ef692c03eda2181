use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::PromoCode;
use crate::shared::AppError;

/// Accepted promo code length range, inclusive
pub const MIN_CODE_LEN: usize = 5;
pub const MAX_CODE_LEN: usize = 10;

/// Request payload for redeeming a promo code
#[derive(Debug, Deserialize)]
pub struct PromoCodeValidationRequest {
    pub code: String,
    #[serde(alias = "userId")]
    pub user_id: i64,
}

impl PromoCodeValidationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let len = self.code.chars().count();
        if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&len) {
            return Err(AppError::Validation(format!(
                "Promo code must be {MIN_CODE_LEN} to {MAX_CODE_LEN} characters long"
            )));
        }
        if self.user_id <= 0 {
            return Err(AppError::Validation(
                "user_id must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Response for a successful redemption
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PromoCodeResponse {
    pub code: String,
    pub is_valid: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PromoCodeResponse {
    /// Response for a code that was just consumed
    pub fn redeemed(promo: PromoCode) -> Self {
        Self {
            code: promo.code,
            is_valid: true,
            used_at: promo.used_at,
            created_at: promo.created_at,
        }
    }
}
