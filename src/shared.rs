use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::game::service::GameResultService;
use crate::promo::{
    generators::CodeGenerator,
    service::{PromoConfig, PromoIssuer, PromoRedeemer},
};
use crate::stats::service::StatsService;
use crate::store::{Store, StoreError};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub code_generator: Arc<dyn CodeGenerator>,
    pub promo_config: PromoConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        code_generator: Arc<dyn CodeGenerator>,
        promo_config: PromoConfig,
    ) -> Self {
        Self {
            store,
            code_generator,
            promo_config,
        }
    }

    pub fn game_result_service(&self) -> GameResultService {
        let issuer = PromoIssuer::new(
            Arc::clone(&self.code_generator),
            self.promo_config.clone(),
        );
        GameResultService::new(Arc::clone(&self.store), issuer)
    }

    pub fn promo_redeemer(&self) -> PromoRedeemer {
        PromoRedeemer::new(
            Arc::clone(&self.store),
            self.promo_config.redemption_policy,
        )
    }

    pub fn stats_service(&self) -> StatsService {
        StatsService::new(Arc::clone(&self.store))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Promo code {0} already used")]
    AlreadyUsed(String),

    #[error("Promo code {0} has expired")]
    Expired(String),

    #[error("No unused promo code found after {0} attempts")]
    CodeSpaceExhausted(u32),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::AlreadyUsed(_) | AppError::Expired(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::CodeSpaceExhausted(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Expected client failures log at info, server failures at error
        let error_message = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) => {
                info!(status = status.as_u16(), reason = %msg, "Request rejected");
                msg.clone()
            }
            AppError::AlreadyUsed(_) | AppError::Expired(_) => {
                info!(status = status.as_u16(), reason = %self, "Request rejected");
                self.to_string()
            }
            AppError::CodeSpaceExhausted(attempts) => {
                error!(
                    attempts = attempts,
                    "Promo code space exhausted, consider widening the code format"
                );
                "Could not allocate a promo code".to_string()
            }
            AppError::Internal(msg) => {
                error!(error = %msg, "Internal server error");
                "Internal server error".to_string()
            }
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
