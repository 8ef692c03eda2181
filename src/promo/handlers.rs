use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{info, instrument};

use super::types::{PromoCodeResponse, PromoCodeValidationRequest};
use crate::shared::{AppError, AppState};

/// HTTP handler for redeeming a promo code
///
/// POST /promo-code/validate
/// Marks the code as used; a second redemption fails with 400
#[instrument(name = "validate_promo_code", skip(state, payload))]
pub async fn validate_promo_code(
    State(state): State<AppState>,
    payload: Result<Json<PromoCodeValidationRequest>, JsonRejection>,
) -> Result<Json<PromoCodeResponse>, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    info!(code = %request.code, user_id = request.user_id, "Redeeming promo code");

    let promo = state
        .promo_redeemer()
        .redeem(&request.code, request.user_id)
        .await?;

    Ok(Json(PromoCodeResponse::redeemed(promo)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promo::models::PromoCode;
    use crate::shared::test_utils::AppStateBuilder;
    use crate::store::{JsonFileStore, Store};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    async fn app_with_code(code: &str) -> Router {
        let store = Arc::new(JsonFileStore::in_memory());
        let mut tx = store.begin().await.unwrap();
        tx.insert_promo_code(&PromoCode::new(code.to_string(), 1, None, None))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let app_state = AppStateBuilder::new().with_store(store).build();
        Router::new()
            .route(
                "/promo-code/validate",
                axum::routing::post(validate_promo_code),
            )
            .with_state(app_state)
    }

    async fn post(app: Router, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri("/promo-code/validate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_validate_unused_code() {
        let app = app_with_code("12345").await;

        let response = post(app, r#"{"code": "12345", "user_id": 1}"#).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let promo: PromoCodeResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(promo.code, "12345");
        assert!(promo.is_valid);
        assert!(promo.used_at.is_some());
    }

    #[tokio::test]
    async fn test_validate_used_code_is_bad_request() {
        let app = app_with_code("12345").await;

        let first = post(app.clone(), r#"{"code": "12345", "user_id": 1}"#).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = post(app, r#"{"code": "12345", "user_id": 1}"#).await;
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);
        let json = json_body(second).await;
        assert!(json["error"].as_str().unwrap().contains("already used"));
    }

    #[tokio::test]
    async fn test_validate_unknown_code_is_not_found() {
        let app = app_with_code("12345").await;

        let response = post(app, r#"{"code": "54321", "userId": 1}"#).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validate_rejects_short_code() {
        let app = app_with_code("12345").await;

        let response = post(app, r#"{"code": "123", "user_id": 1}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_validate_invalid_json_is_bad_request() {
        let app = app_with_code("12345").await;

        let response = post(app, r#"{"code": 12345"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["error"].is_string());
    }
}
