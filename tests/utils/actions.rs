use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Send a request through the router and decode the JSON body
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    /// Record a game for `user_id` with the given status and difficulty
    pub async fn record_game(
        &self,
        user_id: i64,
        username: &str,
        status: &str,
        difficulty: &str,
    ) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/game-result",
            Some(json!({
                "user_id": user_id,
                "username": username,
                "status": status,
                "difficulty": difficulty,
            })),
        )
        .await
    }

    /// Record a win and return the promo code it earned
    pub async fn record_win(&self, user_id: i64) -> String {
        let (status, body) = self.record_game(user_id, "player", "win", "master").await;
        assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
        body["promo_code"]
            .as_str()
            .expect("win should return a promo code")
            .to_string()
    }

    /// Redeem `code` on behalf of `user_id`
    pub async fn redeem(&self, code: &str, user_id: i64) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/promo-code/validate",
            Some(json!({ "code": code, "user_id": user_id })),
        )
        .await
    }
}
