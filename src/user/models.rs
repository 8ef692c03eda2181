use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A player, identified by the chat platform's numeric user id.
/// Created lazily the first time a game is submitted for that id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: i64, username: Option<&str>) -> Self {
        Self {
            id,
            username: normalize_username(username),
            created_at: Utc::now(),
        }
    }
}

/// Blank display names are treated as absent
pub fn normalize_username(username: Option<&str>) -> Option<String> {
    username
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
