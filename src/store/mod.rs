//! Persistence for users, game results and promo codes.
//!
//! Both engines sit behind [`Store`]: reads go straight to the store, every
//! read-modify-write goes through a [`StoreTransaction`] obtained from
//! [`Store::begin`]. Open transactions exclude each other, and a transaction
//! dropped without [`StoreTransaction::commit`] leaves no trace.

mod errors;
pub mod json_file;
pub mod sqlite;

pub use errors::StoreError;
pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::config::StoreBackend;
use crate::game::models::{GameOutcome, GameResult};
use crate::promo::models::PromoCode;
use crate::user::User;

/// Selects game results. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultFilter {
    pub user_id: Option<i64>,
    pub outcome: Option<GameOutcome>,
}

impl ResultFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_outcome(mut self, outcome: GameOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn matches(&self, result: &GameResult) -> bool {
        self.user_id.map_or(true, |id| result.user_id == id)
            && self.outcome.map_or(true, |outcome| result.outcome == outcome)
    }
}

/// Read side of the store plus the entry point for writes
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a unit of work. Waits until any other open transaction finishes.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Matching results in ascending id order
    async fn find_results(&self, filter: ResultFilter) -> Result<Vec<GameResult>, StoreError>;

    async fn get_promo_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError>;

    /// Flushes and releases the underlying resources. Called once at shutdown.
    async fn close(&self) -> Result<(), StoreError>;
}

/// Exclusive read-modify-write access to the store
#[async_trait]
pub trait StoreTransaction: Send {
    async fn get_user(&mut self, user_id: i64) -> Result<Option<User>, StoreError>;
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError>;

    /// One greater than the largest stored result id, or 1 for an empty store
    async fn next_result_id(&mut self) -> Result<i64, StoreError>;
    async fn insert_result(&mut self, result: &GameResult) -> Result<(), StoreError>;

    async fn promo_code_exists(&mut self, code: &str) -> Result<bool, StoreError>;
    async fn insert_promo_code(&mut self, promo: &PromoCode) -> Result<(), StoreError>;
    async fn get_promo_code(&mut self, code: &str) -> Result<Option<PromoCode>, StoreError>;

    /// Marks an unused code as used. Returns false if the code is missing or
    /// already used, in which case nothing changes.
    async fn mark_promo_used(
        &mut self,
        code: &str,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Opens the engine selected by configuration
pub async fn open_store(backend: &StoreBackend) -> Result<Arc<dyn Store>, StoreError> {
    match backend {
        StoreBackend::JsonFile { path } => {
            info!(path = %path.display(), "Opening JSON file store");
            Ok(Arc::new(JsonFileStore::open(path).await?))
        }
        StoreBackend::Sqlite { database_url } => {
            info!(database_url = %database_url, "Opening SQLite store");
            Ok(Arc::new(SqliteStore::connect(database_url).await?))
        }
    }
}
