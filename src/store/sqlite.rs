use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use super::{ResultFilter, Store, StoreError, StoreTransaction};
use crate::game::models::GameResult;
use crate::promo::models::PromoCode;
use crate::user::User;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        username TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS game_results (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id),
        status TEXT NOT NULL CHECK (status IN ('win', 'loss', 'draw')),
        difficulty TEXT NOT NULL CHECK (difficulty IN ('relaxed', 'strategic', 'master')),
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_game_results_user_id ON game_results(user_id)",
    "CREATE TABLE IF NOT EXISTS promo_codes (
        code TEXT PRIMARY KEY NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(id),
        game_result_id INTEGER REFERENCES game_results(id),
        is_used INTEGER NOT NULL DEFAULT 0,
        used_at TEXT,
        created_at TEXT NOT NULL,
        expires_at TEXT
    )",
];

const USER_COLUMNS: &str = "id, username, created_at";
const RESULT_COLUMNS: &str = "id, user_id, status, difficulty, created_at";
const PROMO_COLUMNS: &str =
    "code, user_id, game_result_id, is_used, used_at, created_at, expires_at";

/// Relational store on SQLite
///
/// Write transactions are serialized in-process by `write_lock`; the primary
/// key on `promo_codes.code` and the conditional update in
/// [`StoreTransaction::mark_promo_used`] hold the same invariants at the
/// database level.
pub struct SqliteStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl SqliteStore {
    /// Connects to `database_url` (e.g. `sqlite://game_data.db` or
    /// `sqlite::memory:`) and creates the schema if needed
    #[instrument]
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let in_memory = database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is its own database, so the pool
        // must keep exactly one connection alive
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        info!("SQLite schema ready");

        Ok(Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        })
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        created_at: row.try_get("created_at")?,
    })
}

fn result_from_row(row: &SqliteRow) -> Result<GameResult, StoreError> {
    let status: String = row.try_get("status")?;
    let difficulty: String = row.try_get("difficulty")?;

    Ok(GameResult {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        outcome: status
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("unknown game status '{status}'")))?,
        difficulty: difficulty
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("unknown difficulty '{difficulty}'")))?,
        created_at: row.try_get("created_at")?,
    })
}

fn promo_from_row(row: &SqliteRow) -> Result<PromoCode, StoreError> {
    Ok(PromoCode {
        code: row.try_get("code")?,
        user_id: row.try_get("user_id")?,
        game_result_id: row.try_get("game_result_id")?,
        is_used: row.try_get::<i64, _>("is_used")? != 0,
        used_at: row.try_get("used_at")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

/// Maps unique-constraint violations to [`StoreError::Duplicate`]
fn duplicate_or(err: sqlx::Error, what: String) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            warn!(key = %what, "Unique constraint violated");
            StoreError::Duplicate(what)
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let write_guard = Arc::clone(&self.write_lock).lock_owned().await;
        let tx = self.pool.begin().await?;
        debug!("SQLite transaction started");

        Ok(Box::new(SqliteTransaction {
            tx,
            _write_guard: write_guard,
        }))
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn find_results(&self, filter: ResultFilter) -> Result<Vec<GameResult>, StoreError> {
        let mut sql = format!("SELECT {RESULT_COLUMNS} FROM game_results WHERE 1 = 1");
        if filter.user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }
        if filter.outcome.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query(&sql);
        if let Some(user_id) = filter.user_id {
            query = query.bind(user_id);
        }
        if let Some(outcome) = filter.outcome {
            query = query.bind(outcome.to_string());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(result_from_row).collect()
    }

    async fn get_promo_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PROMO_COLUMNS} FROM promo_codes WHERE code = ?"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(promo_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close().await;
        info!("SQLite store closed");
        Ok(())
    }
}

pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
    _write_guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn get_user(&mut self, user_id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, ?)")
            .bind(user.id)
            .bind(&user.username)
            .bind(user.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| duplicate_or(e, format!("user {}", user.id)))?;
        Ok(())
    }

    async fn next_result_id(&mut self) -> Result<i64, StoreError> {
        let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM game_results")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(next)
    }

    async fn insert_result(&mut self, result: &GameResult) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO game_results (id, user_id, status, difficulty, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(result.id)
        .bind(result.user_id)
        .bind(result.outcome.to_string())
        .bind(result.difficulty.to_string())
        .bind(result.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| duplicate_or(e, format!("game result {}", result.id)))?;
        Ok(())
    }

    async fn promo_code_exists(&mut self, code: &str) -> Result<bool, StoreError> {
        let matches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM promo_codes WHERE code = ?")
            .bind(code)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(matches > 0)
    }

    async fn insert_promo_code(&mut self, promo: &PromoCode) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO promo_codes ({PROMO_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&promo.code)
        .bind(promo.user_id)
        .bind(promo.game_result_id)
        .bind(promo.is_used)
        .bind(promo.used_at)
        .bind(promo.created_at)
        .bind(promo.expires_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| duplicate_or(e, format!("promo code {}", promo.code)))?;
        Ok(())
    }

    async fn get_promo_code(&mut self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PROMO_COLUMNS} FROM promo_codes WHERE code = ?"
        ))
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(promo_from_row).transpose()
    }

    async fn mark_promo_used(
        &mut self,
        code: &str,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE promo_codes SET is_used = 1, used_at = ? WHERE code = ? AND is_used = 0")
                .bind(used_at)
                .bind(code)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.tx.commit().await?;
        debug!("SQLite transaction committed");
        Ok(())
    }
}
