use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use super::{ResultFilter, Store, StoreError, StoreTransaction};
use crate::game::models::GameResult;
use crate::promo::models::PromoCode;
use crate::user::User;

/// On-disk layout: users keyed by stringified id, an append-only result list,
/// promo codes keyed by code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub users: BTreeMap<String, User>,
    #[serde(default)]
    pub game_results: Vec<GameResult>,
    #[serde(default)]
    pub promo_codes: BTreeMap<String, PromoCode>,
}

/// Store backed by a single JSON document
///
/// The whole document is cached in memory behind one mutex. A transaction owns
/// that mutex for its lifetime and works on a copy, so a dropped transaction
/// leaves both the cache and the file untouched. Without a path the store is
/// purely in memory, which is what tests and local development use.
pub struct JsonFileStore {
    path: Option<PathBuf>,
    document: Arc<Mutex<StoreDocument>>,
}

impl JsonFileStore {
    /// Loads the document at `path`, starting empty if the file does not exist yet
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let document: StoreDocument = serde_json::from_slice(&bytes)?;
                info!(
                    users = document.users.len(),
                    game_results = document.game_results.len(),
                    promo_codes = document.promo_codes.len(),
                    "Loaded store document"
                );
                document
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Store file not found, starting with an empty document");
                StoreDocument::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            document: Arc::new(Mutex::new(document)),
        })
    }

    /// Creates a store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self::with_document(StoreDocument::default())
    }

    /// Creates an in-memory store pre-populated with `document`
    pub fn with_document(document: StoreDocument) -> Self {
        Self {
            path: None,
            document: Arc::new(Mutex::new(document)),
        }
    }

    /// Copy of the current committed document
    pub async fn snapshot(&self) -> StoreDocument {
        self.document.lock().await.clone()
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Writes the document next to `path` and renames it into place
async fn persist(path: &Path, document: &StoreDocument) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(document)?;

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    tokio::fs::write(&tmp_path, &bytes).await?;
    tokio::fs::rename(&tmp_path, path).await?;

    debug!(path = %path.display(), bytes = bytes.len(), "Store document written");
    Ok(())
}

#[async_trait]
impl Store for JsonFileStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = Arc::clone(&self.document).lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(JsonFileTransaction {
            guard,
            working,
            path: self.path.clone(),
        }))
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let document = self.document.lock().await;
        Ok(document.users.get(&user_id.to_string()).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let document = self.document.lock().await;
        Ok(document.users.values().cloned().collect())
    }

    async fn find_results(&self, filter: ResultFilter) -> Result<Vec<GameResult>, StoreError> {
        let document = self.document.lock().await;
        let mut results: Vec<GameResult> = document
            .game_results
            .iter()
            .filter(|result| filter.matches(result))
            .cloned()
            .collect();
        results.sort_by_key(|result| result.id);
        Ok(results)
    }

    async fn get_promo_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        let document = self.document.lock().await;
        Ok(document.promo_codes.get(code).cloned())
    }

    #[instrument(skip(self))]
    async fn close(&self) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            let document = self.document.lock().await;
            persist(path, &document).await?;
            info!(path = %path.display(), "JSON file store closed");
        }
        Ok(())
    }
}

pub struct JsonFileTransaction {
    guard: OwnedMutexGuard<StoreDocument>,
    working: StoreDocument,
    path: Option<PathBuf>,
}

#[async_trait]
impl StoreTransaction for JsonFileTransaction {
    async fn get_user(&mut self, user_id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.working.users.get(&user_id.to_string()).cloned())
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        let key = user.id.to_string();
        if self.working.users.contains_key(&key) {
            warn!(user_id = user.id, "User already exists in document");
            return Err(StoreError::Duplicate(format!("user {}", user.id)));
        }
        self.working.users.insert(key, user.clone());
        Ok(())
    }

    async fn next_result_id(&mut self) -> Result<i64, StoreError> {
        let max_id = self.working.game_results.iter().map(|r| r.id).max();
        Ok(max_id.unwrap_or(0) + 1)
    }

    async fn insert_result(&mut self, result: &GameResult) -> Result<(), StoreError> {
        if self.working.game_results.iter().any(|r| r.id == result.id) {
            warn!(result_id = result.id, "Game result id already taken");
            return Err(StoreError::Duplicate(format!("game result {}", result.id)));
        }
        self.working.game_results.push(result.clone());
        Ok(())
    }

    async fn promo_code_exists(&mut self, code: &str) -> Result<bool, StoreError> {
        Ok(self.working.promo_codes.contains_key(code))
    }

    async fn insert_promo_code(&mut self, promo: &PromoCode) -> Result<(), StoreError> {
        if self.working.promo_codes.contains_key(&promo.code) {
            return Err(StoreError::Duplicate(format!("promo code {}", promo.code)));
        }
        self.working
            .promo_codes
            .insert(promo.code.clone(), promo.clone());
        Ok(())
    }

    async fn get_promo_code(&mut self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        Ok(self.working.promo_codes.get(code).cloned())
    }

    async fn mark_promo_used(
        &mut self,
        code: &str,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self.working.promo_codes.get_mut(code) {
            Some(promo) if !promo.is_used => {
                promo.mark_used(used_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let JsonFileTransaction {
            mut guard,
            working,
            path,
        } = *self;

        // Disk first: the cache never runs ahead of the file
        if let Some(path) = &path {
            persist(path, &working).await?;
        }
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::models::{Difficulty, GameOutcome};
    use tempfile::TempDir;

    mod helpers {
        use super::*;

        pub fn create_test_result(id: i64, user_id: i64, outcome: GameOutcome) -> GameResult {
            GameResult {
                id,
                user_id,
                outcome,
                difficulty: Difficulty::Strategic,
                created_at: Utc::now(),
            }
        }

        /// Commits one user, one winning result and its promo code
        pub async fn seed_win(store: &JsonFileStore, user_id: i64, code: &str) {
            let mut tx = store.begin().await.unwrap();
            tx.insert_user(&User::new(user_id, Some("rose")))
                .await
                .unwrap();
            let id = tx.next_result_id().await.unwrap();
            tx.insert_result(&create_test_result(id, user_id, GameOutcome::Win))
                .await
                .unwrap();
            tx.insert_promo_code(&PromoCode::new(code.to_string(), user_id, Some(id), None))
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }
    }

    use helpers::*;

    #[tokio::test]
    async fn test_committed_writes_are_visible() {
        let store = JsonFileStore::in_memory();
        seed_win(&store, 1, "12345").await;

        assert!(store.get_user(1).await.unwrap().is_some());
        assert_eq!(store.find_results(ResultFilter::all()).await.unwrap().len(), 1);
        let promo = store.get_promo_code("12345").await.unwrap().unwrap();
        assert_eq!(promo.game_result_id, Some(1));
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = JsonFileStore::in_memory();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_user(&User::new(1, None)).await.unwrap();
            tx.insert_result(&create_test_result(1, 1, GameOutcome::Loss))
                .await
                .unwrap();
        }

        assert!(store.get_user(1).await.unwrap().is_none());
        assert!(store
            .find_results(ResultFilter::all())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_next_result_id_follows_maximum() {
        let store = JsonFileStore::in_memory();
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.next_result_id().await.unwrap(), 1);

        tx.insert_result(&create_test_result(4, 1, GameOutcome::Draw))
            .await
            .unwrap();
        assert_eq!(tx.next_result_id().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_duplicate_keys_are_rejected() {
        let store = JsonFileStore::in_memory();
        seed_win(&store, 1, "12345").await;

        let mut tx = store.begin().await.unwrap();
        let user_err = tx.insert_user(&User::new(1, None)).await.unwrap_err();
        assert!(matches!(user_err, StoreError::Duplicate(_)));

        let result_err = tx
            .insert_result(&create_test_result(1, 1, GameOutcome::Win))
            .await
            .unwrap_err();
        assert!(matches!(result_err, StoreError::Duplicate(_)));

        let promo_err = tx
            .insert_promo_code(&PromoCode::new("12345".to_string(), 2, None, None))
            .await
            .unwrap_err();
        assert!(matches!(promo_err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_mark_promo_used_only_once() {
        let store = JsonFileStore::in_memory();
        seed_win(&store, 1, "54321").await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.mark_promo_used("54321", Utc::now()).await.unwrap());
        assert!(!tx.mark_promo_used("54321", Utc::now()).await.unwrap());
        assert!(!tx.mark_promo_used("00000", Utc::now()).await.unwrap());
        tx.commit().await.unwrap();

        let promo = store.get_promo_code("54321").await.unwrap().unwrap();
        assert!(promo.is_used);
        assert!(promo.used_at.is_some());
    }

    #[tokio::test]
    async fn test_find_results_applies_filter() {
        let store = JsonFileStore::in_memory();
        let mut tx = store.begin().await.unwrap();
        tx.insert_result(&create_test_result(1, 1, GameOutcome::Win))
            .await
            .unwrap();
        tx.insert_result(&create_test_result(2, 2, GameOutcome::Win))
            .await
            .unwrap();
        tx.insert_result(&create_test_result(3, 1, GameOutcome::Loss))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let user_one = store
            .find_results(ResultFilter::all().for_user(1))
            .await
            .unwrap();
        assert_eq!(
            user_one.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![1, 3]
        );

        let wins = store
            .find_results(ResultFilter::all().with_outcome(GameOutcome::Win))
            .await
            .unwrap();
        assert_eq!(wins.len(), 2);
    }

    #[tokio::test]
    async fn test_document_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game_data.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        seed_win(&store, 77, "67890").await;
        store.close().await.unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let user = reopened.get_user(77).await.unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("rose"));
        assert!(reopened.get_promo_code("67890").await.unwrap().is_some());
        assert_eq!(
            reopened
                .find_results(ResultFilter::all())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_file_layout_uses_keyed_collections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game_data.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        seed_win(&store, 3, "11111").await;

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(raw["users"]["3"].is_object());
        assert_eq!(raw["game_results"][0]["status"], "win");
        assert_eq!(raw["promo_codes"]["11111"]["is_used"], false);
    }

    #[tokio::test]
    async fn test_open_rejects_malformed_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let result = JsonFileStore::open(&path).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
