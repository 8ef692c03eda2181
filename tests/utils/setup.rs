use axum::Router;
use std::sync::Arc;
use tempfile::TempDir;

use tictactoe_backend::{
    build_router,
    promo::{CodeGenerator, NumericCodeGenerator},
    AppState, JsonFileStore, PromoConfig, SqliteStore, Store,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// Storage engine a test runs against
#[derive(Debug, Clone, Copy)]
pub enum Backend {
    JsonInMemory,
    JsonFile,
    SqliteInMemory,
    SqliteFile,
}

impl Backend {
    pub const ALL: [Backend; 4] = [
        Backend::JsonInMemory,
        Backend::JsonFile,
        Backend::SqliteInMemory,
        Backend::SqliteFile,
    ];
}

pub struct TestSetup {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<dyn Store>,
    // Keeps file-backed stores alive for the duration of the test
    pub _data_dir: Option<TempDir>,
}

pub struct TestSetupBuilder {
    backend: Backend,
    code_generator: Option<Arc<dyn CodeGenerator>>,
    promo_config: PromoConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            backend: Backend::JsonInMemory,
            code_generator: None,
            promo_config: PromoConfig::default(),
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_code_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.code_generator = Some(generator);
        self
    }

    pub fn with_promo_config(mut self, config: PromoConfig) -> Self {
        self.promo_config = config;
        self
    }

    pub async fn build(self) -> TestSetup {
        let (store, data_dir) = open_backend(self.backend).await;
        let code_generator = self
            .code_generator
            .unwrap_or_else(|| Arc::new(NumericCodeGenerator::default()));

        let state = AppState::new(Arc::clone(&store), code_generator, self.promo_config);
        let app = build_router(state.clone());

        TestSetup {
            app,
            state,
            store,
            _data_dir: data_dir,
        }
    }
}

async fn open_backend(backend: Backend) -> (Arc<dyn Store>, Option<TempDir>) {
    match backend {
        Backend::JsonInMemory => (Arc::new(JsonFileStore::in_memory()), None),
        Backend::JsonFile => {
            let dir = TempDir::new().unwrap();
            let store = JsonFileStore::open(dir.path().join("game_data.json"))
                .await
                .unwrap();
            (Arc::new(store), Some(dir))
        }
        Backend::SqliteInMemory => (Arc::new(SqliteStore::in_memory().await.unwrap()), None),
        Backend::SqliteFile => {
            let dir = TempDir::new().unwrap();
            let url = format!("sqlite://{}", dir.path().join("game_data.db").display());
            let store = SqliteStore::connect(&url).await.unwrap();
            (Arc::new(store), Some(dir))
        }
    }
}
