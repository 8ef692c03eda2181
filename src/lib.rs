// Library crate for the tic-tac-toe backend
// This file exposes the public API for the binary and integration tests

pub mod app;
pub mod config;
pub mod game;
pub mod promo;
pub mod shared;
pub mod stats;
pub mod store;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use app::build_router;
pub use config::{AppConfig, ConfigError, StoreBackend};
pub use game::{Difficulty, GameOutcome, GameResult};
pub use promo::{PromoCode, PromoConfig, RedemptionPolicy};
pub use shared::{AppError, AppState};
pub use store::{open_store, JsonFileStore, SqliteStore, Store, StoreError};
