pub mod handlers;
pub mod models;
pub mod service;
pub mod types;

pub use models::{Difficulty, GameOutcome, GameResult};
pub use service::{GameResultService, NewGameResult, RecordedGame};
