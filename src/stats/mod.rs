pub mod handlers;
pub mod models;
pub mod service;

pub use models::{LeaderboardEntry, OutcomeCounts, SimpleStatsResponse, UserStats};
pub use service::StatsService;
