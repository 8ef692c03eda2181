use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::game::models::{Difficulty, GameOutcome, GameResult};
use crate::user::User;

/// Aggregate statistics for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: i64,
    pub username: Option<String>,
    pub total_games: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// Percentage in 0.0..=100.0, rounded to two decimals
    pub win_rate: f64,
    pub favorite_difficulty: Option<Difficulty>,
}

impl UserStats {
    /// All-zero stats for a user with no recorded games
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            username: None,
            total_games: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            win_rate: 0.0,
            favorite_difficulty: None,
        }
    }

    /// Aggregates `results`, which must all belong to `user_id`
    pub fn from_results(user_id: i64, user: Option<&User>, results: &[GameResult]) -> Self {
        let counts = OutcomeCounts::from_results(results);
        let total_games = counts.wins + counts.losses + counts.draws;

        Self {
            user_id,
            username: user.and_then(|u| u.username.clone()),
            total_games,
            wins: counts.wins,
            losses: counts.losses,
            draws: counts.draws,
            win_rate: win_rate(counts.wins, total_games),
            favorite_difficulty: favorite_difficulty(results),
        }
    }
}

/// Win/loss/draw tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl OutcomeCounts {
    pub fn from_results(results: &[GameResult]) -> Self {
        results
            .iter()
            .fold(Self::default(), |mut counts, result| {
                match result.outcome {
                    GameOutcome::Win => counts.wins += 1,
                    GameOutcome::Loss => counts.losses += 1,
                    GameOutcome::Draw => counts.draws += 1,
                }
                counts
            })
    }
}

/// Response for the stats counter endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleStatsResponse {
    pub user_id: i64,
    pub stats: OutcomeCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub username: Option<String>,
    pub wins: u32,
}

fn win_rate(wins: u32, total_games: u32) -> f64 {
    if total_games == 0 {
        return 0.0;
    }
    let rate = wins as f64 / total_games as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Most played difficulty; a tie goes to the one played first
fn favorite_difficulty(results: &[GameResult]) -> Option<Difficulty> {
    let mut counts: Vec<(Difficulty, u32)> = Vec::new();
    for result in results {
        match counts.iter_mut().find(|(d, _)| *d == result.difficulty) {
            Some((_, count)) => *count += 1,
            None => counts.push((result.difficulty, 1)),
        }
    }

    let mut best: Option<(Difficulty, u32)> = None;
    for (difficulty, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((difficulty, count));
        }
    }
    best.map(|(difficulty, _)| difficulty)
}

/// Ranks users by win count, highest first, keeping at most `limit` entries
///
/// `wins` must be in ascending id order. Equal counts keep the order of each
/// user's first win. Users without a win never appear.
pub fn rank_by_wins(
    wins: &[GameResult],
    users: &HashMap<i64, User>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();

    for result in wins.iter().filter(|r| r.is_win()) {
        match positions.get(&result.user_id) {
            Some(&index) => entries[index].wins += 1,
            None => {
                positions.insert(result.user_id, entries.len());
                entries.push(LeaderboardEntry {
                    user_id: result.user_id,
                    username: users
                        .get(&result.user_id)
                        .and_then(|u| u.username.clone()),
                    wins: 1,
                });
            }
        }
    }

    // Stable sort keeps first-win order among equal counts
    entries.sort_by(|a, b| b.wins.cmp(&a.wins));
    entries.truncate(limit);
    entries
}
