use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ids::PlayerId;

/// Result of a finished game from one participant's point of view
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerResult {
    Win,
    Loss,
    Draw,
}

/// Cumulative statistics for a player
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub games_played: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub games_drawn: u32,
}

impl PlayerStats {
    pub fn record(&mut self, result: PlayerResult) {
        self.games_played += 1;
        match result {
            PlayerResult::Win => self.games_won += 1,
            PlayerResult::Loss => self.games_lost += 1,
            PlayerResult::Draw => self.games_drawn += 1,
        }
    }

    /// Percentage of games won, rounded to one decimal; 0 with no games
    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        let rate = f64::from(self.games_won) / f64::from(self.games_played) * 100.0;
        (rate * 10.0).round() / 10.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub stats: PlayerStats,
    pub created_at: DateTime<Utc>,
}

/// Player as returned to callers
#[derive(Serialize, Debug, Clone)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    #[serde(flatten)]
    pub stats: PlayerStats,
    pub win_rate: f64,
    pub created_at: DateTime<Utc>,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        PlayerView {
            id: player.id,
            name: player.name.clone(),
            stats: player.stats,
            win_rate: player.stats.win_rate(),
            created_at: player.created_at,
        }
    }
}
