//! Player identity, Steam64 validation, and the append-only rating history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player (used in rosters, matches, and lookups).
pub type PlayerId = Uuid;

/// One applied rating change. History entries are append-only and never rewritten.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub match_id: Uuid,
    pub old_elo: i64,
    pub new_elo: i64,
    pub applied_at: DateTime<Utc>,
}

/// A registered player. `steam_id` is the stable identity; name and avatar are display data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Steam64 id (17 digits). Unique across the roster.
    pub steam_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub current_elo: i64,
    pub starting_elo: i64,
    /// Rating changes oldest-first.
    pub rating_history: Vec<RatingChange>,
}

impl Player {
    /// Create a new player starting at `starting_elo` with no history.
    pub fn new(steam_id: impl Into<String>, name: impl Into<String>, starting_elo: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            steam_id: steam_id.into(),
            name: name.into(),
            avatar: None,
            current_elo: starting_elo,
            starting_elo,
            rating_history: Vec::new(),
        }
    }

    /// Record a rating change for a completed match and move `current_elo` to the new value.
    pub fn apply_rating(&mut self, match_id: Uuid, new_elo: i64, applied_at: DateTime<Utc>) {
        self.rating_history.push(RatingChange {
            match_id,
            old_elo: self.current_elo,
            new_elo,
            applied_at,
        });
        self.current_elo = new_elo;
    }
}

/// Check the 17-digit Steam64 pattern (`7656119` prefix, digits only).
pub fn is_valid_steam64(id: &str) -> bool {
    id.len() == 17 && id.starts_with("7656119") && id.bytes().all(|b| b.is_ascii_digit())
}
