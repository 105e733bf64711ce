//! Team entity: a named roster of players.

use crate::models::player::PlayerId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a team.
pub type TeamId = Uuid;

/// A fixed-roster team (non-shuffle tournaments). Rosters are ordered; validation that
/// a roster is non-empty and free of duplicate Steam IDs happens at creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub tag: String,
    pub players: Vec<PlayerId>,
}

impl Team {
    pub fn new(name: impl Into<String>, tag: impl Into<String>, players: Vec<PlayerId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tag: tag.into(),
            players,
        }
    }
}
