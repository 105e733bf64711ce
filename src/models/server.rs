//! Game server entity: reachability status and the exclusive match pointer.

use crate::models::game_match::MatchId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a game server.
pub type ServerId = Uuid;

/// Reachability as last determined by a status check. Tracked separately from
/// match status so a stalled server never silently completes a match.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    /// No check has resolved yet (or one is in flight).
    #[default]
    Checking,
    Online,
    Offline,
}

/// A CS2 server running MatchZy. `current_match` is the exclusivity pointer:
/// at most one loaded/live match may hold a server, and assignment is a
/// compare-and-set against this field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameServer {
    pub id: ServerId,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub rcon_password: String,
    pub status: ServerStatus,
    pub current_match: Option<MatchId>,
    pub created_at: DateTime<Utc>,
}

impl GameServer {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        rcon_password: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            host: host.into(),
            port,
            rcon_password: rcon_password.into(),
            status: ServerStatus::Checking,
            current_match: None,
            created_at: Utc::now(),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_free(&self) -> bool {
        self.current_match.is_none()
    }
}
