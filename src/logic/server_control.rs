//! Seam to the game servers: reachability checks, match config pushes,
//! and console commands.
//!
//! The orchestrator never talks RCON directly; it goes through
//! [`ServerControl`] so the transport can be swapped out. The bundled
//! [`SimulatedServerControl`] stands in when no real fleet exists, which
//! is also what the `simulateMatches` setting and the tests use.

use crate::models::{
    AppSettings, GameMatch, GameServer, MatchId, MatchStatus, OrchestratorError, Tournament,
};
use serde::Serialize;

/// Match configuration pushed to a server when a match is loaded.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
    pub match_id: MatchId,
    pub team1_name: String,
    pub team2_name: String,
    pub num_maps: usize,
    pub maplist: Vec<String>,
    pub players_per_team: u32,
    pub min_players_to_ready: u32,
    pub knife_round: bool,
    pub chat_prefix: Option<String>,
    pub admin_chat_prefix: Option<String>,
}

impl MatchConfig {
    /// Build the config for a ready match. Both team slots and the map
    /// list must already be fixed.
    pub fn for_match(
        game_match: &GameMatch,
        tournament: &Tournament,
        settings: &AppSettings,
    ) -> Result<Self, OrchestratorError> {
        if game_match.status != MatchStatus::Ready && game_match.status != MatchStatus::Loaded {
            return Err(OrchestratorError::InvalidState);
        }
        let team1 = game_match
            .team1
            .as_ref()
            .ok_or(OrchestratorError::InvalidState)?;
        let team2 = game_match
            .team2
            .as_ref()
            .ok_or(OrchestratorError::InvalidState)?;
        if game_match.maps.is_empty() {
            return Err(OrchestratorError::Validation(
                "match has no map list".to_string(),
            ));
        }
        let per_team = tournament.expected_players_total / 2;
        Ok(Self {
            match_id: game_match.id,
            team1_name: team1.name.clone(),
            team2_name: team2.name.clone(),
            num_maps: game_match.maps.len(),
            maplist: game_match.maps.clone(),
            players_per_team: per_team,
            min_players_to_ready: per_team,
            knife_round: settings.matchzy_knife_enabled_default,
            chat_prefix: settings.matchzy_chat_prefix.clone(),
            admin_chat_prefix: settings.matchzy_admin_chat_prefix.clone(),
        })
    }
}

/// How the orchestrator talks to a game server.
pub trait ServerControl {
    /// Probe the server; true when it answers.
    fn check(&self, server: &GameServer) -> Result<bool, OrchestratorError>;

    /// Push a match config to the server.
    fn load_match(
        &self,
        server: &GameServer,
        config: &MatchConfig,
    ) -> Result<(), OrchestratorError>;

    /// Fire a raw console command, returning the server's reply.
    fn send_command(
        &self,
        server: &GameServer,
        command: &str,
    ) -> Result<String, OrchestratorError>;
}

/// Always-reachable control that only logs what it would do.
pub struct SimulatedServerControl;

impl ServerControl for SimulatedServerControl {
    fn check(&self, _server: &GameServer) -> Result<bool, OrchestratorError> {
        Ok(true)
    }

    fn load_match(
        &self,
        server: &GameServer,
        config: &MatchConfig,
    ) -> Result<(), OrchestratorError> {
        log::info!(
            "simulated load: match {} ({} vs {}) on {}",
            config.match_id,
            config.team1_name,
            config.team2_name,
            server.address()
        );
        Ok(())
    }

    fn send_command(
        &self,
        server: &GameServer,
        command: &str,
    ) -> Result<String, OrchestratorError> {
        log::debug!("simulated command on {}: {}", server.address(), command);
        Ok(String::new())
    }
}
