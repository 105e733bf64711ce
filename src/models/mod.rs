//! Data structures for the tournament organizer: players, teams, servers,
//! map pools, rating templates, matches, and tournaments.

mod game_match;
mod map_pool;
mod player;
mod rating;
mod server;
mod settings;
mod team;
mod tournament;
mod veto;

pub use game_match::{
    GameMatch, MapScore, MatchEvent, MatchEventBody, MatchId, MatchStatus, MatchTeam,
    PlayerMatchStats, Side,
};
pub use map_pool::{active_duty_maps, MapPool, MapPoolId};
pub use player::{is_valid_steam64, Player, PlayerId, RatingChange};
pub use rating::{EloTemplate, TemplateId, SYSTEM_TEMPLATE_NAME};
pub use server::{GameServer, ServerId, ServerStatus};
pub use settings::{AppSettings, DEFAULT_PLAYER_ELO};
pub use team::{Team, TeamId};
pub use tournament::{
    ErrorCategory, OrchestratorError, Tournament, TournamentId, TournamentStatus, TournamentType,
    DEFAULT_EXPECTED_PLAYERS, DEFAULT_TEAM_SIZE,
};
pub use veto::{SeriesFormat, VetoAction, VetoRecord, VetoState, VetoStep, VETO_POOL_SIZE};
