//! CS2 tournament orchestrator: library with models, business logic,
//! and the in-memory application state.

pub mod app;
pub mod logic;
pub mod models;

pub use app::{App, TournamentUpdate};
pub use logic::{
    check_server, finish_tournament, force_end_match, generate_next_round, handle_match_event,
    import_players_csv, load_match, start_tournament, status_view, veto_action,
};
pub use models::{
    AppSettings, GameMatch, GameServer, MapPool, MatchEvent, MatchId, MatchStatus,
    OrchestratorError, Player, PlayerId, ServerId, Side, Team, TeamId, Tournament, TournamentId,
    TournamentStatus, TournamentType,
};
