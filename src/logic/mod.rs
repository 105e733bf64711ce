//! Tournament business logic: brackets, round generation, match
//! lifecycle, ratings, and server control.

mod bracket;
mod import;
mod lifecycle;
mod progression;
mod rating;
mod round_robin;
mod server_control;
mod shuffle;
mod swiss;

pub use bracket::{
    generate_double_elimination, generate_single_elimination, propagate_result, resolve_walkovers,
};
pub use import::{import_players_csv, ImportReport, SkippedRow};
pub use lifecycle::{
    check_server, force_end_match, handle_match_event, load_match, veto_action,
};
pub use progression::{
    describe_round, finish_tournament, generate_next_round, start_tournament, status_view,
    TournamentStatusView,
};
pub use rating::{apply_match_ratings, expected_score};
pub use server_control::{MatchConfig, ServerControl, SimulatedServerControl};
pub use swiss::{standings, Standing};
