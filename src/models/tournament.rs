//! Tournament entity, tournament formats, and the shared error type.

use crate::models::game_match::{GameMatch, MatchId, MatchStatus};
use crate::models::map_pool::MapPoolId;
use crate::models::player::PlayerId;
use crate::models::rating::TemplateId;
use crate::models::server::ServerId;
use crate::models::team::TeamId;
use crate::models::veto::SeriesFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Players a server waits for before a match can go live.
pub const DEFAULT_EXPECTED_PLAYERS: u32 = 10;

/// Players per side in a shuffle tournament.
pub const DEFAULT_TEAM_SIZE: u32 = 5;

/// How an error should be reported to callers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    /// Malformed or unacceptable input; nothing was mutated.
    Validation,
    /// The request clashes with existing state; existing state preserved.
    Conflict,
    /// The referenced entity does not exist.
    NotFound,
    /// An external dependency (game server) failed; state left as-is.
    External,
}

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OrchestratorError {
    /// The entity is not in a state that allows this action.
    InvalidState,
    /// A next round was requested while the current one is unfinished.
    RoundNotComplete { round: u32, remaining: usize },
    /// Not enough registered players to generate a round.
    NotEnoughPlayers { required: usize, registered: usize },
    /// Not enough teams to generate a bracket or pairing.
    NotEnoughTeams { required: usize },
    /// The tournament's map pool has the wrong number of maps.
    WrongMapCount { required: usize, actual: usize },
    /// The given id is not a well-formed Steam64 id.
    InvalidSteamId(String),
    /// A player with this Steam id already exists.
    DuplicateSteamId(String),
    /// A server with this host:port already exists.
    DuplicateServerAddress(String),
    /// The name is already taken (names are unique, case-insensitive).
    DuplicateName(String),
    /// System rating templates cannot be edited or deleted.
    TemplateImmutable,
    /// The server already has a match loaded.
    ServerBusy,
    /// The server is offline or unreachable.
    ServerUnavailable,
    /// The map is not part of the remaining veto pool.
    MapNotAvailable(String),
    /// A veto action arrived from the side not on the clock.
    NotYourTurn,
    /// A veto action arrived after the veto finished.
    VetoComplete,
    /// A drawn series cannot decide an elimination match.
    DrawNotAllowed,
    /// A team must have at least one player.
    EmptyRoster,
    /// Player not found.
    PlayerNotFound(PlayerId),
    /// Team not found.
    TeamNotFound(TeamId),
    /// Server not found.
    ServerNotFound(ServerId),
    /// Map pool not found.
    MapPoolNotFound(MapPoolId),
    /// Rating template not found.
    TemplateNotFound(TemplateId),
    /// Tournament not found.
    TournamentNotFound(TournamentId),
    /// Match not found.
    MatchNotFound(MatchId),
    /// Free-form validation failure with a caller-facing message.
    Validation(String),
    /// Free-form external failure with a caller-facing message.
    External(String),
}

impl OrchestratorError {
    /// Bucket used by the HTTP layer to pick a status code.
    pub fn category(&self) -> ErrorCategory {
        use OrchestratorError::*;
        match self {
            NotEnoughPlayers { .. }
            | NotEnoughTeams { .. }
            | WrongMapCount { .. }
            | InvalidSteamId(_)
            | MapNotAvailable(_)
            | DrawNotAllowed
            | EmptyRoster
            | Validation(_) => ErrorCategory::Validation,
            InvalidState
            | RoundNotComplete { .. }
            | DuplicateSteamId(_)
            | DuplicateServerAddress(_)
            | DuplicateName(_)
            | TemplateImmutable
            | ServerBusy
            | NotYourTurn
            | VetoComplete => ErrorCategory::Conflict,
            PlayerNotFound(_)
            | TeamNotFound(_)
            | ServerNotFound(_)
            | MapPoolNotFound(_)
            | TemplateNotFound(_)
            | TournamentNotFound(_)
            | MatchNotFound(_) => ErrorCategory::NotFound,
            ServerUnavailable | External(_) => ErrorCategory::External,
        }
    }
}

impl std::fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use OrchestratorError::*;
        match self {
            InvalidState => write!(f, "Invalid state for this action"),
            RoundNotComplete { round, remaining } => {
                write!(f, "Round {} is not complete ({} matches unfinished)", round, remaining)
            }
            NotEnoughPlayers { required, registered } => {
                write!(f, "Need at least {} registered players (have {})", required, registered)
            }
            NotEnoughTeams { required } => write!(f, "Need at least {} teams", required),
            WrongMapCount { required, actual } => {
                write!(f, "Map pool must contain exactly {} maps (has {})", required, actual)
            }
            InvalidSteamId(id) => write!(f, "Invalid Steam64 id: {}", id),
            DuplicateSteamId(id) => write!(f, "A player with Steam id {} already exists", id),
            DuplicateServerAddress(addr) => write!(f, "A server at {} already exists", addr),
            DuplicateName(name) => write!(f, "The name \"{}\" is already taken", name),
            TemplateImmutable => write!(f, "System rating templates cannot be modified"),
            ServerBusy => write!(f, "Server already has a match loaded"),
            ServerUnavailable => write!(f, "Server is offline or unreachable"),
            MapNotAvailable(map) => write!(f, "Map {} is not available", map),
            NotYourTurn => write!(f, "It is not that team's turn in the veto"),
            VetoComplete => write!(f, "The map veto is already complete"),
            DrawNotAllowed => write!(f, "A drawn series cannot decide an elimination match"),
            EmptyRoster => write!(f, "Team must have at least one player"),
            PlayerNotFound(_) => write!(f, "Player not found"),
            TeamNotFound(_) => write!(f, "Team not found"),
            ServerNotFound(_) => write!(f, "Server not found"),
            MapPoolNotFound(_) => write!(f, "Map pool not found"),
            TemplateNotFound(_) => write!(f, "Rating template not found"),
            TournamentNotFound(_) => write!(f, "Tournament not found"),
            MatchNotFound(_) => write!(f, "Match not found"),
            Validation(msg) => write!(f, "{}", msg),
            External(msg) => write!(f, "{}", msg),
        }
    }
}

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Bracket/pairing scheme of a tournament.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentType {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
    Swiss,
    /// No fixed bracket; teams are recomputed every round from the
    /// registered players, balanced by ELO.
    Shuffle,
}

impl TournamentType {
    /// Elimination formats carry a fixed bracket skeleton with slot links.
    pub fn is_bracket(self) -> bool {
        matches!(self, TournamentType::SingleElimination | TournamentType::DoubleElimination)
    }

    /// Whether matches of this type go through a map veto.
    pub fn uses_veto(self) -> bool {
        !matches!(self, TournamentType::Shuffle)
    }

    /// Whether participants are pre-formed teams rather than loose players.
    pub fn team_based(self) -> bool {
        !matches!(self, TournamentType::Shuffle)
    }
}

/// Overall tournament phase, derived from match state on every read.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Adding teams/players, editing type/format/maps; nothing generated.
    #[default]
    Setup,
    /// At least one round exists; destructive edits are rejected.
    InProgress,
    /// Every generated round finished and no further rounds are owed.
    Completed,
}

/// A tournament and all of its matches.
///
/// Status is never stored; [`Tournament::status`] recomputes it from the
/// match list so it cannot drift out of sync.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TournamentType,
    pub format: SeriesFormat,
    pub map_pool_id: MapPoolId,
    /// Snapshot of the pool's maps taken at creation time, in pool order.
    pub maps: Vec<String>,
    /// Participating teams (empty for shuffle).
    pub team_ids: Vec<TeamId>,
    /// Individually registered players (shuffle only).
    pub registered_players: Vec<PlayerId>,
    /// Players per side when forming shuffle teams.
    pub team_size: u32,
    /// Connected players a server waits for before going live.
    pub expected_players_total: u32,
    /// Rating template applied on match completion; None disables ratings.
    pub elo_template_id: Option<TemplateId>,
    pub matches: Vec<GameMatch>,
    /// Rounds the format will produce in total; None while unknown
    /// (before the bracket exists, and always for shuffle).
    pub total_rounds: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    /// Set by the administrative finish action (shuffle has no final match).
    pub finished_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Create a tournament in setup with a snapshot of the pool's maps.
    pub fn new(
        name: impl Into<String>,
        kind: TournamentType,
        format: SeriesFormat,
        map_pool_id: MapPoolId,
        maps: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            format,
            map_pool_id,
            maps,
            team_ids: Vec::new(),
            registered_players: Vec::new(),
            team_size: DEFAULT_TEAM_SIZE,
            expected_players_total: DEFAULT_EXPECTED_PLAYERS,
            elo_template_id: None,
            matches: Vec::new(),
            total_rounds: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Derived tournament phase.
    pub fn status(&self) -> TournamentStatus {
        if self.finished_at.is_some() {
            return TournamentStatus::Completed;
        }
        if self.matches.is_empty() {
            return TournamentStatus::Setup;
        }
        let all_done = self
            .matches
            .iter()
            .all(|m| m.status == MatchStatus::Completed);
        if all_done && self.all_rounds_generated() {
            TournamentStatus::Completed
        } else {
            TournamentStatus::InProgress
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status() == TournamentStatus::Completed
    }

    /// Highest round number generated so far (0 before any round exists).
    pub fn rounds_generated(&self) -> u32 {
        self.matches.iter().map(|m| m.round).max().unwrap_or(0)
    }

    /// Lowest round with an unfinished match, or the last generated round
    /// once everything is complete. 0 before any matches exist.
    pub fn current_round(&self) -> u32 {
        self.matches
            .iter()
            .filter(|m| m.status != MatchStatus::Completed)
            .map(|m| m.round)
            .min()
            .unwrap_or_else(|| self.rounds_generated())
    }

    /// True when the round exists and every one of its matches finished.
    pub fn round_complete(&self, round: u32) -> bool {
        let mut seen = false;
        for m in self.matches.iter().filter(|m| m.round == round) {
            seen = true;
            if m.status != MatchStatus::Completed {
                return false;
            }
        }
        seen
    }

    /// Matches of one round, in match-number order as generated.
    pub fn round_matches(&self, round: u32) -> impl Iterator<Item = &GameMatch> {
        self.matches.iter().filter(move |m| m.round == round)
    }

    pub fn find_match(&self, id: MatchId) -> Option<&GameMatch> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn find_match_mut(&mut self, id: MatchId) -> Option<&mut GameMatch> {
        self.matches.iter_mut().find(|m| m.id == id)
    }

    /// Look up a match by its bracket-wide match number.
    pub fn match_by_number(&self, number: u32) -> Option<&GameMatch> {
        self.matches.iter().find(|m| m.match_number == number)
    }

    pub fn match_by_number_mut(&mut self, number: u32) -> Option<&mut GameMatch> {
        self.matches.iter_mut().find(|m| m.match_number == number)
    }

    fn all_rounds_generated(&self) -> bool {
        // Shuffle never finishes on its own; completion is administrative.
        if self.kind == TournamentType::Shuffle {
            return false;
        }
        match self.total_rounds {
            Some(total) => self.rounds_generated() >= total,
            None => false,
        }
    }
}
