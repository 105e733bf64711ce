//! Match entity: two team slots, veto, maps, scores, and lifecycle status.

use crate::models::player::PlayerId;
use crate::models::server::ServerId;
use crate::models::team::TeamId;
use crate::models::veto::{SeriesFormat, VetoState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Which side of a match.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Team1,
    Team2,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Team1 => Side::Team2,
            Side::Team2 => Side::Team1,
        }
    }
}

/// Lifecycle of a match. Transitions only move forward; `Completed` is terminal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Waiting for team slots and, in veto formats, the veto.
    #[default]
    Pending,
    /// Sides known and maps decided; waiting for a server.
    Ready,
    /// Config pushed to a server; waiting for player connections.
    Loaded,
    Live,
    Completed,
}

impl MatchStatus {
    /// Statuses that hold a server (the exclusivity window).
    pub fn holds_server(self) -> bool {
        matches!(self, MatchStatus::Loaded | MatchStatus::Live)
    }
}

/// One side of a match: a roster snapshot. `team_id` is None for
/// shuffle-generated sides, which exist only for their round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchTeam {
    pub team_id: Option<TeamId>,
    pub name: String,
    pub players: Vec<PlayerId>,
}

/// Final score of one map in the series.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MapScore {
    /// 1-based position in the match's map list.
    pub map_number: u32,
    pub map_name: String,
    pub team1_score: u32,
    pub team2_score: u32,
}

impl MapScore {
    pub fn winner(&self) -> Option<Side> {
        match self.team1_score.cmp(&self.team2_score) {
            std::cmp::Ordering::Greater => Some(Side::Team1),
            std::cmp::Ordering::Less => Some(Side::Team2),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Per-player statistics from the final series report.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerMatchStats {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub mvps: u32,
}

/// A server-reported event. Every delivery carries a unique `event_id`;
/// re-delivered ids are acknowledged as no-ops.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchEvent {
    pub event_id: Uuid,
    #[serde(flatten)]
    pub body: MatchEventBody,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEventBody {
    PlayersConnected {
        count: u32,
    },
    GoingLive,
    RoundScore {
        team1_score: u32,
        team2_score: u32,
    },
    MapResult {
        map_number: u32,
        team1_score: u32,
        team2_score: u32,
    },
    /// Final report. Player stats are keyed by Steam64 id as the server knows them.
    SeriesEnd {
        team1_series_score: u32,
        team2_series_score: u32,
        #[serde(default)]
        player_stats: HashMap<String, PlayerMatchStats>,
    },
}

/// A single match between two teams (or TBD slots until the bracket resolves).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameMatch {
    pub id: MatchId,
    /// 1-based round number within the tournament.
    pub round: u32,
    /// 1-based, unique within the tournament; bracket links use it.
    pub match_number: u32,
    pub status: MatchStatus,
    pub team1: Option<MatchTeam>,
    pub team2: Option<MatchTeam>,
    /// Marks a slot whose feed can never arrive (walkover upstream).
    pub team1_bye: bool,
    pub team2_bye: bool,
    pub server_id: Option<ServerId>,
    pub veto: Option<VetoState>,
    /// Maps to play, in order (veto result, or the round's rotation pick).
    pub maps: Vec<String>,
    pub map_scores: Vec<MapScore>,
    /// Live series score as last reported by the server.
    pub live_team1_score: u32,
    pub live_team2_score: u32,
    pub winner: Option<Side>,
    /// True when decided without play (bye / missing opponent).
    pub walkover: bool,
    /// True when completed by an administrative force-end.
    pub forced: bool,
    pub connected_players: u32,
    /// Stats from the final report, resolved to player ids.
    pub player_stats: HashMap<PlayerId, PlayerMatchStats>,
    /// Event ids already applied; duplicates are no-ops.
    pub processed_events: HashSet<Uuid>,
    /// Bracket wiring: target match number and slot for the winner / loser.
    pub winner_goes_to: Option<(u32, Side)>,
    pub loser_goes_to: Option<(u32, Side)>,
    pub created_at: DateTime<Utc>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GameMatch {
    pub fn new(round: u32, match_number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            round,
            match_number,
            status: MatchStatus::Pending,
            team1: None,
            team2: None,
            team1_bye: false,
            team2_bye: false,
            server_id: None,
            veto: None,
            maps: Vec::new(),
            map_scores: Vec::new(),
            live_team1_score: 0,
            live_team2_score: 0,
            winner: None,
            walkover: false,
            forced: false,
            connected_players: 0,
            player_stats: HashMap::new(),
            processed_events: HashSet::new(),
            winner_goes_to: None,
            loser_goes_to: None,
            created_at: Utc::now(),
            loaded_at: None,
            completed_at: None,
        }
    }

    pub fn side(&self, side: Side) -> Option<&MatchTeam> {
        match side {
            Side::Team1 => self.team1.as_ref(),
            Side::Team2 => self.team2.as_ref(),
        }
    }

    pub fn set_side(&mut self, side: Side, team: MatchTeam) {
        match side {
            Side::Team1 => self.team1 = Some(team),
            Side::Team2 => self.team2 = Some(team),
        }
    }

    pub fn slot_bye(&self, side: Side) -> bool {
        match side {
            Side::Team1 => self.team1_bye,
            Side::Team2 => self.team2_bye,
        }
    }

    pub fn mark_slot_bye(&mut self, side: Side) {
        match side {
            Side::Team1 => self.team1_bye = true,
            Side::Team2 => self.team2_bye = true,
        }
    }

    pub fn both_sides_populated(&self) -> bool {
        self.team1.is_some() && self.team2.is_some()
    }

    /// Map wins per side, counting only decisive maps.
    pub fn map_wins(&self) -> (u32, u32) {
        let mut wins = (0, 0);
        for score in &self.map_scores {
            match score.winner() {
                Some(Side::Team1) => wins.0 += 1,
                Some(Side::Team2) => wins.1 += 1,
                None => {}
            }
        }
        wins
    }

    /// Series winner: strictly more map wins, falling back to the live series
    /// score when map-level results are absent or level. Equal on both counts
    /// is a draw (None).
    pub fn series_winner(&self) -> Option<Side> {
        let (w1, w2) = self.map_wins();
        if w1 != w2 {
            return Some(if w1 > w2 { Side::Team1 } else { Side::Team2 });
        }
        match self.live_team1_score.cmp(&self.live_team2_score) {
            std::cmp::Ordering::Greater => Some(Side::Team1),
            std::cmp::Ordering::Less => Some(Side::Team2),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// All players on both sides (rating application, config pushes).
    pub fn participants(&self) -> Vec<PlayerId> {
        let mut ids = Vec::new();
        if let Some(t) = &self.team1 {
            ids.extend(t.players.iter().copied());
        }
        if let Some(t) = &self.team2 {
            ids.extend(t.players.iter().copied());
        }
        ids
    }

    /// The `MatchTeam` that won / lost, once decided.
    pub fn winner_team(&self) -> Option<&MatchTeam> {
        self.winner.and_then(|s| self.side(s))
    }

    pub fn loser_team(&self) -> Option<&MatchTeam> {
        self.winner.and_then(|s| self.side(s.other()))
    }

    /// Move `Pending` to `Ready` once both sides are known and, for veto
    /// formats, the veto is done. Creates the veto lazily when the second
    /// slot fills, and freezes the map list from its result.
    pub fn refresh_readiness(&mut self, uses_veto: bool, format: SeriesFormat, pool: &[String]) {
        if self.status != MatchStatus::Pending || !self.both_sides_populated() {
            return;
        }
        if uses_veto {
            let veto = self
                .veto
                .get_or_insert_with(|| VetoState::new(format, pool.to_vec()));
            if !veto.completed {
                return;
            }
            self.maps = veto.map_list.clone();
        } else if self.maps.is_empty() {
            let count = format.maps_in_series().min(pool.len());
            self.maps = pool[..count].to_vec();
        }
        self.status = MatchStatus::Ready;
    }
}
