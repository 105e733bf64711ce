//! Tournament start, round advancement, and the derived status view.
//!
//! Round N+1 is never generated while round N has an unfinished match.
//! All checks and the generation itself happen under one `&mut App`
//! borrow, so two racing "next round" calls cannot both pass the
//! completion check.

use crate::app::App;
use crate::logic::{bracket, round_robin, shuffle, swiss};
use crate::models::{
    MatchStatus, MatchTeam, OrchestratorError, Team, TeamId, Tournament, TournamentId,
    TournamentStatus, TournamentType,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;

/// Leave setup: generate the opening round (or the full bracket for
/// elimination types) and stamp `started_at`.
pub fn start_tournament(
    app: &mut App,
    tournament_id: TournamentId,
) -> Result<(), OrchestratorError> {
    let App {
        players,
        teams,
        tournaments,
        ..
    } = app;
    let tournament = tournaments
        .get_mut(&tournament_id)
        .ok_or(OrchestratorError::TournamentNotFound(tournament_id))?;
    if tournament.status() != TournamentStatus::Setup {
        return Err(OrchestratorError::InvalidState);
    }

    match tournament.kind {
        TournamentType::SingleElimination => {
            let entries = roster_entries(teams, &tournament.team_ids)?;
            bracket::generate_single_elimination(tournament, entries)?;
        }
        TournamentType::DoubleElimination => {
            let entries = roster_entries(teams, &tournament.team_ids)?;
            bracket::generate_double_elimination(tournament, entries)?;
        }
        TournamentType::RoundRobin => {
            let entries = roster_entries(teams, &tournament.team_ids)?;
            if entries.len() < 2 {
                return Err(OrchestratorError::NotEnoughTeams { required: 2 });
            }
            round_robin::generate_round(tournament, &entries, 1);
            tournament.total_rounds = Some(round_robin::total_rounds(entries.len()));
        }
        TournamentType::Swiss => {
            let entries = roster_entries(teams, &tournament.team_ids)?;
            swiss::generate_round(tournament, &entries, 1)?;
            tournament.total_rounds = Some(swiss::total_rounds(entries.len()));
        }
        TournamentType::Shuffle => {
            shuffle::generate_round(tournament, players)?;
        }
    }
    tournament.started_at = Some(Utc::now());
    log::info!(
        "tournament {} started with {} matches",
        tournament_id,
        tournament.matches.len()
    );
    Ok(())
}

/// Generate the next round for a non-elimination tournament. Returns
/// the new round number.
pub fn generate_next_round(
    app: &mut App,
    tournament_id: TournamentId,
) -> Result<u32, OrchestratorError> {
    let App {
        players,
        teams,
        tournaments,
        ..
    } = app;
    let tournament = tournaments
        .get_mut(&tournament_id)
        .ok_or(OrchestratorError::TournamentNotFound(tournament_id))?;
    match tournament.status() {
        TournamentStatus::Setup => {
            return Err(OrchestratorError::Validation(
                "tournament has not started".to_string(),
            ))
        }
        TournamentStatus::Completed => return Err(OrchestratorError::InvalidState),
        TournamentStatus::InProgress => {}
    }

    let current = tournament.rounds_generated();
    if !tournament.round_complete(current) {
        let remaining = tournament
            .round_matches(current)
            .filter(|m| m.status != MatchStatus::Completed)
            .count();
        return Err(OrchestratorError::RoundNotComplete {
            round: current,
            remaining,
        });
    }
    if let Some(total) = tournament.total_rounds {
        if current >= total {
            return Err(OrchestratorError::Validation(
                "every round has already been generated".to_string(),
            ));
        }
    }

    let next = current + 1;
    match tournament.kind {
        TournamentType::SingleElimination | TournamentType::DoubleElimination => {
            return Err(OrchestratorError::Validation(
                "elimination rounds are created with the bracket and advance on their own"
                    .to_string(),
            ));
        }
        TournamentType::RoundRobin => {
            let entries = roster_entries(teams, &tournament.team_ids)?;
            round_robin::generate_round(tournament, &entries, next);
        }
        TournamentType::Swiss => {
            let entries = roster_entries(teams, &tournament.team_ids)?;
            swiss::generate_round(tournament, &entries, next)?;
        }
        TournamentType::Shuffle => {
            shuffle::generate_round(tournament, players)?;
        }
    }
    log::info!("tournament {}: round {} generated", tournament_id, next);
    Ok(next)
}

/// Administrative completion. Shuffle has no deciding final match, so
/// this is how a shuffle night ends; other types accept it as an early
/// cut-off once every generated match is decided.
pub fn finish_tournament(
    app: &mut App,
    tournament_id: TournamentId,
) -> Result<(), OrchestratorError> {
    let tournament = app
        .tournaments
        .get_mut(&tournament_id)
        .ok_or(OrchestratorError::TournamentNotFound(tournament_id))?;
    if tournament.started_at.is_none() {
        return Err(OrchestratorError::Validation(
            "tournament has not started".to_string(),
        ));
    }
    if tournament.finished_at.is_some() {
        return Err(OrchestratorError::InvalidState);
    }
    let round = tournament.current_round();
    let remaining = tournament
        .round_matches(round)
        .filter(|m| m.status != MatchStatus::Completed)
        .count();
    if remaining > 0 {
        return Err(OrchestratorError::RoundNotComplete { round, remaining });
    }
    tournament.finished_at = Some(Utc::now());
    log::info!("tournament {} marked completed", tournament_id);
    Ok(())
}

/// Everything the round/status panels need, derived on each read.
#[derive(Clone, Debug, Serialize)]
pub struct TournamentStatusView {
    pub id: TournamentId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TournamentType,
    pub status: TournamentStatus,
    pub current_round: u32,
    pub rounds_generated: u32,
    pub total_rounds: Option<u32>,
    pub round_label: Option<String>,
    pub round_complete: bool,
    pub can_generate_next_round: bool,
    pub matches_total: usize,
    pub matches_completed: usize,
}

pub fn status_view(tournament: &Tournament) -> TournamentStatusView {
    let status = tournament.status();
    let generated = tournament.rounds_generated();
    let current = tournament.current_round();
    let round_complete = generated > 0 && tournament.round_complete(generated);
    let more_rounds_owed = match tournament.kind {
        TournamentType::SingleElimination | TournamentType::DoubleElimination => false,
        TournamentType::Shuffle => true,
        _ => tournament
            .total_rounds
            .map(|total| generated < total)
            .unwrap_or(false),
    };
    TournamentStatusView {
        id: tournament.id,
        name: tournament.name.clone(),
        kind: tournament.kind,
        status,
        current_round: current,
        rounds_generated: generated,
        total_rounds: tournament.total_rounds,
        round_label: if generated > 0 {
            Some(describe_round(tournament, current))
        } else {
            None
        },
        round_complete,
        can_generate_next_round: status == TournamentStatus::InProgress
            && round_complete
            && more_rounds_owed,
        matches_total: tournament.matches.len(),
        matches_completed: tournament
            .matches
            .iter()
            .filter(|m| m.status == MatchStatus::Completed)
            .count(),
    }
}

/// Human label for a round number, based on the tournament shape.
pub fn describe_round(tournament: &Tournament, round: u32) -> String {
    let total = match tournament.total_rounds {
        Some(total) if total > 0 => total,
        _ => return format!("Round {round}"),
    };
    match tournament.kind {
        TournamentType::SingleElimination => {
            if round == total {
                "Final".to_string()
            } else if round + 1 == total {
                "Semi-finals".to_string()
            } else {
                format!("Round {round}")
            }
        }
        TournamentType::DoubleElimination => {
            if round == total {
                "Grand Final".to_string()
            } else if round + 1 == total && total >= 4 {
                "Lower Bracket Final".to_string()
            } else {
                format!("Round {round}")
            }
        }
        _ => format!("Round {round}"),
    }
}

/// Resolve team ids into match entries, in seeding (entry) order.
fn roster_entries(
    teams: &HashMap<TeamId, Team>,
    team_ids: &[TeamId],
) -> Result<Vec<MatchTeam>, OrchestratorError> {
    team_ids
        .iter()
        .map(|id| {
            teams
                .get(id)
                .map(|team| MatchTeam {
                    team_id: Some(team.id),
                    name: team.name.clone(),
                    players: team.players.clone(),
                })
                .ok_or(OrchestratorError::TeamNotFound(*id))
        })
        .collect()
}
