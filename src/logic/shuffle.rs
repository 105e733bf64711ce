//! Shuffle rounds: ad-hoc teams recomputed from the registered players
//! every round, balanced by current ELO.
//!
//! Players are dealt into teams serpentine over descending rating, so
//! team means stay close. Players beyond a full complement of teams sit
//! the round out; those who have played the most rounds sit first, with
//! a random tiebreak. Formed teams are paired strongest against next
//! strongest, and an odd team out gets a walkover.

use crate::logic::{bracket, round_robin};
use crate::models::{
    GameMatch, MatchTeam, OrchestratorError, Player, PlayerId, Side, Tournament,
};
use rand::Rng;
use std::cmp::Reverse;
use std::collections::HashMap;

/// Append one shuffle round to the tournament.
///
/// Fails without creating anything when fewer than `teamSize * 2`
/// players are registered.
pub fn generate_round(
    tournament: &mut Tournament,
    players: &HashMap<PlayerId, Player>,
) -> Result<(), OrchestratorError> {
    let team_size = tournament.team_size as usize;
    let required = team_size * 2;
    let registered = tournament.registered_players.clone();
    if registered.len() < required {
        return Err(OrchestratorError::NotEnoughPlayers {
            required,
            registered: registered.len(),
        });
    }
    for id in &registered {
        if !players.contains_key(id) {
            return Err(OrchestratorError::PlayerNotFound(*id));
        }
    }

    let round = tournament.rounds_generated() + 1;
    let team_count = registered.len() / team_size;
    let sitting_count = registered.len() - team_count * team_size;

    let (active, sitting) = split_sitting(tournament, registered, sitting_count);

    let mut rated: Vec<(PlayerId, i64)> = active
        .into_iter()
        .map(|id| {
            let elo = players.get(&id).map(|p| p.current_elo).unwrap_or_default();
            (id, elo)
        })
        .collect();
    rated.sort_by_key(|(_, elo)| Reverse(*elo));

    let mut formed = deal_serpentine(rated, team_count);
    formed.sort_by_key(|(_, total)| Reverse(*total));

    let mut number = round_robin::next_match_number(tournament);
    let mut new_matches = Vec::new();
    let teams: Vec<MatchTeam> = formed
        .into_iter()
        .enumerate()
        .map(|(i, (roster, _))| MatchTeam {
            team_id: None,
            name: format!("Team {}", i + 1),
            players: roster,
        })
        .collect();
    for chunk in teams.chunks(2) {
        let mut m = GameMatch::new(round, number);
        m.set_side(Side::Team1, chunk[0].clone());
        match chunk.get(1) {
            Some(opponent) => m.set_side(Side::Team2, opponent.clone()),
            None => m.mark_slot_bye(Side::Team2),
        }
        new_matches.push(m);
        number += 1;
    }
    if !sitting.is_empty() {
        let mut m = GameMatch::new(round, number);
        m.set_side(
            Side::Team1,
            MatchTeam {
                team_id: None,
                name: "Sitting out".to_string(),
                players: sitting,
            },
        );
        m.mark_slot_bye(Side::Team2);
        new_matches.push(m);
    }

    let format = tournament.format;
    let pool = tournament.maps.clone();
    for m in &mut new_matches {
        m.refresh_readiness(false, format, &pool);
    }
    tournament.matches.extend(new_matches);
    bracket::resolve_walkovers(tournament);
    Ok(())
}

/// Pick who sits out this round. Appearances are counted from the match
/// history, so sitting out rotates without extra bookkeeping.
fn split_sitting(
    tournament: &Tournament,
    registered: Vec<PlayerId>,
    sitting_count: usize,
) -> (Vec<PlayerId>, Vec<PlayerId>) {
    if sitting_count == 0 {
        return (registered, Vec::new());
    }
    let mut appearances: HashMap<PlayerId, u32> =
        registered.iter().map(|id| (*id, 0)).collect();
    // Walkovers (including the sitting-out record) were not played.
    for m in tournament.matches.iter().filter(|m| !m.walkover) {
        for pid in m.participants() {
            if let Some(count) = appearances.get_mut(&pid) {
                *count += 1;
            }
        }
    }
    let mut rng = rand::thread_rng();
    let mut keyed: Vec<(PlayerId, u32, u32)> = registered
        .into_iter()
        .map(|id| {
            let count = appearances.get(&id).copied().unwrap_or(0);
            (id, count, rng.gen())
        })
        .collect();
    keyed.sort_by_key(|(_, count, tie)| (Reverse(*count), *tie));
    let mut ids: Vec<PlayerId> = keyed.into_iter().map(|(id, _, _)| id).collect();
    let sitting: Vec<PlayerId> = ids.drain(0..sitting_count).collect();
    (ids, sitting)
}

/// Deal rating-sorted players into `team_count` rosters, reversing
/// direction each pass so totals even out.
fn deal_serpentine(rated: Vec<(PlayerId, i64)>, team_count: usize) -> Vec<(Vec<PlayerId>, i64)> {
    let mut teams: Vec<(Vec<PlayerId>, i64)> = vec![(Vec::new(), 0); team_count];
    for (i, (id, elo)) in rated.into_iter().enumerate() {
        let pass = i / team_count;
        let pos = i % team_count;
        let idx = if pass % 2 == 0 {
            pos
        } else {
            team_count - 1 - pos
        };
        teams[idx].0.push(id);
        teams[idx].1 += elo;
    }
    teams
}
