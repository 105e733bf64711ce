//! Swiss pairing: standings-driven with rematch avoidance.
//!
//! Teams are ranked by points, then Buchholz (sum of opponents' points),
//! then entry order, and paired top-down. Pairing backtracks to avoid
//! rematches; when no rematch-free pairing of the whole field exists it
//! falls back to adjacent pairing. An odd field gives the lowest-ranked
//! team without a previous bye a walkover.

use crate::logic::{bracket, round_robin};
use crate::models::{
    GameMatch, MatchStatus, MatchTeam, OrchestratorError, Side, TeamId, Tournament,
};
use std::collections::{HashMap, HashSet};

/// Standard swiss length: enough rounds to separate an undefeated leader.
pub fn total_rounds(team_count: usize) -> u32 {
    team_count.next_power_of_two().trailing_zeros().max(1)
}

/// One team's swiss score line.
#[derive(Clone, Debug)]
pub struct Standing {
    pub team_id: TeamId,
    pub points: f64,
    pub buchholz: f64,
    pub played: u32,
    pub had_bye: bool,
}

/// Score lines from completed matches, best first. Wins are worth one
/// point, draws half; a walkover bye counts as a win against nobody.
pub fn standings(tournament: &Tournament, entry_order: &[TeamId]) -> Vec<Standing> {
    let mut points: HashMap<TeamId, f64> = entry_order.iter().map(|id| (*id, 0.0)).collect();
    let mut played: HashMap<TeamId, u32> = entry_order.iter().map(|id| (*id, 0)).collect();
    let mut byes: HashSet<TeamId> = HashSet::new();
    let mut opponents: HashMap<TeamId, Vec<TeamId>> = HashMap::new();

    for m in &tournament.matches {
        if m.status != MatchStatus::Completed {
            continue;
        }
        let side1 = m.team1.as_ref().and_then(|t| t.team_id);
        let side2 = m.team2.as_ref().and_then(|t| t.team_id);
        match (side1, side2) {
            (Some(a), Some(b)) => {
                opponents.entry(a).or_default().push(b);
                opponents.entry(b).or_default().push(a);
                match m.winner {
                    Some(Side::Team1) => add(&mut points, a, 1.0),
                    Some(Side::Team2) => add(&mut points, b, 1.0),
                    None => {
                        add(&mut points, a, 0.5);
                        add(&mut points, b, 0.5);
                    }
                }
                bump(&mut played, a);
                bump(&mut played, b);
            }
            (Some(a), None) | (None, Some(a)) => {
                if m.walkover {
                    add(&mut points, a, 1.0);
                    byes.insert(a);
                }
                bump(&mut played, a);
            }
            (None, None) => {}
        }
    }

    let entry_index: HashMap<TeamId, usize> = entry_order
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    let mut table: Vec<Standing> = entry_order
        .iter()
        .map(|id| {
            let buchholz = opponents
                .get(id)
                .map(|opps| {
                    opps.iter()
                        .map(|o| points.get(o).copied().unwrap_or(0.0))
                        .sum()
                })
                .unwrap_or(0.0);
            Standing {
                team_id: *id,
                points: points.get(id).copied().unwrap_or(0.0),
                buchholz,
                played: played.get(id).copied().unwrap_or(0),
                had_bye: byes.contains(id),
            }
        })
        .collect();
    table.sort_by(|a, b| {
        b.points
            .total_cmp(&a.points)
            .then(b.buchholz.total_cmp(&a.buchholz))
            .then_with(|| entry_index.get(&a.team_id).cmp(&entry_index.get(&b.team_id)))
    });
    table
}

/// Append the next swiss round's matches to the tournament.
pub fn generate_round(
    tournament: &mut Tournament,
    teams: &[MatchTeam],
    round: u32,
) -> Result<(), OrchestratorError> {
    let rosters: HashMap<TeamId, &MatchTeam> = teams
        .iter()
        .filter_map(|t| t.team_id.map(|id| (id, t)))
        .collect();
    let entry_order: Vec<TeamId> = teams.iter().filter_map(|t| t.team_id).collect();
    if rosters.len() < 2 {
        return Err(OrchestratorError::NotEnoughTeams { required: 2 });
    }

    let table = standings(tournament, &entry_order);
    let mut order: Vec<TeamId> = table.iter().map(|s| s.team_id).collect();

    let mut bye_team = None;
    if order.len() % 2 == 1 {
        let pick = order
            .iter()
            .rev()
            .find(|id| table.iter().any(|s| s.team_id == **id && !s.had_bye))
            .copied()
            .or_else(|| order.last().copied());
        if let Some(id) = pick {
            order.retain(|t| *t != id);
            bye_team = Some(id);
        }
    }

    let met = previous_pairings(tournament);
    let mut pairs = Vec::new();
    if !pair_avoiding_rematches(&order, &met, &mut pairs) {
        pairs = order
            .chunks(2)
            .filter(|c| c.len() == 2)
            .map(|c| (c[0], c[1]))
            .collect();
    }

    let mut number = round_robin::next_match_number(tournament);
    let mut new_matches = Vec::new();
    for (a, b) in pairs {
        let (Some(roster_a), Some(roster_b)) = (rosters.get(&a), rosters.get(&b)) else {
            continue;
        };
        let mut m = GameMatch::new(round, number);
        m.set_side(Side::Team1, (*roster_a).clone());
        m.set_side(Side::Team2, (*roster_b).clone());
        new_matches.push(m);
        number += 1;
    }
    if let Some(id) = bye_team {
        if let Some(roster) = rosters.get(&id) {
            let mut m = GameMatch::new(round, number);
            m.set_side(Side::Team1, (*roster).clone());
            m.mark_slot_bye(Side::Team2);
            new_matches.push(m);
        }
    }

    let uses_veto = tournament.kind.uses_veto();
    let format = tournament.format;
    let pool = tournament.maps.clone();
    for m in &mut new_matches {
        m.refresh_readiness(uses_veto, format, &pool);
    }
    tournament.matches.extend(new_matches);
    bracket::resolve_walkovers(tournament);
    Ok(())
}

fn add(points: &mut HashMap<TeamId, f64>, id: TeamId, value: f64) {
    *points.entry(id).or_insert(0.0) += value;
}

fn bump(played: &mut HashMap<TeamId, u32>, id: TeamId) {
    *played.entry(id).or_insert(0) += 1;
}

/// Unordered team pairs that have already met.
fn previous_pairings(tournament: &Tournament) -> HashSet<(TeamId, TeamId)> {
    let mut met = HashSet::new();
    for m in &tournament.matches {
        let pair = m
            .team1
            .as_ref()
            .and_then(|t| t.team_id)
            .zip(m.team2.as_ref().and_then(|t| t.team_id));
        if let Some((a, b)) = pair {
            met.insert(ordered_pair(a, b));
        }
    }
    met
}

fn ordered_pair(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Pair the ranked field top-down without rematches, backtracking when a
/// branch leaves an unpairable tail. The field length must be even.
fn pair_avoiding_rematches(
    order: &[TeamId],
    met: &HashSet<(TeamId, TeamId)>,
    out: &mut Vec<(TeamId, TeamId)>,
) -> bool {
    let Some((&first, rest)) = order.split_first() else {
        return true;
    };
    for i in 0..rest.len() {
        let opponent = rest[i];
        if met.contains(&ordered_pair(first, opponent)) {
            continue;
        }
        let remaining: Vec<TeamId> = rest
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, id)| *id)
            .collect();
        out.push((first, opponent));
        if pair_avoiding_rematches(&remaining, met, out) {
            return true;
        }
        out.pop();
    }
    false
}
