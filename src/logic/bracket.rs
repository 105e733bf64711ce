//! Elimination brackets: skeleton generation, result propagation, and
//! walkover resolution.
//!
//! The whole bracket is created up front with open slots. Every match
//! carries `winner_goes_to`/`loser_goes_to` links by match number; when a
//! match completes, its result flows along the links. A slot the bracket
//! can prove will never be filled is marked as a bye, and byes collapse
//! into walkover wins until every reachable match has two real teams.

use crate::models::{
    GameMatch, MatchStatus, MatchTeam, OrchestratorError, Side, Tournament,
};
use chrono::Utc;

/// Generate a full single-elimination bracket for the entered teams.
///
/// Teams are seeded in entry order into a bracket of the next power of
/// two; missing entries become byes, which immediately resolve to
/// walkover wins for the seeded side.
pub fn generate_single_elimination(
    tournament: &mut Tournament,
    teams: Vec<MatchTeam>,
) -> Result<(), OrchestratorError> {
    let n = teams.len();
    if n < 2 {
        return Err(OrchestratorError::NotEnoughTeams { required: 2 });
    }
    let size = n.next_power_of_two();
    let rounds = size.trailing_zeros();
    tournament.total_rounds = Some(rounds);

    let mut matches: Vec<GameMatch> = Vec::new();
    let mut round_start: Vec<usize> = Vec::new();
    let mut number = 1u32;
    for round in 1..=rounds {
        round_start.push(matches.len());
        for _ in 0..(size >> round) {
            matches.push(GameMatch::new(round, number));
            number += 1;
        }
    }

    for round in 1..rounds {
        let start = round_start[(round - 1) as usize];
        let next = round_start[round as usize];
        for j in 0..(size >> round) {
            let dest = matches[next + j / 2].match_number;
            matches[start + j].winner_goes_to = Some((dest, slot_side(j)));
        }
    }

    seed_first_round(&mut matches, teams, size);

    tournament.matches = matches;
    refresh_all(tournament);
    resolve_walkovers(tournament);
    Ok(())
}

/// Generate a full double-elimination bracket.
///
/// Winners-bracket round r keeps round number r. Losers-bracket round j
/// is numbered j+1 so that every match's round is strictly greater than
/// the rounds it depends on. The grand final (winners champion vs losers
/// champion, single match) sits at round 2k for a bracket of 2^k slots.
pub fn generate_double_elimination(
    tournament: &mut Tournament,
    teams: Vec<MatchTeam>,
) -> Result<(), OrchestratorError> {
    let n = teams.len();
    if n < 2 {
        return Err(OrchestratorError::NotEnoughTeams { required: 2 });
    }
    let size = n.next_power_of_two();
    let k = size.trailing_zeros() as usize;
    tournament.total_rounds = Some(2 * k as u32);

    // Build in display-round order so match numbers read naturally.
    let mut matches: Vec<GameMatch> = Vec::new();
    let mut wb: Vec<Vec<u32>> = vec![Vec::new(); k + 1];
    let mut lb: Vec<Vec<u32>> = vec![Vec::new(); 2 * k];
    let mut gf_number = 0u32;
    let mut number = 1u32;
    for display in 1..=(2 * k) {
        if display <= k {
            for _ in 0..(size >> display) {
                wb[display].push(number);
                matches.push(GameMatch::new(display as u32, number));
                number += 1;
            }
        }
        if k >= 2 && display >= 2 && display - 1 <= 2 * (k - 1) {
            let j = display - 1;
            let i = (j + 1) / 2;
            for _ in 0..(1usize << (k - 1 - i)) {
                lb[j].push(number);
                matches.push(GameMatch::new(display as u32, number));
                number += 1;
            }
        }
        if display == 2 * k {
            gf_number = number;
            matches.push(GameMatch::new(display as u32, number));
            number += 1;
        }
    }

    // Winners-bracket links.
    for r in 1..=k {
        for j in 0..wb[r].len() {
            let own = wb[r][j] as usize - 1;
            matches[own].winner_goes_to = Some(if r < k {
                (wb[r + 1][j / 2], slot_side(j))
            } else {
                (gf_number, Side::Team1)
            });
            matches[own].loser_goes_to = Some(if k == 1 {
                (gf_number, Side::Team2)
            } else if r == 1 {
                (lb[1][j / 2], slot_side(j))
            } else {
                (lb[2 * (r - 1)][j], Side::Team2)
            });
        }
    }

    // Losers-bracket links.
    if k >= 2 {
        for j in 1..=(2 * (k - 1)) {
            for idx in 0..lb[j].len() {
                let own = lb[j][idx] as usize - 1;
                matches[own].winner_goes_to = Some(if j == 2 * (k - 1) {
                    (gf_number, Side::Team2)
                } else if j % 2 == 1 {
                    (lb[j + 1][idx], Side::Team1)
                } else {
                    (lb[j + 1][idx / 2], slot_side(idx))
                });
            }
        }
    }

    seed_first_round(&mut matches, teams, size);

    tournament.matches = matches;
    refresh_all(tournament);
    resolve_walkovers(tournament);
    Ok(())
}

/// Push one completed match's outcome along its bracket links. A missing
/// winner (dead walkover) marks both destinations as byes.
pub fn propagate_result(tournament: &mut Tournament, match_number: u32) {
    let Some(game_match) = tournament.match_by_number(match_number) else {
        return;
    };
    if game_match.status != MatchStatus::Completed {
        return;
    }
    let winner_link = game_match.winner_goes_to;
    let loser_link = game_match.loser_goes_to;
    let winner_team = game_match.winner_team().cloned();
    let loser_team = game_match.loser_team().cloned();

    fill_slot(tournament, winner_link, winner_team);
    fill_slot(tournament, loser_link, loser_team);
}

/// Complete every match that can no longer be contested (a real team
/// against a bye, or two byes) until nothing changes.
pub fn resolve_walkovers(tournament: &mut Tournament) {
    loop {
        let candidate = tournament.matches.iter().find_map(|m| {
            if m.status == MatchStatus::Completed {
                return None;
            }
            let over = (m.team1.is_some() && m.team2_bye)
                || (m.team2.is_some() && m.team1_bye)
                || (m.team1_bye && m.team2_bye);
            over.then_some(m.match_number)
        });
        let Some(number) = candidate else {
            break;
        };
        if let Some(m) = tournament.match_by_number_mut(number) {
            m.winner = if m.team1.is_some() && m.team2_bye {
                Some(Side::Team1)
            } else if m.team2.is_some() && m.team1_bye {
                Some(Side::Team2)
            } else {
                None
            };
            m.walkover = true;
            m.status = MatchStatus::Completed;
            m.completed_at = Some(Utc::now());
        }
        propagate_result(tournament, number);
    }
}

fn fill_slot(tournament: &mut Tournament, link: Option<(u32, Side)>, team: Option<MatchTeam>) {
    let Some((dest, side)) = link else {
        return;
    };
    let uses_veto = tournament.kind.uses_veto();
    let format = tournament.format;
    let pool = tournament.maps.clone();
    let Some(target) = tournament.match_by_number_mut(dest) else {
        return;
    };
    match team {
        Some(team) => target.set_side(side, team),
        None => target.mark_slot_bye(side),
    }
    target.refresh_readiness(uses_veto, format, &pool);
}

/// Slot index within a pair to a match side.
fn slot_side(index: usize) -> Side {
    if index % 2 == 0 {
        Side::Team1
    } else {
        Side::Team2
    }
}

/// Place teams into the first round by classic seeding (seed 1 meets
/// seed 2 only in the final); seeds past the field are byes.
fn seed_first_round(matches: &mut [GameMatch], teams: Vec<MatchTeam>, size: usize) {
    let order = seed_order(size);
    let mut slots: Vec<Option<MatchTeam>> = teams.into_iter().map(Some).collect();
    for (slot, seed) in order.into_iter().enumerate() {
        let target = &mut matches[slot / 2];
        let side = slot_side(slot);
        match slots.get_mut(seed - 1).and_then(Option::take) {
            Some(team) => target.set_side(side, team),
            None => target.mark_slot_bye(side),
        }
    }
}

/// 1-based seeds in bracket slot order for a power-of-two field.
fn seed_order(size: usize) -> Vec<usize> {
    let mut order = vec![1usize];
    let mut len = 1;
    while len < size {
        len *= 2;
        let mut next = Vec::with_capacity(len);
        for &seed in &order {
            next.push(seed);
            next.push(len + 1 - seed);
        }
        order = next;
    }
    order
}

/// Re-run the readiness check on every match.
fn refresh_all(tournament: &mut Tournament) {
    let uses_veto = tournament.kind.uses_veto();
    let format = tournament.format;
    let pool = tournament.maps.clone();
    for m in &mut tournament.matches {
        m.refresh_readiness(uses_veto, format, &pool);
    }
}
