//! Round-robin scheduling by the circle method.
//!
//! The first seat is fixed and the rest rotate one step per round, so
//! every pair meets exactly once. An odd field gets a phantom seat; the
//! team drawn against it receives a walkover bye that round.

use crate::logic::bracket;
use crate::models::{GameMatch, MatchTeam, Side, Tournament};

/// Rounds needed for every pairing to happen once.
pub fn total_rounds(team_count: usize) -> u32 {
    if team_count % 2 == 0 {
        team_count.saturating_sub(1) as u32
    } else {
        team_count as u32
    }
}

/// Append the matches of one round (1-based) to the tournament.
pub fn generate_round(tournament: &mut Tournament, teams: &[MatchTeam], round: u32) {
    let mut seats: Vec<Option<usize>> = (0..teams.len()).map(Some).collect();
    if seats.len() % 2 == 1 {
        seats.push(None);
    }
    let len = seats.len();
    let mut rest = seats.split_off(1);
    rest.rotate_right((round as usize - 1) % (len - 1));
    seats.append(&mut rest);

    let mut number = next_match_number(tournament);
    let mut new_matches = Vec::new();
    for i in 0..len / 2 {
        let pair = (seats[i], seats[len - 1 - i]);
        match pair {
            (Some(a), Some(b)) => {
                let mut m = GameMatch::new(round, number);
                m.set_side(Side::Team1, teams[a].clone());
                m.set_side(Side::Team2, teams[b].clone());
                new_matches.push(m);
                number += 1;
            }
            (Some(a), None) | (None, Some(a)) => {
                let mut m = GameMatch::new(round, number);
                m.set_side(Side::Team1, teams[a].clone());
                m.mark_slot_bye(Side::Team2);
                new_matches.push(m);
                number += 1;
            }
            (None, None) => {}
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
}

/// Next free bracket-wide match number.
pub fn next_match_number(tournament: &Tournament) -> u32 {
    tournament
        .matches
        .iter()
        .map(|m| m.match_number)
        .max()
        .unwrap_or(0)
        + 1
}
