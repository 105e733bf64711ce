//! ELO rating updates applied when a match completes.
//!
//! Ratings are team-mean based: each player's expected score comes from
//! their team's mean rating against the opposing team's mean, so a strong
//! player on a weak roster is not punished for the pairing. Stat weights
//! from the template shift the delta after the win/loss core.

use crate::models::{EloTemplate, GameMatch, Player, PlayerId, Side};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Expected score of a rating against an opponent rating.
pub fn expected_score(own: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - own) / 400.0))
}

/// Apply rating changes for a completed match. Returns how many players
/// were updated. Walkovers and forced endings are the caller's concern;
/// this function rates whatever it is given, treating a missing winner
/// as a draw (half a point to both sides).
pub fn apply_match_ratings(
    players: &mut HashMap<PlayerId, Player>,
    template: &EloTemplate,
    game_match: &GameMatch,
    applied_at: DateTime<Utc>,
) -> usize {
    let side1: Vec<PlayerId> = game_match
        .team1
        .as_ref()
        .map(|t| t.players.clone())
        .unwrap_or_default();
    let side2: Vec<PlayerId> = game_match
        .team2
        .as_ref()
        .map(|t| t.players.clone())
        .unwrap_or_default();

    let mean1 = mean_elo(players, &side1);
    let mean2 = mean_elo(players, &side2);
    let (mean1, mean2) = match (mean1, mean2) {
        (Some(a), Some(b)) => (a, b),
        _ => return 0,
    };

    let actual1 = match game_match.winner {
        Some(Side::Team1) => 1.0,
        Some(Side::Team2) => 0.0,
        None => 0.5,
    };

    let mut updated = 0;
    updated += rate_side(players, template, game_match, &side1, mean1, mean2, actual1, applied_at);
    updated += rate_side(
        players,
        template,
        game_match,
        &side2,
        mean2,
        mean1,
        1.0 - actual1,
        applied_at,
    );
    updated
}

fn mean_elo(players: &HashMap<PlayerId, Player>, ids: &[PlayerId]) -> Option<f64> {
    let ratings: Vec<f64> = ids
        .iter()
        .filter_map(|id| players.get(id))
        .map(|p| p.current_elo as f64)
        .collect();
    if ratings.is_empty() {
        return None;
    }
    Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
}

#[allow(clippy::too_many_arguments)]
fn rate_side(
    players: &mut HashMap<PlayerId, Player>,
    template: &EloTemplate,
    game_match: &GameMatch,
    ids: &[PlayerId],
    own_mean: f64,
    opponent_mean: f64,
    actual: f64,
    applied_at: DateTime<Utc>,
) -> usize {
    let expected = expected_score(own_mean, opponent_mean);
    let mut updated = 0;
    for id in ids {
        let Some(player) = players.get_mut(id) else {
            continue;
        };
        let stats = game_match
            .player_stats
            .get(id)
            .copied()
            .unwrap_or_default();
        let delta = template.clamp(template.k_factor * (actual - expected) + template.stat_adjustment(&stats));
        let new_elo = (player.current_elo as f64 + delta).round() as i64;
        player.apply_rating(game_match.id, new_elo, applied_at);
        updated += 1;
    }
    updated
}
