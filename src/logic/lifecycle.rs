//! Match lifecycle: server-reported events, loading matches onto
//! servers, map veto actions, and admin overrides.
//!
//! Every incoming event is idempotent: a delivery whose `event_id` was
//! already processed, or that targets a completed match, is acknowledged
//! as a no-op. Nothing is mutated on a rejected event.

use crate::app::App;
use crate::logic::server_control::{MatchConfig, ServerControl};
use crate::logic::{bracket, rating};
use crate::models::{
    EloTemplate, GameMatch, GameServer, MapScore, MatchEvent, MatchEventBody, MatchId, MatchStatus,
    OrchestratorError, Player, PlayerId, PlayerMatchStats, ServerId, ServerStatus, Side,
    TemplateId, Tournament, VetoState,
};
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;

/// Apply one server-reported event to its match.
pub fn handle_match_event(
    app: &mut App,
    match_id: MatchId,
    event: &MatchEvent,
) -> Result<(), OrchestratorError> {
    let tournament_id = app
        .tournament_of_match(match_id)
        .ok_or(OrchestratorError::MatchNotFound(match_id))?;
    let App {
        players,
        servers,
        elo_templates,
        tournaments,
        ..
    } = app;
    let tournament = tournaments
        .get_mut(&tournament_id)
        .ok_or(OrchestratorError::TournamentNotFound(tournament_id))?;
    let is_bracket = tournament.kind.is_bracket();

    let m = tournament
        .find_match_mut(match_id)
        .ok_or(OrchestratorError::MatchNotFound(match_id))?;
    if m.status == MatchStatus::Completed {
        log::debug!("event {} for completed match {} acknowledged", event.event_id, match_id);
        return Ok(());
    }
    if m.processed_events.contains(&event.event_id) {
        log::debug!("duplicate event {} for match {} acknowledged", event.event_id, match_id);
        return Ok(());
    }

    let mut completion: Option<Option<Side>> = None;
    match &event.body {
        MatchEventBody::PlayersConnected { count } => {
            require_on_server(m)?;
            m.connected_players = *count;
        }
        MatchEventBody::GoingLive => match m.status {
            MatchStatus::Loaded => m.status = MatchStatus::Live,
            MatchStatus::Live => {}
            _ => return Err(OrchestratorError::InvalidState),
        },
        MatchEventBody::RoundScore {
            team1_score,
            team2_score,
        } => {
            require_on_server(m)?;
            m.live_team1_score = *team1_score;
            m.live_team2_score = *team2_score;
        }
        MatchEventBody::MapResult {
            map_number,
            team1_score,
            team2_score,
        } => {
            require_on_server(m)?;
            if *map_number == 0 {
                return Err(OrchestratorError::Validation(
                    "mapNumber must be at least 1".to_string(),
                ));
            }
            match m.map_scores.iter_mut().find(|s| s.map_number == *map_number) {
                Some(existing) => {
                    existing.team1_score = *team1_score;
                    existing.team2_score = *team2_score;
                }
                None => {
                    let map_name = m
                        .maps
                        .get(*map_number as usize - 1)
                        .cloned()
                        .unwrap_or_default();
                    m.map_scores.push(MapScore {
                        map_number: *map_number,
                        map_name,
                        team1_score: *team1_score,
                        team2_score: *team2_score,
                    });
                }
            }
            m.live_team1_score = 0;
            m.live_team2_score = 0;
        }
        MatchEventBody::SeriesEnd {
            team1_series_score,
            team2_series_score,
            player_stats,
        } => {
            require_on_server(m)?;
            let winner = series_outcome(m, *team1_series_score, *team2_series_score);
            if winner.is_none() && is_bracket {
                return Err(OrchestratorError::DrawNotAllowed);
            }
            m.live_team1_score = *team1_series_score;
            m.live_team2_score = *team2_series_score;
            for (steam_id, stats) in player_stats {
                if let Some(player_id) = player_by_steam(players, steam_id) {
                    m.player_stats.insert(player_id, *stats);
                }
            }
            completion = Some(winner);
        }
    }

    if let Some(m) = tournament.find_match_mut(match_id) {
        m.processed_events.insert(event.event_id);
    }
    if let Some(winner) = completion {
        finalize_match(
            players,
            servers,
            elo_templates,
            tournament,
            match_id,
            winner,
            false,
        )?;
    }
    Ok(())
}

/// Assign a server to a ready match and push the config to it. A loaded
/// match may be re-pushed or moved to a different online server.
pub fn load_match(
    app: &mut App,
    match_id: MatchId,
    server_id: ServerId,
    control: &impl ServerControl,
) -> Result<(), OrchestratorError> {
    let tournament_id = app
        .tournament_of_match(match_id)
        .ok_or(OrchestratorError::MatchNotFound(match_id))?;
    let App {
        players,
        servers,
        elo_templates,
        tournaments,
        settings,
        ..
    } = app;
    let tournament = tournaments
        .get_mut(&tournament_id)
        .ok_or(OrchestratorError::TournamentNotFound(tournament_id))?;

    {
        let m = tournament
            .find_match(match_id)
            .ok_or(OrchestratorError::MatchNotFound(match_id))?;
        if !matches!(m.status, MatchStatus::Ready | MatchStatus::Loaded) {
            return Err(OrchestratorError::InvalidState);
        }
        let server = servers
            .get(&server_id)
            .ok_or(OrchestratorError::ServerNotFound(server_id))?;
        if server.status != ServerStatus::Online {
            return Err(OrchestratorError::ServerUnavailable);
        }
        if server.current_match.is_some() && server.current_match != Some(match_id) {
            return Err(OrchestratorError::ServerBusy);
        }
        let config = MatchConfig::for_match(m, tournament, settings)?;
        control.load_match(server, &config)?;
    }

    let released = {
        let m = tournament
            .find_match_mut(match_id)
            .ok_or(OrchestratorError::MatchNotFound(match_id))?;
        let previous = m.server_id.replace(server_id);
        m.status = MatchStatus::Loaded;
        m.loaded_at = Some(Utc::now());
        m.connected_players = 0;
        previous.filter(|old| *old != server_id)
    };
    if let Some(old_id) = released {
        if let Some(old) = servers.get_mut(&old_id) {
            if old.current_match == Some(match_id) {
                old.current_match = None;
            }
        }
    }
    if let Some(server) = servers.get_mut(&server_id) {
        server.current_match = Some(match_id);
    }
    log::info!("match {} loaded on server {}", match_id, server_id);

    if settings.simulate_matches {
        simulate_series(players, servers, elo_templates, tournament, match_id)?;
    }
    Ok(())
}

/// Apply one veto ban/pick on behalf of a side.
pub fn veto_action(
    app: &mut App,
    match_id: MatchId,
    side: Side,
    map: &str,
) -> Result<(), OrchestratorError> {
    let tournament_id = app
        .tournament_of_match(match_id)
        .ok_or(OrchestratorError::MatchNotFound(match_id))?;
    let tournament = app
        .tournaments
        .get_mut(&tournament_id)
        .ok_or(OrchestratorError::TournamentNotFound(tournament_id))?;
    if !tournament.kind.uses_veto() {
        return Err(OrchestratorError::Validation(
            "this tournament has no map veto".to_string(),
        ));
    }
    let format = tournament.format;
    let pool = tournament.maps.clone();
    let m = tournament
        .find_match_mut(match_id)
        .ok_or(OrchestratorError::MatchNotFound(match_id))?;
    if m.status != MatchStatus::Pending {
        let done = m.veto.as_ref().map(|v| v.completed).unwrap_or(false);
        return Err(if done {
            OrchestratorError::VetoComplete
        } else {
            OrchestratorError::InvalidState
        });
    }
    if !m.both_sides_populated() {
        return Err(OrchestratorError::InvalidState);
    }
    let veto = m
        .veto
        .get_or_insert_with(|| VetoState::new(format, pool.clone()));
    veto.apply(side, map)?;
    m.refresh_readiness(true, format, &pool);
    Ok(())
}

/// Probe a server and record whether it answered.
pub fn check_server(
    app: &mut App,
    server_id: ServerId,
    control: &impl ServerControl,
) -> Result<ServerStatus, OrchestratorError> {
    let server = app
        .servers
        .get_mut(&server_id)
        .ok_or(OrchestratorError::ServerNotFound(server_id))?;
    server.status = ServerStatus::Checking;
    let reachable = matches!(control.check(server), Ok(true));
    server.status = if reachable {
        ServerStatus::Online
    } else {
        ServerStatus::Offline
    };
    Ok(server.status)
}

/// Admin override: end a match now. Elimination matches need a declared
/// winner; other formats may be forced to a draw. Forced endings do not
/// move ratings.
pub fn force_end_match(
    app: &mut App,
    match_id: MatchId,
    winner: Option<Side>,
) -> Result<(), OrchestratorError> {
    let tournament_id = app
        .tournament_of_match(match_id)
        .ok_or(OrchestratorError::MatchNotFound(match_id))?;
    let App {
        players,
        servers,
        elo_templates,
        tournaments,
        ..
    } = app;
    let tournament = tournaments
        .get_mut(&tournament_id)
        .ok_or(OrchestratorError::TournamentNotFound(tournament_id))?;
    if winner.is_none() && tournament.kind.is_bracket() {
        return Err(OrchestratorError::DrawNotAllowed);
    }
    {
        let m = tournament
            .find_match(match_id)
            .ok_or(OrchestratorError::MatchNotFound(match_id))?;
        if m.status == MatchStatus::Completed {
            return Err(OrchestratorError::InvalidState);
        }
        if let Some(side) = winner {
            if m.side(side).is_none() {
                return Err(OrchestratorError::Validation(
                    "the declared winner has no team assigned".to_string(),
                ));
            }
        }
    }
    finalize_match(
        players,
        servers,
        elo_templates,
        tournament,
        match_id,
        winner,
        true,
    )
}

/// Shared completion path: record the result, free the server, apply
/// ratings, and push bracket consequences.
fn finalize_match(
    players: &mut HashMap<PlayerId, Player>,
    servers: &mut HashMap<ServerId, GameServer>,
    elo_templates: &HashMap<TemplateId, EloTemplate>,
    tournament: &mut Tournament,
    match_id: MatchId,
    winner: Option<Side>,
    forced: bool,
) -> Result<(), OrchestratorError> {
    let now = Utc::now();
    let rate = {
        let m = tournament
            .find_match_mut(match_id)
            .ok_or(OrchestratorError::MatchNotFound(match_id))?;
        m.status = MatchStatus::Completed;
        m.winner = winner;
        m.forced = forced;
        m.completed_at = Some(now);
        if let Some(server_id) = m.server_id.take() {
            if let Some(server) = servers.get_mut(&server_id) {
                if server.current_match == Some(match_id) {
                    server.current_match = None;
                }
            }
        }
        !m.walkover && !forced && m.both_sides_populated()
    };

    if rate {
        let template = tournament
            .elo_template_id
            .and_then(|id| elo_templates.get(&id));
        if let (Some(template), Some(m)) = (template, tournament.find_match(match_id)) {
            let updated = rating::apply_match_ratings(players, template, m, now);
            log::debug!("match {}: ratings applied to {} players", match_id, updated);
        }
    }

    if let Some(number) = tournament.find_match(match_id).map(|m| m.match_number) {
        bracket::propagate_result(tournament, number);
        bracket::resolve_walkovers(tournament);
    }
    log::info!(
        "match {} completed ({})",
        match_id,
        match winner {
            Some(Side::Team1) => "team 1 wins",
            Some(Side::Team2) => "team 2 wins",
            None => "draw",
        }
    );
    Ok(())
}

/// Winner per the series rules: strictly more map wins, then the
/// reported series score, then a draw.
fn series_outcome(m: &GameMatch, team1_series: u32, team2_series: u32) -> Option<Side> {
    let (w1, w2) = m.map_wins();
    if w1 != w2 {
        return Some(if w1 > w2 { Side::Team1 } else { Side::Team2 });
    }
    match team1_series.cmp(&team2_series) {
        std::cmp::Ordering::Greater => Some(Side::Team1),
        std::cmp::Ordering::Less => Some(Side::Team2),
        std::cmp::Ordering::Equal => None,
    }
}

fn require_on_server(m: &GameMatch) -> Result<(), OrchestratorError> {
    match m.status {
        MatchStatus::Loaded | MatchStatus::Live => Ok(()),
        _ => Err(OrchestratorError::InvalidState),
    }
}

fn player_by_steam(players: &HashMap<PlayerId, Player>, steam_id: &str) -> Option<PlayerId> {
    players
        .values()
        .find(|p| p.steam_id == steam_id)
        .map(|p| p.id)
}

/// Auto-play a just-loaded match with plausible scores. Active when the
/// `simulateMatches` setting is on.
fn simulate_series(
    players: &mut HashMap<PlayerId, Player>,
    servers: &mut HashMap<ServerId, GameServer>,
    elo_templates: &HashMap<TemplateId, EloTemplate>,
    tournament: &mut Tournament,
    match_id: MatchId,
) -> Result<(), OrchestratorError> {
    let expected = tournament.expected_players_total;
    let needed = tournament.format.maps_to_win();
    let winner = {
        let m = tournament
            .find_match_mut(match_id)
            .ok_or(OrchestratorError::MatchNotFound(match_id))?;
        let mut rng = rand::thread_rng();
        m.connected_players = expected;
        m.status = MatchStatus::Live;
        let maps = m.maps.clone();
        let mut wins = (0u32, 0u32);
        for (i, map_name) in maps.iter().enumerate() {
            if wins.0 == needed || wins.1 == needed {
                break;
            }
            let team1_takes_it = rng.gen_bool(0.5);
            let losing_score = rng.gen_range(0..12);
            let (s1, s2) = if team1_takes_it {
                (13, losing_score)
            } else {
                (losing_score, 13)
            };
            m.map_scores.push(MapScore {
                map_number: i as u32 + 1,
                map_name: map_name.clone(),
                team1_score: s1,
                team2_score: s2,
            });
            if team1_takes_it {
                wins.0 += 1;
            } else {
                wins.1 += 1;
            }
        }
        m.live_team1_score = wins.0;
        m.live_team2_score = wins.1;
        for player_id in m.participants() {
            m.player_stats.insert(
                player_id,
                PlayerMatchStats {
                    kills: rng.gen_range(5..30),
                    deaths: rng.gen_range(5..25),
                    assists: rng.gen_range(0..12),
                    mvps: rng.gen_range(0..6),
                },
            );
        }
        if wins.0 > wins.1 {
            Some(Side::Team1)
        } else {
            Some(Side::Team2)
        }
    };
    finalize_match(
        players,
        servers,
        elo_templates,
        tournament,
        match_id,
        winner,
        false,
    )
}
