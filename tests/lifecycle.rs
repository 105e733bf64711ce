//! Integration tests for the match lifecycle: server assignment,
//! reported events, idempotent deliveries, and admin force-ends.

use matchzy_tournament_web::logic::{MatchConfig, ServerControl, SimulatedServerControl};
use matchzy_tournament_web::models::{MatchEventBody, PlayerMatchStats, SeriesFormat, ServerStatus};
use matchzy_tournament_web::{
    check_server, force_end_match, handle_match_event, load_match, start_tournament, veto_action,
    App, GameServer, MatchEvent, MatchId, MatchStatus, OrchestratorError, PlayerId, ServerId,
    Side, TournamentId, TournamentType,
};
use std::collections::HashMap;
use uuid::Uuid;

fn steam(n: usize) -> String {
    format!("76561198{n:09}")
}

fn ev(body: MatchEventBody) -> MatchEvent {
    MatchEvent {
        event_id: Uuid::new_v4(),
        body,
    }
}

/// A started shuffle night: `count` players at 1000 ELO, `team_size` a side.
fn shuffle_night(count: usize, team_size: u32) -> (App, TournamentId) {
    let mut app = App::new(false);
    let mut ids = Vec::new();
    for i in 0..count {
        ids.push(app.create_player(&steam(i), &format!("P{i}"), None, None).unwrap().id);
    }
    let tournament = app
        .create_tournament(
            "Mix Night",
            TournamentType::Shuffle,
            SeriesFormat::Bo1,
            None,
            None,
            Some(team_size),
        )
        .unwrap()
        .id;
    for id in ids {
        app.register_player(tournament, id).unwrap();
    }
    start_tournament(&mut app, tournament).unwrap();
    (app, tournament)
}

fn online_server(app: &mut App, name: &str, port: u16) -> ServerId {
    let id = app.create_server(name, "10.0.0.1", port, "rcon").unwrap().id;
    check_server(app, id, &SimulatedServerControl).unwrap();
    id
}

fn first_match(app: &App, tournament: TournamentId) -> MatchId {
    app.tournaments[&tournament].matches[0].id
}

fn status_of(app: &App, tournament: TournamentId, match_id: MatchId) -> MatchStatus {
    app.tournaments[&tournament].find_match(match_id).unwrap().status
}

fn roster(app: &App, tournament: TournamentId, match_id: MatchId, side: Side) -> Vec<PlayerId> {
    app.tournaments[&tournament]
        .find_match(match_id)
        .unwrap()
        .side(side)
        .unwrap()
        .players
        .clone()
}

/// Two one-player teams in a bo1 bracket, veto already finished.
fn bracket_duel() -> (App, TournamentId, MatchId) {
    let mut app = App::new(false);
    let mut teams = Vec::new();
    for i in 0..2 {
        let player = app
            .create_player(&steam(100 + i), &format!("Star {i}"), None, None)
            .unwrap()
            .id;
        teams.push(app.create_team(&format!("Team {i}"), "", vec![player]).unwrap().id);
    }
    let tournament = app
        .create_tournament(
            "Playoff",
            TournamentType::SingleElimination,
            SeriesFormat::Bo1,
            None,
            None,
            None,
        )
        .unwrap()
        .id;
    for team in teams {
        app.add_team_to_tournament(tournament, team).unwrap();
    }
    start_tournament(&mut app, tournament).unwrap();
    let match_id = first_match(&app, tournament);
    let maps = app.tournaments[&tournament].maps.clone();
    for (i, map) in maps.iter().take(6).enumerate() {
        let side = if i % 2 == 0 { Side::Team1 } else { Side::Team2 };
        veto_action(&mut app, match_id, side, map).unwrap();
    }
    (app, tournament, match_id)
}

/// Answers the probe but refuses every push.
struct PushFails;

impl ServerControl for PushFails {
    fn check(&self, _server: &GameServer) -> Result<bool, OrchestratorError> {
        Ok(true)
    }

    fn load_match(
        &self,
        _server: &GameServer,
        _config: &MatchConfig,
    ) -> Result<(), OrchestratorError> {
        Err(OrchestratorError::External("rcon refused".to_string()))
    }

    fn send_command(
        &self,
        _server: &GameServer,
        _command: &str,
    ) -> Result<String, OrchestratorError> {
        Err(OrchestratorError::External("rcon refused".to_string()))
    }
}

/// Never answers the probe.
struct Unreachable;

impl ServerControl for Unreachable {
    fn check(&self, _server: &GameServer) -> Result<bool, OrchestratorError> {
        Ok(false)
    }

    fn load_match(
        &self,
        _server: &GameServer,
        _config: &MatchConfig,
    ) -> Result<(), OrchestratorError> {
        Err(OrchestratorError::ServerUnavailable)
    }

    fn send_command(
        &self,
        _server: &GameServer,
        _command: &str,
    ) -> Result<String, OrchestratorError> {
        Err(OrchestratorError::ServerUnavailable)
    }
}

#[test]
fn only_an_online_server_takes_a_match() {
    let (mut app, tournament) = shuffle_night(10, 5);
    let match_id = first_match(&app, tournament);
    let server_id = app.create_server("srv-1", "10.0.0.1", 27015, "rcon").unwrap().id;

    // Newly added servers are unverified until a check succeeds.
    assert_eq!(app.servers[&server_id].status, ServerStatus::Checking);
    assert!(matches!(
        load_match(&mut app, match_id, server_id, &SimulatedServerControl),
        Err(OrchestratorError::ServerUnavailable)
    ));

    assert_eq!(
        check_server(&mut app, server_id, &SimulatedServerControl).unwrap(),
        ServerStatus::Online
    );
    load_match(&mut app, match_id, server_id, &SimulatedServerControl).unwrap();

    let m = app.tournaments[&tournament].find_match(match_id).unwrap();
    assert_eq!(m.status, MatchStatus::Loaded);
    assert!(m.loaded_at.is_some());
    assert_eq!(m.server_id, Some(server_id));
    assert_eq!(app.servers[&server_id].current_match, Some(match_id));
}

#[test]
fn a_failed_probe_marks_the_server_offline() {
    let mut app = App::new(false);
    let server_id = app.create_server("srv-1", "10.0.0.1", 27015, "rcon").unwrap().id;
    assert_eq!(
        check_server(&mut app, server_id, &Unreachable).unwrap(),
        ServerStatus::Offline
    );
    assert_eq!(app.servers[&server_id].status, ServerStatus::Offline);
}

#[test]
fn a_server_runs_one_match_at_a_time() {
    let (mut app, tournament) = shuffle_night(20, 5); // 4 teams -> 2 matches
    let first = app.tournaments[&tournament].matches[0].id;
    let second = app.tournaments[&tournament].matches[1].id;
    let server_id = online_server(&mut app, "srv-1", 27015);

    load_match(&mut app, first, server_id, &SimulatedServerControl).unwrap();
    assert!(matches!(
        load_match(&mut app, second, server_id, &SimulatedServerControl),
        Err(OrchestratorError::ServerBusy)
    ));

    let other = online_server(&mut app, "srv-2", 27016);
    load_match(&mut app, second, other, &SimulatedServerControl).unwrap();
}

#[test]
fn a_loaded_match_can_move_servers() {
    let (mut app, tournament) = shuffle_night(10, 5);
    let match_id = first_match(&app, tournament);
    let old = online_server(&mut app, "srv-1", 27015);
    let new = online_server(&mut app, "srv-2", 27016);

    load_match(&mut app, match_id, old, &SimulatedServerControl).unwrap();
    load_match(&mut app, match_id, new, &SimulatedServerControl).unwrap();

    assert_eq!(app.servers[&old].current_match, None);
    assert_eq!(app.servers[&new].current_match, Some(match_id));
    assert_eq!(
        app.tournaments[&tournament].find_match(match_id).unwrap().server_id,
        Some(new)
    );
}

#[test]
fn a_failed_push_changes_nothing() {
    let (mut app, tournament) = shuffle_night(10, 5);
    let match_id = first_match(&app, tournament);
    let server_id = online_server(&mut app, "srv-1", 27015);

    assert!(matches!(
        load_match(&mut app, match_id, server_id, &PushFails),
        Err(OrchestratorError::External(_))
    ));
    let m = app.tournaments[&tournament].find_match(match_id).unwrap();
    assert_eq!(m.status, MatchStatus::Ready);
    assert_eq!(m.server_id, None);
    assert_eq!(app.servers[&server_id].current_match, None);
}

#[test]
fn reported_events_drive_a_match_to_completion() {
    let (mut app, tournament) = shuffle_night(10, 5);
    let match_id = first_match(&app, tournament);
    let server_id = online_server(&mut app, "srv-1", 27015);
    load_match(&mut app, match_id, server_id, &SimulatedServerControl).unwrap();

    handle_match_event(&mut app, match_id, &ev(MatchEventBody::PlayersConnected { count: 10 }))
        .unwrap();
    assert_eq!(
        app.tournaments[&tournament].find_match(match_id).unwrap().connected_players,
        10
    );

    handle_match_event(&mut app, match_id, &ev(MatchEventBody::GoingLive)).unwrap();
    assert_eq!(status_of(&app, tournament, match_id), MatchStatus::Live);

    handle_match_event(
        &mut app,
        match_id,
        &ev(MatchEventBody::RoundScore { team1_score: 12, team2_score: 10 }),
    )
    .unwrap();
    let m = app.tournaments[&tournament].find_match(match_id).unwrap();
    assert_eq!((m.live_team1_score, m.live_team2_score), (12, 10));

    handle_match_event(
        &mut app,
        match_id,
        &ev(MatchEventBody::MapResult { map_number: 1, team1_score: 13, team2_score: 10 }),
    )
    .unwrap();
    let m = app.tournaments[&tournament].find_match(match_id).unwrap();
    assert_eq!(m.map_scores.len(), 1);
    assert_eq!(m.map_scores[0].map_number, 1);
    assert_eq!(m.map_scores[0].map_name, m.maps[0]);
    assert_eq!((m.map_scores[0].team1_score, m.map_scores[0].team2_score), (13, 10));
    // The live counter starts over for the next map.
    assert_eq!((m.live_team1_score, m.live_team2_score), (0, 0));

    let winners = roster(&app, tournament, match_id, Side::Team1);
    let losers = roster(&app, tournament, match_id, Side::Team2);
    let star = winners[0];
    let star_steam = app.players[&star].steam_id.clone();
    let stats = HashMap::from([(
        star_steam,
        PlayerMatchStats { kills: 24, deaths: 11, assists: 6, mvps: 4 },
    )]);
    handle_match_event(
        &mut app,
        match_id,
        &ev(MatchEventBody::SeriesEnd {
            team1_series_score: 1,
            team2_series_score: 0,
            player_stats: stats,
        }),
    )
    .unwrap();

    let m = app.tournaments[&tournament].find_match(match_id).unwrap();
    assert_eq!(m.status, MatchStatus::Completed);
    assert_eq!(m.winner, Some(Side::Team1));
    assert!(m.completed_at.is_some());
    assert_eq!(m.server_id, None);
    assert_eq!(app.servers[&server_id].current_match, None);
    assert_eq!(m.player_stats[&star].kills, 24);

    // Equal 1000-mean teams under k=32: winners +16, losers -16.
    for id in &winners {
        assert_eq!(app.players[id].current_elo, 1016);
        assert_eq!(app.players[id].rating_history.len(), 1);
    }
    for id in &losers {
        assert_eq!(app.players[id].current_elo, 984);
    }
}

#[test]
fn event_replays_are_acknowledged_once() {
    let (mut app, tournament) = shuffle_night(10, 5);
    let match_id = first_match(&app, tournament);
    let server_id = online_server(&mut app, "srv-1", 27015);
    load_match(&mut app, match_id, server_id, &SimulatedServerControl).unwrap();
    handle_match_event(&mut app, match_id, &ev(MatchEventBody::GoingLive)).unwrap();

    let series_end = ev(MatchEventBody::SeriesEnd {
        team1_series_score: 1,
        team2_series_score: 0,
        player_stats: HashMap::new(),
    });
    handle_match_event(&mut app, match_id, &series_end).unwrap();
    let winners = roster(&app, tournament, match_id, Side::Team1);
    assert_eq!(app.players[&winners[0]].current_elo, 1016);

    // The broker redelivers: same event id, no second rating pass.
    handle_match_event(&mut app, match_id, &series_end).unwrap();
    assert_eq!(app.players[&winners[0]].current_elo, 1016);
    assert_eq!(app.players[&winners[0]].rating_history.len(), 1);

    // A brand-new event for a finished match is swallowed too.
    let late = ev(MatchEventBody::RoundScore { team1_score: 3, team2_score: 3 });
    handle_match_event(&mut app, match_id, &late).unwrap();
    let m = app.tournaments[&tournament].find_match(match_id).unwrap();
    assert_eq!(m.status, MatchStatus::Completed);
    assert!(!m.processed_events.contains(&late.event_id));
}

#[test]
fn events_need_a_loaded_match() {
    let (mut app, tournament) = shuffle_night(10, 5);
    let match_id = first_match(&app, tournament);
    assert_eq!(status_of(&app, tournament, match_id), MatchStatus::Ready);

    assert!(matches!(
        handle_match_event(&mut app, match_id, &ev(MatchEventBody::PlayersConnected { count: 4 })),
        Err(OrchestratorError::InvalidState)
    ));
    assert!(matches!(
        handle_match_event(&mut app, match_id, &ev(MatchEventBody::GoingLive)),
        Err(OrchestratorError::InvalidState)
    ));
}

#[test]
fn going_live_twice_stays_live() {
    let (mut app, tournament) = shuffle_night(10, 5);
    let match_id = first_match(&app, tournament);
    let server_id = online_server(&mut app, "srv-1", 27015);
    load_match(&mut app, match_id, server_id, &SimulatedServerControl).unwrap();

    handle_match_event(&mut app, match_id, &ev(MatchEventBody::GoingLive)).unwrap();
    handle_match_event(&mut app, match_id, &ev(MatchEventBody::GoingLive)).unwrap();
    assert_eq!(status_of(&app, tournament, match_id), MatchStatus::Live);
}

#[test]
fn a_drawn_series_cannot_end_an_elimination_match() {
    let (mut app, tournament, match_id) = bracket_duel();
    let server_id = online_server(&mut app, "srv-1", 27015);
    load_match(&mut app, match_id, server_id, &SimulatedServerControl).unwrap();
    handle_match_event(&mut app, match_id, &ev(MatchEventBody::GoingLive)).unwrap();

    assert!(matches!(
        handle_match_event(
            &mut app,
            match_id,
            &ev(MatchEventBody::SeriesEnd {
                team1_series_score: 0,
                team2_series_score: 0,
                player_stats: HashMap::new(),
            }),
        ),
        Err(OrchestratorError::DrawNotAllowed)
    ));
    assert_eq!(status_of(&app, tournament, match_id), MatchStatus::Live);

    // A corrected decisive report still lands.
    handle_match_event(
        &mut app,
        match_id,
        &ev(MatchEventBody::SeriesEnd {
            team1_series_score: 1,
            team2_series_score: 0,
            player_stats: HashMap::new(),
        }),
    )
    .unwrap();
    let m = app.tournaments[&tournament].find_match(match_id).unwrap();
    assert_eq!(m.winner, Some(Side::Team1));
}

#[test]
fn a_drawn_series_stands_outside_brackets() {
    let (mut app, tournament) = shuffle_night(10, 5);
    let match_id = first_match(&app, tournament);
    let server_id = online_server(&mut app, "srv-1", 27015);
    load_match(&mut app, match_id, server_id, &SimulatedServerControl).unwrap();
    handle_match_event(&mut app, match_id, &ev(MatchEventBody::GoingLive)).unwrap();

    handle_match_event(
        &mut app,
        match_id,
        &ev(MatchEventBody::SeriesEnd {
            team1_series_score: 0,
            team2_series_score: 0,
            player_stats: HashMap::new(),
        }),
    )
    .unwrap();

    let m = app.tournaments[&tournament].find_match(match_id).unwrap();
    assert_eq!(m.status, MatchStatus::Completed);
    assert_eq!(m.winner, None);
    // Half a point each at equal ratings moves nobody, but the change is recorded.
    let player = roster(&app, tournament, match_id, Side::Team1)[0];
    assert_eq!(app.players[&player].current_elo, 1000);
    assert_eq!(app.players[&player].rating_history.len(), 1);
}

#[test]
fn force_end_names_a_winner_without_moving_ratings() {
    let (mut app, tournament) = shuffle_night(10, 5);
    let match_id = first_match(&app, tournament);
    let server_id = online_server(&mut app, "srv-1", 27015);
    load_match(&mut app, match_id, server_id, &SimulatedServerControl).unwrap();

    force_end_match(&mut app, match_id, Some(Side::Team2)).unwrap();

    let m = app.tournaments[&tournament].find_match(match_id).unwrap();
    assert_eq!(m.status, MatchStatus::Completed);
    assert!(m.forced);
    assert_eq!(m.winner, Some(Side::Team2));
    assert_eq!(m.server_id, None);
    assert_eq!(app.servers[&server_id].current_match, None);

    let winner = roster(&app, tournament, match_id, Side::Team2)[0];
    assert_eq!(app.players[&winner].current_elo, 1000);
    assert!(app.players[&winner].rating_history.is_empty());
}

#[test]
fn a_forced_draw_needs_a_non_bracket() {
    let (mut app, _, match_id) = bracket_duel();
    assert!(matches!(
        force_end_match(&mut app, match_id, None),
        Err(OrchestratorError::DrawNotAllowed)
    ));

    let (mut mix, mix_tournament) = shuffle_night(10, 5);
    let mix_match = first_match(&mix, mix_tournament);
    force_end_match(&mut mix, mix_match, None).unwrap();
    assert_eq!(
        mix.tournaments[&mix_tournament].find_match(mix_match).unwrap().winner,
        None
    );
}

#[test]
fn an_empty_slot_cannot_be_declared_winner() {
    let mut app = App::new(false);
    let mut teams = Vec::new();
    for i in 0..3 {
        let player = app
            .create_player(&steam(200 + i), &format!("P{i}"), None, None)
            .unwrap()
            .id;
        teams.push(app.create_team(&format!("Trio {i}"), "", vec![player]).unwrap().id);
    }
    let tournament = app
        .create_tournament(
            "Cup",
            TournamentType::SingleElimination,
            SeriesFormat::Bo1,
            None,
            None,
            None,
        )
        .unwrap()
        .id;
    for team in teams {
        app.add_team_to_tournament(tournament, team).unwrap();
    }
    start_tournament(&mut app, tournament).unwrap();

    // With three teams the final already holds the walkover winner; the
    // other slot stays open until the contested semi is played.
    let final_id = app.tournaments[&tournament].match_by_number(3).unwrap().id;
    assert!(matches!(
        force_end_match(&mut app, final_id, Some(Side::Team2)),
        Err(OrchestratorError::Validation(_))
    ));
}

#[test]
fn a_completed_match_cannot_be_forced_twice() {
    let (mut app, tournament) = shuffle_night(10, 5);
    let match_id = first_match(&app, tournament);
    force_end_match(&mut app, match_id, Some(Side::Team1)).unwrap();
    assert!(matches!(
        force_end_match(&mut app, match_id, Some(Side::Team1)),
        Err(OrchestratorError::InvalidState)
    ));
    assert_eq!(status_of(&app, tournament, match_id), MatchStatus::Completed);
}

#[test]
fn simulated_play_runs_the_match_out() {
    let (mut app, tournament) = shuffle_night(10, 5);
    app.settings.simulate_matches = true;
    let match_id = first_match(&app, tournament);
    let server_id = online_server(&mut app, "srv-1", 27015);

    load_match(&mut app, match_id, server_id, &SimulatedServerControl).unwrap();

    let m = app.tournaments[&tournament].find_match(match_id).unwrap();
    assert_eq!(m.status, MatchStatus::Completed);
    assert!(m.winner.is_some()); // bo1 cannot draw
    assert!(!m.map_scores.is_empty());
    assert_eq!(app.servers[&server_id].current_match, None);
    for id in m.participants() {
        assert_eq!(app.players[&id].rating_history.len(), 1);
    }
}
