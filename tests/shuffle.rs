//! Integration tests for shuffle tournaments: ELO-balanced ad-hoc teams,
//! sit-out rotation, and per-round registration.

use matchzy_tournament_web::models::SeriesFormat;
use matchzy_tournament_web::{
    force_end_match, generate_next_round, start_tournament, App, MatchId, MatchStatus,
    OrchestratorError, PlayerId, Side, TournamentId, TournamentStatus, TournamentType,
};
use std::collections::HashSet;

fn steam(n: usize) -> String {
    format!("76561198{n:09}")
}

/// Registered-but-not-started shuffle night; players get distinct ratings.
fn mix(count: usize) -> (App, TournamentId, Vec<PlayerId>) {
    let mut app = App::new(false);
    let mut ids = Vec::new();
    for i in 0..count {
        let player = app
            .create_player(&steam(i), &format!("P{i}"), None, Some(1000 + i as i64 * 50))
            .unwrap()
            .id;
        ids.push(player);
    }
    let tournament = app
        .create_tournament("Mix", TournamentType::Shuffle, SeriesFormat::Bo1, None, None, Some(5))
        .unwrap()
        .id;
    for id in &ids {
        app.register_player(tournament, *id).unwrap();
    }
    (app, tournament, ids)
}

fn contested(app: &App, tournament: TournamentId, round: u32) -> Vec<MatchId> {
    app.tournaments[&tournament]
        .round_matches(round)
        .filter(|m| m.team2.is_some())
        .map(|m| m.id)
        .collect()
}

fn sitting(app: &App, tournament: TournamentId, round: u32) -> Vec<PlayerId> {
    app.tournaments[&tournament]
        .round_matches(round)
        .find(|m| m.team1.as_ref().is_some_and(|t| t.name == "Sitting out"))
        .map(|m| m.team1.as_ref().unwrap().players.clone())
        .unwrap_or_default()
}

fn active(app: &App, tournament: TournamentId, round: u32) -> HashSet<PlayerId> {
    app.tournaments[&tournament]
        .round_matches(round)
        .filter(|m| m.team2.is_some())
        .flat_map(|m| m.participants())
        .collect()
}

fn decide_round(app: &mut App, tournament: TournamentId, round: u32) {
    for id in contested(app, tournament, round) {
        force_end_match(app, id, Some(Side::Team1)).unwrap();
    }
}

#[test]
fn teams_come_out_rating_balanced() {
    let (mut app, tournament, ids) = mix(10); // 1000, 1050, .. 1450
    start_tournament(&mut app, tournament).unwrap();

    let t = &app.tournaments[&tournament];
    assert_eq!(t.matches.len(), 1);
    let m = &t.matches[0];
    let side1 = m.team1.as_ref().unwrap().players.clone();
    let side2 = m.team2.as_ref().unwrap().players.clone();
    assert_eq!(side1.len(), 5);
    assert_eq!(side2.len(), 5);

    let everyone: HashSet<PlayerId> = side1.iter().chain(side2.iter()).copied().collect();
    assert_eq!(everyone, ids.iter().copied().collect());

    // Serpentine dealing over 1000..1450 keeps the totals one step apart.
    let total = |side: &[PlayerId]| side.iter().map(|id| app.players[id].current_elo).sum::<i64>();
    assert!((total(&side1) - total(&side2)).abs() <= 50);
}

#[test]
fn shuffle_matches_are_ready_without_a_veto() {
    let (mut app, tournament, _) = mix(10);
    start_tournament(&mut app, tournament).unwrap();

    let m = &app.tournaments[&tournament].matches[0];
    assert_eq!(m.status, MatchStatus::Ready);
    assert!(m.veto.is_none());
    assert_eq!(m.maps.len(), 1); // bo1 takes the first pool map
}

#[test]
fn the_eleventh_player_sits_out_and_rotates_back_in() {
    let (mut app, tournament, _) = mix(11); // 11 = 2 * 5 + 1 sitting
    start_tournament(&mut app, tournament).unwrap();

    let first_sitters = sitting(&app, tournament, 1);
    assert_eq!(first_sitters.len(), 1);
    let benched = first_sitters[0];
    assert_eq!(active(&app, tournament, 1).len(), 10);
    assert!(!active(&app, tournament, 1).contains(&benched));

    decide_round(&mut app, tournament, 1);
    assert_eq!(generate_next_round(&mut app, tournament).unwrap(), 2);

    // Whoever already played sits first; last round's bench is back in.
    let second_sitters = sitting(&app, tournament, 2);
    assert_eq!(second_sitters.len(), 1);
    assert_ne!(second_sitters[0], benched);
    assert!(active(&app, tournament, 2).contains(&benched));
}

#[test]
fn registration_stays_open_between_rounds() {
    let (mut app, tournament, _) = mix(10);
    start_tournament(&mut app, tournament).unwrap();
    decide_round(&mut app, tournament, 1);

    let newcomer = app.create_player(&steam(99), "Latecomer", None, None).unwrap().id;
    app.register_player(tournament, newcomer).unwrap();
    generate_next_round(&mut app, tournament).unwrap();

    // Eleven registered now; the fresh player has played the least and
    // must not be the one benched.
    let sitters = sitting(&app, tournament, 2);
    assert_eq!(sitters.len(), 1);
    assert_ne!(sitters[0], newcomer);
    assert!(active(&app, tournament, 2).contains(&newcomer));
}

#[test]
fn a_short_roster_cannot_start() {
    let (mut app, tournament, _) = mix(9); // teamSize 5 needs 10
    assert!(matches!(
        start_tournament(&mut app, tournament),
        Err(OrchestratorError::NotEnoughPlayers { required: 10, registered: 9 })
    ));
    let t = &app.tournaments[&tournament];
    assert!(t.matches.is_empty());
    assert!(t.started_at.is_none());
    assert_eq!(t.status(), TournamentStatus::Setup);
}
