//! Integration tests for elimination brackets: generation, seeding,
//! result propagation, and walkover resolution.

use matchzy_tournament_web::logic::{
    generate_double_elimination, generate_single_elimination, propagate_result, resolve_walkovers,
};
use matchzy_tournament_web::models::{active_duty_maps, MatchTeam, SeriesFormat};
use matchzy_tournament_web::{MatchStatus, OrchestratorError, Side, Tournament, TournamentType};
use uuid::Uuid;

fn entry(name: &str) -> MatchTeam {
    MatchTeam {
        team_id: Some(Uuid::new_v4()),
        name: name.to_string(),
        players: vec![Uuid::new_v4()],
    }
}

fn entries(names: &[&str]) -> Vec<MatchTeam> {
    names.iter().map(|n| entry(n)).collect()
}

fn bracket(kind: TournamentType) -> Tournament {
    Tournament::new("Major", kind, SeriesFormat::Bo1, Uuid::new_v4(), active_duty_maps())
}

fn complete(t: &mut Tournament, number: u32, winner: Side) {
    let m = t.match_by_number_mut(number).unwrap();
    m.winner = Some(winner);
    m.status = MatchStatus::Completed;
    propagate_result(t, number);
}

fn side_name(t: &Tournament, number: u32, side: Side) -> String {
    t.match_by_number(number)
        .unwrap()
        .side(side)
        .unwrap()
        .name
        .clone()
}

#[test]
fn four_team_field_builds_three_matches() {
    let mut t = bracket(TournamentType::SingleElimination);
    generate_single_elimination(&mut t, entries(&["A", "B", "C", "D"])).unwrap();

    assert_eq!(t.matches.len(), 3); // 2 in round 1 + the final
    assert_eq!(t.total_rounds, Some(2));
    assert_eq!(t.match_by_number(1).unwrap().round, 1);
    assert_eq!(t.match_by_number(2).unwrap().round, 1);
    assert_eq!(t.match_by_number(3).unwrap().round, 2);

    // Both round-1 winners feed the final, one per slot.
    assert_eq!(t.match_by_number(1).unwrap().winner_goes_to, Some((3, Side::Team1)));
    assert_eq!(t.match_by_number(2).unwrap().winner_goes_to, Some((3, Side::Team2)));

    let final_match = t.match_by_number(3).unwrap();
    assert!(final_match.team1.is_none());
    assert!(final_match.team2.is_none());
    assert_eq!(final_match.status, MatchStatus::Pending);
}

#[test]
fn seeding_keeps_top_seeds_apart() {
    let mut t = bracket(TournamentType::SingleElimination);
    generate_single_elimination(&mut t, entries(&["A", "B", "C", "D"])).unwrap();

    // Seed 1 draws seed 4, seed 2 draws seed 3; A and B can only meet in the final.
    assert_eq!(side_name(&t, 1, Side::Team1), "A");
    assert_eq!(side_name(&t, 1, Side::Team2), "D");
    assert_eq!(side_name(&t, 2, Side::Team1), "B");
    assert_eq!(side_name(&t, 2, Side::Team2), "C");
}

#[test]
fn winners_advance_along_the_links() {
    let mut t = bracket(TournamentType::SingleElimination);
    generate_single_elimination(&mut t, entries(&["A", "B", "C", "D"])).unwrap();

    complete(&mut t, 1, Side::Team1); // A over D
    complete(&mut t, 2, Side::Team2); // C over B

    assert_eq!(side_name(&t, 3, Side::Team1), "A");
    assert_eq!(side_name(&t, 3, Side::Team2), "C");
}

#[test]
fn three_team_field_gives_the_top_seed_a_walkover() {
    let mut t = bracket(TournamentType::SingleElimination);
    generate_single_elimination(&mut t, entries(&["A", "B", "C"])).unwrap();

    // Seed 4 does not exist, so A's opener resolves immediately.
    let opener = t.match_by_number(1).unwrap();
    assert!(opener.walkover);
    assert_eq!(opener.status, MatchStatus::Completed);
    assert_eq!(opener.winner, Some(Side::Team1));

    // A is already waiting in the final; B vs C still has to be played.
    assert_eq!(side_name(&t, 3, Side::Team1), "A");
    assert!(t.match_by_number(3).unwrap().team2.is_none());
    assert_eq!(t.match_by_number(2).unwrap().status, MatchStatus::Pending);
}

#[test]
fn one_team_is_rejected() {
    let mut t = bracket(TournamentType::SingleElimination);
    assert!(matches!(
        generate_single_elimination(&mut t, entries(&["A"])),
        Err(OrchestratorError::NotEnoughTeams { required: 2 })
    ));
    assert!(t.matches.is_empty());
}

#[test]
fn dead_slots_collapse_through_the_bracket() {
    let mut t = bracket(TournamentType::SingleElimination);
    generate_single_elimination(&mut t, entries(&["A", "B", "C", "D"])).unwrap();
    complete(&mut t, 1, Side::Team1); // A reaches the final

    // Declare match 2 dead on both sides, as if both feeds vanished.
    {
        let m = t.match_by_number_mut(2).unwrap();
        m.team1 = None;
        m.team2 = None;
        m.team1_bye = true;
        m.team2_bye = true;
    }
    resolve_walkovers(&mut t);

    // The dead match produced no winner, so the final collapses to A.
    assert_eq!(t.match_by_number(2).unwrap().winner, None);
    let final_match = t.match_by_number(3).unwrap();
    assert!(final_match.walkover);
    assert_eq!(final_match.status, MatchStatus::Completed);
    assert_eq!(final_match.winner, Some(Side::Team1));
    assert_eq!(side_name(&t, 3, Side::Team1), "A");
}

#[test]
fn double_elimination_four_teams_wires_both_brackets() {
    let mut t = bracket(TournamentType::DoubleElimination);
    generate_double_elimination(&mut t, entries(&["A", "B", "C", "D"])).unwrap();

    // 2 winners round 1 + winners final + 2 losers rounds + grand final.
    assert_eq!(t.matches.len(), 6);
    assert_eq!(t.total_rounds, Some(4));
    assert_eq!(t.match_by_number(4).unwrap().round, 2);
    assert_eq!(t.match_by_number(5).unwrap().round, 3);
    assert_eq!(t.match_by_number(6).unwrap().round, 4);

    // Round-1 losers drop into the losers bracket opener.
    assert_eq!(t.match_by_number(1).unwrap().loser_goes_to, Some((4, Side::Team1)));
    assert_eq!(t.match_by_number(2).unwrap().loser_goes_to, Some((4, Side::Team2)));
    // Winners final: champion to the grand final, loser to the losers final.
    assert_eq!(t.match_by_number(3).unwrap().winner_goes_to, Some((6, Side::Team1)));
    assert_eq!(t.match_by_number(3).unwrap().loser_goes_to, Some((5, Side::Team2)));
    // Losers route ends opposite the winners champion.
    assert_eq!(t.match_by_number(4).unwrap().winner_goes_to, Some((5, Side::Team1)));
    assert_eq!(t.match_by_number(5).unwrap().winner_goes_to, Some((6, Side::Team2)));
}

#[test]
fn double_elimination_playthrough_reaches_the_grand_final() {
    let mut t = bracket(TournamentType::DoubleElimination);
    generate_double_elimination(&mut t, entries(&["A", "B", "C", "D"])).unwrap();

    complete(&mut t, 1, Side::Team1); // A over D
    complete(&mut t, 2, Side::Team1); // B over C
    complete(&mut t, 3, Side::Team1); // winners final: A over B
    complete(&mut t, 4, Side::Team2); // losers opener: C over D
    complete(&mut t, 5, Side::Team1); // losers final: C over B

    assert_eq!(side_name(&t, 6, Side::Team1), "A");
    assert_eq!(side_name(&t, 6, Side::Team2), "C");

    complete(&mut t, 6, Side::Team2);
    assert!(t.matches.iter().all(|m| m.status == MatchStatus::Completed));
}

#[test]
fn double_elimination_two_teams_meet_twice_at_most() {
    let mut t = bracket(TournamentType::DoubleElimination);
    generate_double_elimination(&mut t, entries(&["A", "B"])).unwrap();

    assert_eq!(t.matches.len(), 2);
    assert_eq!(t.total_rounds, Some(2));
    assert_eq!(t.match_by_number(1).unwrap().winner_goes_to, Some((2, Side::Team1)));
    assert_eq!(t.match_by_number(1).unwrap().loser_goes_to, Some((2, Side::Team2)));

    complete(&mut t, 1, Side::Team2); // B sends A to the lower side
    assert_eq!(side_name(&t, 2, Side::Team1), "B");
    assert_eq!(side_name(&t, 2, Side::Team2), "A");
}
