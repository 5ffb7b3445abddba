use std::fs;
use std::path::PathBuf;

use matchsight::fixtures_fetch::parse_fixtures_json;
use matchsight::team_stats_fetch::parse_team_stats_json;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_fixtures_fixture() {
    let raw = read_fixture("apifootball_fixtures.json");
    let rows = parse_fixtures_json(&raw).expect("fixture should parse");

    // The third entry has no away team and is skipped.
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].id, 1035045);
    assert_eq!(rows[0].home, "Arsenal");
    assert_eq!(rows[0].away, "Nottingham Forest");
    assert_eq!(rows[0].home_id, 42);
    assert_eq!(rows[0].away_id, 65);
    assert_eq!(rows[0].league_name, "Premier League");
    assert_eq!(rows[0].round, "Regular Season - 1");
    assert_eq!(rows[0].kickoff_label, "12/08 16:30");
    assert_eq!(rows[0].label(), "12/08 16:30 | Arsenal vs Nottingham Forest");

    assert_eq!(rows[1].id, 1035046);
    assert_eq!(rows[1].kickoff_label, "13/08 13:00");
}

#[test]
fn parses_team_stats_fixture() {
    let raw = read_fixture("apifootball_team_stats.json");
    let stats = parse_team_stats_json(&raw).expect("fixture should parse");

    assert_eq!(stats.shots_total, 623.0);
    assert_eq!(stats.shots_on_target, 231.0);
    assert_eq!(stats.fouls, 389.0);
    assert_eq!(stats.corners, 245.0);
}

#[test]
fn fixtures_error_payload_is_not_fatal() {
    // API-Football reports key problems inside a 200 body.
    let raw = r#"{"get":"fixtures","errors":{"token":"Error/Missing application key"},"response":[]}"#;
    let rows = parse_fixtures_json(raw).expect("empty response still parses");
    assert!(rows.is_empty());
}
