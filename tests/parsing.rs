use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use matchcast::cache::MemoryCache;
use matchcast::history::{fetch_team_history, parse_match_record};
use matchcast::provider::{DataProvider, response_array};
use matchcast::standings::parse_standings;
use matchcast::team_stats::normalize_team_statistics;
use matchcast::types::DataQuality;

fn read_fixture(name: &str) -> Value {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    let raw = fs::read_to_string(path).expect("fixture file should be readable");
    serde_json::from_str(&raw).expect("fixture should be valid json")
}

/// Serves the recorded fixtures payload for every fixtures request, as a
/// provider stand-in for normalization tests.
struct RecordedProvider;

impl DataProvider for RecordedProvider {
    fn request(&self, endpoint: &str, _params: &[(&str, String)]) -> Option<Value> {
        match endpoint {
            "fixtures" => Some(read_fixture("fixtures_response.json")),
            _ => None,
        }
    }
}

#[test]
fn parses_recorded_fixture_rows() {
    let payload = read_fixture("fixtures_response.json");
    let rows = response_array(&payload);
    assert_eq!(rows.len(), 4);

    let first = parse_match_record(&rows[0]).expect("complete row parses");
    assert_eq!(first.home_team_id, 50);
    assert_eq!(first.away_team_id, 42);
    assert_eq!(first.home_goals, 3);
    assert_eq!(first.away_goals, 1);
    assert_eq!(first.league_id, 39);
    assert_eq!(first.season, 2024);
    assert_eq!(first.venue.as_deref(), Some("Etihad Stadium"));

    // The unfinished row has null goals and must be dropped.
    assert!(parse_match_record(&rows[3]).is_none());
}

#[test]
fn aggregates_history_from_recorded_payload() {
    let cache = MemoryCache::new();
    let history = fetch_team_history(&RecordedProvider, &cache, 50, 39, None);

    // Two seasons, three good rows each; the malformed row is dropped and
    // reported once per season.
    assert_eq!(history.current_league.len(), 6);
    assert!(history.other_leagues.is_empty());
    assert_eq!(
        history
            .metadata
            .errors
            .iter()
            .filter(|e| e.contains("malformed"))
            .count(),
        2
    );
    assert_eq!(history.metadata.data_quality, DataQuality::Low);
    assert!(
        history
            .metadata
            .quality_note
            .as_deref()
            .is_some_and(|note| note.contains("errors occurred"))
    );

    // Ascending by date.
    assert!(history.current_league[0].date.starts_with("2025-01-04"));
    assert!(history.current_league[5].date.starts_with("2025-03-08"));
    assert_eq!(history.metadata.leagues_played, vec![39]);
}

#[test]
fn history_result_is_cached() {
    let cache = MemoryCache::new();
    let first = fetch_team_history(&RecordedProvider, &cache, 50, 39, None);

    // An unreachable provider on the second call still yields the cached
    // aggregate.
    struct DeadProvider;
    impl DataProvider for DeadProvider {
        fn request(&self, _endpoint: &str, _params: &[(&str, String)]) -> Option<Value> {
            None
        }
    }
    let second = fetch_team_history(&DeadProvider, &cache, 50, 39, None);
    assert_eq!(second.current_league.len(), first.current_league.len());
    assert_eq!(second.metadata.data_quality, first.metadata.data_quality);
}

#[test]
fn normalizes_recorded_team_statistics() {
    let payload = read_fixture("team_statistics.json");
    let response = payload.get("response").expect("payload has response");
    let stats = normalize_team_statistics(response, 50, 39, 2024);

    assert!(stats.available);
    assert_eq!(stats.fixtures.played, 28);
    assert_eq!(stats.fixtures.wins, 17);
    assert_eq!(stats.goals_for.total, 58);
    assert_eq!(stats.goals_against.total, 29);
    assert_eq!(stats.home.played, 14);
    assert_eq!(stats.home.goals_for, 34);
    assert_eq!(stats.clean_sheets.total, 11);
    assert_eq!(stats.failed_to_score.total, 4);
    assert_eq!(stats.cards.yellow, 45);
    assert_eq!(stats.cards.red, 2);
    assert_eq!(stats.streaks.wins, 6);
    assert_eq!(stats.form, "WWDLWWWD");
    assert_eq!(stats.goals_for.by_minute.get("76-90"), Some(&13));

    let metrics = stats.metrics.expect("28 games played derives metrics");
    assert!((metrics.points_per_game - 57.0 / 28.0).abs() < 1e-9);
    assert!((metrics.goals_per_game - 58.0 / 28.0).abs() < 1e-9);
    assert!((metrics.clean_sheet_percentage - 11.0 / 28.0 * 100.0).abs() < 1e-9);
    assert!((metrics.home_win_percentage - 10.0 / 14.0 * 100.0).abs() < 1e-9);
}

#[test]
fn parses_recorded_standings() {
    let payload = read_fixture("standings.json");
    let table = parse_standings(&payload);
    assert_eq!(table.len(), 5);
    assert_eq!(table[&40].rank, 1);
    assert_eq!(table[&50].points, 58);
    assert_eq!(table[&57].rank, 18);
}
