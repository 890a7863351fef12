use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::provider::{DataProvider, response_array};
use crate::types::{DataQuality, MatchRecord};

const LOW_QUALITY_MATCHES: usize = 5;
const MEDIUM_QUALITY_MATCHES: usize = 10;
const HIGH_QUALITY_MATCHES: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMetadata {
    pub seasons_analyzed: Vec<i32>,
    pub total_matches: usize,
    pub leagues_played: Vec<u32>,
    pub data_quality: DataQuality,
    pub quality_note: Option<String>,
    pub errors: Vec<String>,
}

/// A team's completed matches split between the league under analysis and
/// everything else it played in the requested seasons, both chronologically
/// ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamHistory {
    pub current_league: Vec<MatchRecord>,
    pub other_leagues: Vec<MatchRecord>,
    pub metadata: HistoryMetadata,
}

impl TeamHistory {
    pub fn empty(seasons: Vec<i32>) -> Self {
        Self {
            current_league: Vec::new(),
            other_leagues: Vec::new(),
            metadata: HistoryMetadata {
                seasons_analyzed: seasons,
                total_matches: 0,
                leagues_played: Vec::new(),
                data_quality: DataQuality::Low,
                quality_note: Some("Very limited data in current league".to_string()),
                errors: Vec::new(),
            },
        }
    }
}

/// Football seasons straddle calendar years: after June the season is the
/// current year, before that it is still last year's.
pub fn season_for(now: DateTime<Utc>) -> i32 {
    if now.month() > 6 {
        now.year()
    } else {
        now.year() - 1
    }
}

pub fn default_seasons() -> Vec<i32> {
    let current = season_for(Utc::now());
    vec![current, current - 1]
}

pub fn fetch_team_history(
    provider: &dyn DataProvider,
    cache: &dyn ResultCache,
    team_id: u32,
    league_id: u32,
    seasons: Option<Vec<i32>>,
) -> TeamHistory {
    let seasons = seasons.unwrap_or_else(default_seasons);
    let season_key = seasons
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let cache_params = [
        ("team", team_id.to_string()),
        ("league", league_id.to_string()),
        ("seasons", season_key),
    ];
    if let Some(value) = cache.get("fixtures", &cache_params, None)
        && let Ok(history) = serde_json::from_value::<TeamHistory>(value)
    {
        debug!("history cache hit for team {team_id}");
        return history;
    }

    let mut history = aggregate_history(provider, team_id, league_id, &seasons);

    assess_data_quality(&mut history.metadata, history.current_league.len());
    if let Ok(value) = serde_json::to_value(&history) {
        cache.set("fixtures", &cache_params, value, None);
    }
    history
}

fn aggregate_history(
    provider: &dyn DataProvider,
    team_id: u32,
    league_id: u32,
    seasons: &[i32],
) -> TeamHistory {
    let mut current_league = Vec::new();
    let mut other_leagues = Vec::new();
    let mut leagues_played = BTreeSet::new();
    let mut errors = Vec::new();

    for season in seasons {
        let league_params = [
            ("team", team_id.to_string()),
            ("league", league_id.to_string()),
            ("season", season.to_string()),
            ("status", "FT".to_string()),
        ];
        match provider.request("fixtures", &league_params) {
            Some(payload) => {
                for item in response_array(&payload) {
                    match parse_match_record(item) {
                        Some(record) => {
                            leagues_played.insert(record.league_id);
                            current_league.push(record);
                        }
                        None => {
                            warn!("dropped malformed fixture for team {team_id}");
                            errors.push(format!("malformed fixture in season {season}"));
                        }
                    }
                }
            }
            None => errors.push(format!("no league response for season {season}")),
        }

        // Second pass without the league filter catches cup ties and games
        // played after a league change.
        let season_params = [
            ("team", team_id.to_string()),
            ("season", season.to_string()),
            ("status", "FT".to_string()),
        ];
        match provider.request("fixtures", &season_params) {
            Some(payload) => {
                for item in response_array(&payload) {
                    let Some(record) = parse_match_record(item) else {
                        continue;
                    };
                    if record.league_id != league_id {
                        leagues_played.insert(record.league_id);
                        other_leagues.push(record);
                    }
                }
            }
            None => errors.push(format!("no season response for season {season}")),
        }
    }

    if !sort_chronologically(&mut current_league) || !sort_chronologically(&mut other_leagues) {
        errors.push("date sort skipped for unparseable dates".to_string());
    }

    let total_matches = current_league.len() + other_leagues.len();
    TeamHistory {
        current_league,
        other_leagues,
        metadata: HistoryMetadata {
            seasons_analyzed: seasons.to_vec(),
            total_matches,
            leagues_played: leagues_played.into_iter().collect(),
            data_quality: DataQuality::High,
            quality_note: None,
            errors,
        },
    }
}

/// One normalization point for raw fixture payloads. Records missing the
/// fields the engine relies on are dropped, never patched up.
pub fn parse_match_record(v: &Value) -> Option<MatchRecord> {
    let fixture = v.get("fixture")?;
    let date = fixture.get("date")?.as_str()?.to_string();
    let teams = v.get("teams")?;
    let home_team_id = teams.get("home")?.get("id")?.as_u64()? as u32;
    let away_team_id = teams.get("away")?.get("id")?.as_u64()? as u32;
    let goals = v.get("goals")?;
    let home_goals = goals.get("home")?.as_u64()? as u32;
    let away_goals = goals.get("away")?.as_u64()? as u32;
    let league = v.get("league")?;
    let league_id = league.get("id")?.as_u64()? as u32;
    let season = league.get("season").and_then(|s| s.as_i64()).unwrap_or(0) as i32;
    let venue = fixture
        .get("venue")
        .and_then(|ven| ven.get("name"))
        .and_then(|n| n.as_str())
        .map(|s| s.to_string());

    Some(MatchRecord {
        date,
        home_team_id,
        away_team_id,
        home_goals,
        away_goals,
        league_id,
        season,
        venue,
    })
}

/// Ascending date sort. Returns false and leaves provider order in place
/// when any date fails to parse.
pub fn sort_chronologically(records: &mut [MatchRecord]) -> bool {
    let mut keyed = Vec::with_capacity(records.len());
    for record in records.iter() {
        match record.parsed_date() {
            Some(date) => keyed.push(date),
            None => return false,
        }
    }
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|&i| keyed[i]);
    let reordered: Vec<MatchRecord> = order.iter().map(|&i| records[i].clone()).collect();
    records.clone_from_slice(&reordered);
    true
}

fn assess_data_quality(metadata: &mut HistoryMetadata, in_league: usize) {
    if in_league < LOW_QUALITY_MATCHES {
        metadata.data_quality = DataQuality::Low;
        metadata.quality_note = Some("Very limited data in current league".to_string());
    } else if in_league < MEDIUM_QUALITY_MATCHES {
        metadata.data_quality = DataQuality::Low;
        metadata.quality_note = Some("Limited data in current league".to_string());
    } else if in_league < HIGH_QUALITY_MATCHES {
        metadata.data_quality = DataQuality::Medium;
        metadata.quality_note = Some("Moderate data in current league".to_string());
    } else {
        metadata.data_quality = DataQuality::High;
        metadata.quality_note = None;
    }
    if !metadata.errors.is_empty() {
        let note = metadata.quality_note.take().unwrap_or_default();
        let suffix = "Some data retrieval errors occurred";
        metadata.quality_note = Some(if note.is_empty() {
            suffix.to_string()
        } else {
            format!("{note}; {suffix}")
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(date: &str) -> MatchRecord {
        MatchRecord {
            date: date.to_string(),
            home_team_id: 1,
            away_team_id: 2,
            home_goals: 1,
            away_goals: 0,
            league_id: 39,
            season: 2024,
            venue: None,
        }
    }

    #[test]
    fn season_boundary_is_july() {
        let june = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
        let july = Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap();
        assert_eq!(season_for(june), 2024);
        assert_eq!(season_for(july), 2025);
    }

    #[test]
    fn sorts_ascending_when_dates_parse() {
        let mut records = vec![
            record("2025-03-01T15:00:00+00:00"),
            record("2025-01-01T15:00:00+00:00"),
            record("2025-02-01T15:00:00+00:00"),
        ];
        assert!(sort_chronologically(&mut records));
        assert_eq!(records[0].date, "2025-01-01T15:00:00+00:00");
        assert_eq!(records[2].date, "2025-03-01T15:00:00+00:00");
    }

    #[test]
    fn falls_back_to_provider_order_on_bad_date() {
        let mut records = vec![
            record("2025-03-01T15:00:00+00:00"),
            record("not a date"),
            record("2025-01-01T15:00:00+00:00"),
        ];
        assert!(!sort_chronologically(&mut records));
        assert_eq!(records[0].date, "2025-03-01T15:00:00+00:00");
        assert_eq!(records[1].date, "not a date");
    }

    #[test]
    fn quality_labels_follow_in_league_count() {
        let mut meta = HistoryMetadata {
            seasons_analyzed: vec![2024],
            total_matches: 0,
            leagues_played: Vec::new(),
            data_quality: DataQuality::High,
            quality_note: None,
            errors: Vec::new(),
        };
        assess_data_quality(&mut meta, 3);
        assert_eq!(meta.data_quality, DataQuality::Low);
        assert_eq!(
            meta.quality_note.as_deref(),
            Some("Very limited data in current league")
        );

        assess_data_quality(&mut meta, 7);
        assert_eq!(meta.data_quality, DataQuality::Low);
        assert_eq!(
            meta.quality_note.as_deref(),
            Some("Limited data in current league")
        );

        assess_data_quality(&mut meta, 15);
        assert_eq!(meta.data_quality, DataQuality::Medium);

        assess_data_quality(&mut meta, 25);
        assert_eq!(meta.data_quality, DataQuality::High);
        assert!(meta.quality_note.is_none());

        meta.errors.push("boom".to_string());
        assess_data_quality(&mut meta, 25);
        assert_eq!(
            meta.quality_note.as_deref(),
            Some("Some data retrieval errors occurred")
        );
    }

    #[test]
    fn parse_match_record_drops_missing_goals() {
        let v = serde_json::json!({
            "fixture": {"date": "2025-01-01T15:00:00+00:00"},
            "teams": {"home": {"id": 50}, "away": {"id": 51}},
            "goals": {"home": null, "away": 1},
            "league": {"id": 39, "season": 2024}
        });
        assert!(parse_match_record(&v).is_none());
    }
}
