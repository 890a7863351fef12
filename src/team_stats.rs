use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::history::season_for;
use crate::provider::{DataProvider, response_object};
use crate::types::{
    CardTotals, CountSplit, FixtureTally, GoalStats, SeasonMetrics, StreakRecord, TeamStatistics,
    VenueSplit,
};

const TEAM_STATS_TTL_HOURS: u64 = 24;

/// Season statistics for one team in one league, cache-first. A provider
/// failure yields the `available: false` stub, never an error; callers
/// substitute neutral defaults.
pub fn get_team_statistics(
    provider: &dyn DataProvider,
    cache: &dyn ResultCache,
    team_id: u32,
    league_id: u32,
) -> TeamStatistics {
    let cache_params = [
        ("team", team_id.to_string()),
        ("league", league_id.to_string()),
    ];
    if let Some(value) = cache.get("team_stats", &cache_params, Some(TEAM_STATS_TTL_HOURS))
        && let Ok(stats) = serde_json::from_value::<TeamStatistics>(value)
    {
        debug!("team stats cache hit for team {team_id}");
        return stats;
    }

    let season = season_for(Utc::now());
    let request_params = [
        ("team", team_id.to_string()),
        ("league", league_id.to_string()),
        ("season", season.to_string()),
    ];
    let payload = provider.request("teams/statistics", &request_params);
    let stats = match payload.as_ref().and_then(response_object) {
        Some(response) => normalize_team_statistics(response, team_id, league_id, season),
        None => {
            warn!("no usable statistics for team {team_id} in league {league_id}");
            return TeamStatistics::unavailable(team_id, league_id, season);
        }
    };

    if let Ok(value) = serde_json::to_value(&stats) {
        cache.set("team_stats", &cache_params, value, None);
    }
    stats
}

/// One normalization point for the provider's deeply nested statistics
/// payload. Any missing leaf reads as zero; per-game metrics stay undefined
/// until at least one fixture was played.
pub fn normalize_team_statistics(
    response: &Value,
    team_id: u32,
    league_id: u32,
    season: i32,
) -> TeamStatistics {
    let fixtures = response.get("fixtures");
    let tally = FixtureTally {
        played: nested_u32(fixtures, &["played", "total"]),
        wins: nested_u32(fixtures, &["wins", "total"]),
        draws: nested_u32(fixtures, &["draws", "total"]),
        losses: nested_u32(fixtures, &["loses", "total"]),
    };

    let goals = response.get("goals");
    let goals_for = goal_stats(goals.and_then(|g| g.get("for")));
    let goals_against = goal_stats(goals.and_then(|g| g.get("against")));

    let home = venue_split(response, "home");
    let away = venue_split(response, "away");

    // The provider has used both spellings of this key over time.
    let clean_sheet = response
        .get("clean_sheet")
        .or_else(|| response.get("clean_sheets"));
    let clean_sheets = count_split(clean_sheet);
    let failed_to_score = count_split(response.get("failed_to_score"));

    let cards = response.get("cards");
    let card_totals = CardTotals {
        yellow: minute_total(cards.and_then(|c| c.get("yellow"))),
        red: minute_total(cards.and_then(|c| c.get("red"))),
    };

    let streak = response.get("biggest").and_then(|b| b.get("streak"));
    let streaks = StreakRecord {
        wins: nested_u32(streak, &["wins"]),
        draws: nested_u32(streak, &["draws"]),
        losses: nested_u32(streak, &["loses"]),
    };

    let form = response
        .get("form")
        .and_then(|f| f.as_str())
        .unwrap_or_default()
        .to_string();

    let metrics = derive_metrics(&tally, &goals_for, &goals_against, &home, &away, &clean_sheets, &failed_to_score);

    TeamStatistics {
        available: true,
        team_id,
        league_id,
        season,
        fixtures: tally,
        goals_for,
        goals_against,
        home,
        away,
        clean_sheets,
        failed_to_score,
        cards: card_totals,
        form,
        streaks,
        position: None,
        points: None,
        metrics,
    }
}

fn derive_metrics(
    fixtures: &FixtureTally,
    goals_for: &GoalStats,
    goals_against: &GoalStats,
    home: &VenueSplit,
    away: &VenueSplit,
    clean_sheets: &CountSplit,
    failed_to_score: &CountSplit,
) -> Option<SeasonMetrics> {
    if fixtures.played == 0 {
        return None;
    }
    let played = f64::from(fixtures.played);
    let clean_sheet_percentage = f64::from(clean_sheets.total) / played * 100.0;
    Some(SeasonMetrics {
        points_per_game: f64::from(fixtures.wins * 3 + fixtures.draws) / played,
        goals_per_game: f64::from(goals_for.total) / played,
        goals_against_per_game: f64::from(goals_against.total) / played,
        clean_sheet_percentage,
        scoring_consistency: (1.0 - f64::from(failed_to_score.total) / played) * 100.0,
        home_win_percentage: win_percentage(home.wins, home.played),
        away_win_percentage: win_percentage(away.wins, away.played),
        defensive_stability: clean_sheet_percentage,
    })
}

fn win_percentage(wins: u32, played: u32) -> f64 {
    if played == 0 {
        0.0
    } else {
        f64::from(wins) / f64::from(played) * 100.0
    }
}

fn goal_stats(section: Option<&Value>) -> GoalStats {
    let total = nested_u32(section, &["total", "total"]);
    let per_game = section
        .and_then(|s| s.get("average"))
        .and_then(|a| a.get("total"))
        .and_then(num_f64)
        .unwrap_or(0.0);
    let mut by_minute = BTreeMap::new();
    if let Some(minutes) = section.and_then(|s| s.get("minute")).and_then(|m| m.as_object()) {
        for (period, entry) in minutes {
            let count = entry.get("total").and_then(num_u32).unwrap_or(0);
            by_minute.insert(period.clone(), count);
        }
    }
    GoalStats {
        total,
        per_game,
        by_minute,
    }
}

fn venue_split(response: &Value, venue: &str) -> VenueSplit {
    let fixtures = response.get("fixtures");
    let goals = response.get("goals");
    VenueSplit {
        played: nested_u32(fixtures, &["played", venue]),
        wins: nested_u32(fixtures, &["wins", venue]),
        draws: nested_u32(fixtures, &["draws", venue]),
        losses: nested_u32(fixtures, &["loses", venue]),
        goals_for: nested_u32(goals, &["for", "total", venue]),
        goals_against: nested_u32(goals, &["against", "total", venue]),
    }
}

fn count_split(section: Option<&Value>) -> CountSplit {
    CountSplit {
        total: nested_u32(section, &["total"]),
        home: nested_u32(section, &["home"]),
        away: nested_u32(section, &["away"]),
    }
}

fn minute_total(section: Option<&Value>) -> u32 {
    let Some(map) = section.and_then(|s| s.as_object()) else {
        return 0;
    };
    map.values()
        .filter_map(|entry| entry.get("total").and_then(num_u32))
        .sum()
}

fn nested_u32(root: Option<&Value>, path: &[&str]) -> u32 {
    let mut cursor = root;
    for key in path {
        cursor = cursor.and_then(|v| v.get(key));
    }
    cursor.and_then(num_u32).unwrap_or(0)
}

// The provider serializes some numbers as strings ("1.5"), so accept both.
fn num_f64(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<f64>().ok()
}

fn num_u32(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    v.as_str()?.trim().parse::<u32>().ok()
}
