use tracing::debug;

use crate::cache::ResultCache;
use crate::history::{parse_match_record, sort_chronologically};
use crate::provider::{DataProvider, response_array};
use crate::types::{Confidence, H2HAnalysis, H2HMeetingSummary, H2HRecord, MatchRecord};

const H2H_FETCH_COUNT: u32 = 10;
const H2H_RECENT_WINDOW: usize = 3;
const H2H_SUMMARY_COUNT: usize = 5;
const H2H_TTL_HOURS: u64 = 24;
const RECENT_DOMINANCE_WEIGHT: f64 = 0.6;
const OVERALL_DOMINANCE_WEIGHT: f64 = 0.4;
const DOMINANCE_FACTOR_WEIGHT: f64 = 0.4;
const VENUE_FACTOR_WEIGHT: f64 = 0.4;
const CONSISTENCY_FACTOR_WEIGHT: f64 = 0.2;
const H2H_FACTOR_SCALE: f64 = 1.5;

/// Head-to-head summary for a fixture, cache-first per ordered team pair.
/// Any provider failure degrades to the neutral record.
pub fn get_h2h_statistics(
    provider: &dyn DataProvider,
    cache: &dyn ResultCache,
    home_team_id: u32,
    away_team_id: u32,
) -> H2HRecord {
    let cache_params = [
        ("home_team_id", home_team_id.to_string()),
        ("away_team_id", away_team_id.to_string()),
    ];
    if let Some(value) = cache.get("h2h_stats", &cache_params, Some(H2H_TTL_HOURS))
        && let Ok(record) = serde_json::from_value::<H2HRecord>(value)
    {
        debug!("h2h cache hit for {home_team_id} vs {away_team_id}");
        return record;
    }

    let meetings = fetch_head_to_head(provider, home_team_id, away_team_id, H2H_FETCH_COUNT);
    let record = analyze_head_to_head(&meetings, home_team_id, away_team_id);

    if let Ok(value) = serde_json::to_value(&record) {
        cache.set("h2h_stats", &cache_params, value, None);
    }
    record
}

/// Prior meetings between two teams, most recent first. Empty on any
/// provider failure.
pub fn fetch_head_to_head(
    provider: &dyn DataProvider,
    team_a: u32,
    team_b: u32,
    last: u32,
) -> Vec<MatchRecord> {
    let params = [
        ("h2h", format!("{team_a}-{team_b}")),
        ("last", last.to_string()),
        ("status", "FT".to_string()),
    ];
    let Some(payload) = provider.request("fixtures/headtohead", &params) else {
        return Vec::new();
    };

    let mut meetings: Vec<MatchRecord> = response_array(&payload)
        .iter()
        .filter_map(parse_match_record)
        .collect();
    if sort_chronologically(&mut meetings) {
        meetings.reverse();
    }
    meetings
}

/// Dominance, venue advantage, and consistency from prior meetings, seen
/// from the designated home team's side. `meetings` must be most recent
/// first; any order survives, but the recency weighting assumes it.
pub fn analyze_head_to_head(
    meetings: &[MatchRecord],
    home_team_id: u32,
    away_team_id: u32,
) -> H2HRecord {
    if meetings.is_empty() {
        return H2HRecord::neutral();
    }

    let total = meetings.len();
    let mut home_wins = 0u32;
    let mut away_wins = 0u32;
    let mut draws = 0u32;
    let mut home_goals = 0u32;
    let mut away_goals = 0u32;
    for m in meetings {
        if m.is_win_for(home_team_id) {
            home_wins += 1;
        } else if m.is_win_for(away_team_id) {
            away_wins += 1;
        } else {
            draws += 1;
        }
        home_goals += m.goals_for(home_team_id);
        away_goals += m.goals_for(away_team_id);
    }

    let recent = &meetings[..total.min(H2H_RECENT_WINDOW)];
    let recent_dominance = recent
        .iter()
        .filter(|m| m.is_win_for(home_team_id))
        .count() as f64
        / recent.len() as f64;
    let overall_dominance = f64::from(home_wins) / total as f64;
    let weighted_dominance = recent_dominance * RECENT_DOMINANCE_WEIGHT
        + overall_dominance * OVERALL_DOMINANCE_WEIGHT;

    // Venue advantage only counts meetings the designated home side hosted.
    let hosted: Vec<&MatchRecord> = meetings
        .iter()
        .filter(|m| m.home_team_id == home_team_id)
        .collect();
    let venue_advantage = if hosted.is_empty() {
        1.0
    } else {
        hosted.iter().filter(|m| m.is_win_for(home_team_id)).count() as f64
            / hosted.len() as f64
            * 2.0
    };

    let result_consistency = recent_result_consistency(meetings, home_team_id);

    let h2h_factor = (weighted_dominance * DOMINANCE_FACTOR_WEIGHT
        + venue_advantage * VENUE_FACTOR_WEIGHT
        + result_consistency * CONSISTENCY_FACTOR_WEIGHT)
        * H2H_FACTOR_SCALE;

    let recent_meetings = meetings
        .iter()
        .take(H2H_SUMMARY_COUNT)
        .map(|m| H2HMeetingSummary {
            date: m.date.clone(),
            home_goals: m.goals_for(home_team_id),
            away_goals: m.goals_for(away_team_id),
            hosted_by_home: m.home_team_id == home_team_id,
            goal_difference: i64::from(m.goals_for(home_team_id))
                - i64::from(m.goals_for(away_team_id)),
        })
        .collect();

    H2HRecord {
        h2h_factor,
        home_wins,
        away_wins,
        draws,
        avg_home_goals: f64::from(home_goals) / total as f64,
        avg_away_goals: f64::from(away_goals) / total as f64,
        analysis: H2HAnalysis {
            weighted_dominance,
            recent_dominance,
            overall_dominance,
            venue_advantage,
            result_consistency,
        },
        recent_meetings,
        confidence: if total >= 5 {
            Confidence::High
        } else if total >= 3 {
            Confidence::Medium
        } else {
            Confidence::Low
        },
        matches_analyzed: total,
    }
}

/// Fraction of adjacent outcome agreements across the three most recent
/// meetings; 0.5 when the sample is too small to tell.
fn recent_result_consistency(meetings: &[MatchRecord], home_team_id: u32) -> f64 {
    if meetings.len() < H2H_RECENT_WINDOW {
        return 0.5;
    }
    let outcomes: Vec<bool> = meetings[..H2H_RECENT_WINDOW]
        .iter()
        .map(|m| m.is_win_for(home_team_id))
        .collect();
    let agreements = outcomes
        .windows(2)
        .filter(|pair| pair[0] == pair[1])
        .count();
    agreements as f64 / (outcomes.len() - 1) as f64
}
