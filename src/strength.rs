use crate::types::{
    Confidence, DEFAULT_GOALS_PER_GAME, FormRecord, StrengthIndex, TeamStatistics,
};

const SCORING_RATE_BASELINE: f64 = 1.5;
const DEFENSE_CONCEDED_FLOOR: f64 = 0.5;
const COMPONENT_CAP: f64 = 2.0;

const PRIMARY_WEIGHT: f64 = 0.5;
const SECONDARY_WEIGHT: f64 = 0.3;
const TERTIARY_WEIGHT: f64 = 0.2;

const FORM_POINTS_WEIGHT: f64 = 0.4;
const FORM_DEFENSE_WEIGHT: f64 = 0.3;
const FORM_ATTACK_WEIGHT: f64 = 0.3;

const SEASON_BLEND_WEIGHT: f64 = 0.6;
const FORM_BLEND_WEIGHT: f64 = 0.4;
const STRENGTH_BASE: f64 = 0.5;

const FORM_WINDOW: f64 = 8.0;

const HIGH_CONFIDENCE_GAMES: u32 = 10;
const MEDIUM_CONFIDENCE_GAMES: u32 = 5;

/// Attack/defense/overall strength on a roughly 0.5-2.0 scale centered at
/// 1.0, blending season metrics (60%) with recent form (40%). Anything less
/// than a played season collapses to the neutral index.
pub fn compute_strength(stats: Option<&TeamStatistics>, form: &FormRecord) -> StrengthIndex {
    let Some(stats) = stats.filter(|s| s.available) else {
        return StrengthIndex::neutral();
    };
    let Some(metrics) = stats.metrics.as_ref() else {
        return StrengthIndex::neutral();
    };

    let scoring_rate = (metrics.goals_per_game / SCORING_RATE_BASELINE).min(COMPONENT_CAP);
    let scoring_consistency = metrics.scoring_consistency / 100.0;
    let venue_balance =
        (metrics.home_win_percentage / 100.0 + metrics.away_win_percentage / 100.0) / 2.0;
    let attack_score = scoring_rate * PRIMARY_WEIGHT
        + scoring_consistency * SECONDARY_WEIGHT
        + venue_balance * TERTIARY_WEIGHT;

    let defensive_solidity = (DEFAULT_GOALS_PER_GAME
        / metrics.goals_against_per_game.max(DEFENSE_CONCEDED_FLOOR))
    .min(COMPONENT_CAP);
    let clean_sheet_ratio = metrics.clean_sheet_percentage / 100.0;
    let stability = metrics.defensive_stability / 100.0;
    let defense_score = defensive_solidity * PRIMARY_WEIGHT
        + clean_sheet_ratio * SECONDARY_WEIGHT
        + stability * TERTIARY_WEIGHT;

    let form_score = form_score(form);

    let attack_strength =
        STRENGTH_BASE + attack_score * SEASON_BLEND_WEIGHT + form_score * FORM_BLEND_WEIGHT;
    let defense_strength =
        STRENGTH_BASE + defense_score * SEASON_BLEND_WEIGHT + form_score * FORM_BLEND_WEIGHT;

    StrengthIndex {
        attack_strength,
        defense_strength,
        overall_strength: (attack_strength + defense_strength) / 2.0,
        attack_score,
        defense_score,
        form_score,
        confidence: confidence_for(stats.fixtures.played),
    }
}

fn form_score(form: &FormRecord) -> f64 {
    let recent_points = if form.matches_analyzed > 0 {
        f64::from(form.results.points) / (form.matches_analyzed as f64 * 3.0)
    } else {
        0.5
    };
    // Clean sheet and scoring rates stay on the full eight-match window so
    // short samples read as weak signals, not strong ones.
    let recent_defense = f64::from(form.results.clean_sheets) / FORM_WINDOW;
    let recent_attack = 1.0 - f64::from(form.results.failed_to_score) / FORM_WINDOW;
    recent_points * FORM_POINTS_WEIGHT
        + recent_defense * FORM_DEFENSE_WEIGHT
        + recent_attack * FORM_ATTACK_WEIGHT
}

fn confidence_for(games_played: u32) -> Confidence {
    if games_played >= HIGH_CONFIDENCE_GAMES {
        Confidence::High
    } else if games_played >= MEDIUM_CONFIDENCE_GAMES {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
