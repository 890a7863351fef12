use crate::types::{Confidence, FormAverages, FormRecord, FormResults, MatchRecord, Trend};

/// Most recent match takes the first (highest) weight; the decay is kept
/// mild so one bad week does not erase a good month.
pub const FORM_WEIGHT_DECAY: [f64; 8] = [1.3, 1.25, 1.2, 1.15, 1.1, 1.05, 1.0, 0.95];

const FORM_WINDOW: usize = 8;
const WIN_BASE_SCORE: f64 = 75.0;
const DRAW_SCORE: f64 = 60.0;
const LOSS_BASE_SCORE: f64 = 40.0;
const GOAL_DIFF_SCORE_STEP: f64 = 3.0;
const WIN_BONUS_CAP: f64 = 15.0;
const LOSS_PENALTY_CAP: f64 = -30.0;
const CLEAN_SHEET_BONUS: f64 = 5.0;
const MOMENTUM_WINDOW: usize = 3;
const POINTS_TREND_STEP: f64 = 3.0;
const GOALS_TREND_STEP: f64 = 2.0;

/// Short-window form over the last eight matches of a chronologically
/// ascending slice. Empty input yields the neutral record.
pub fn analyze_form(matches: &[MatchRecord], team_id: u32) -> FormRecord {
    if matches.is_empty() {
        return FormRecord::neutral();
    }

    let window = &matches[matches.len().saturating_sub(FORM_WINDOW)..];
    let n = window.len();

    let mut results = FormResults::default();
    let mut weighted_points = 0.0;
    let mut weighted_goals_for = 0.0;
    let mut weighted_goals_against = 0.0;
    let mut total_weight = 0.0;
    let mut performances = Vec::with_capacity(n);

    for (i, m) in window.iter().enumerate() {
        // Window is oldest-first, weights are newest-first.
        let weight = FORM_WEIGHT_DECAY[n - 1 - i];
        let goals_for = m.goals_for(team_id);
        let goals_against = m.goals_against(team_id);
        let goal_diff = f64::from(goals_for) - f64::from(goals_against);

        let mut performance = if goals_for > goals_against {
            results.wins += 1;
            results.points += 3;
            weighted_points += 3.0 * weight;
            WIN_BASE_SCORE + (goal_diff * GOAL_DIFF_SCORE_STEP).min(WIN_BONUS_CAP)
        } else if goals_for == goals_against {
            results.draws += 1;
            results.points += 1;
            weighted_points += weight;
            DRAW_SCORE
        } else {
            results.losses += 1;
            LOSS_BASE_SCORE + (goal_diff * GOAL_DIFF_SCORE_STEP).max(LOSS_PENALTY_CAP)
        };
        if goals_against == 0 {
            results.clean_sheets += 1;
            performance += CLEAN_SHEET_BONUS;
        }
        if goals_for == 0 {
            results.failed_to_score += 1;
            performance -= CLEAN_SHEET_BONUS;
        }
        performances.push(performance);

        weighted_goals_for += f64::from(goals_for) * weight;
        weighted_goals_against += f64::from(goals_against) * weight;
        total_weight += weight;
    }

    let form_rating = weighted_points / (3.0 * total_weight) * 100.0;
    let consistency = (100.0 - std_dev(&performances) / 2.0).max(0.0);
    let momentum = momentum(&performances);

    let form_factor = 0.8
        + form_rating / 100.0 * 0.4
        + (momentum / 200.0).clamp(-0.1, 0.1)
        + consistency / 100.0 * 0.1;

    let (trend, goals_trend) = window_trends(window, team_id);

    FormRecord {
        form_factor,
        form_rating,
        averages: FormAverages {
            weighted_points: weighted_points / total_weight,
            points_per_game: f64::from(results.points) / n as f64,
            goals_scored: weighted_goals_for / total_weight,
            goals_conceded: weighted_goals_against / total_weight,
            clean_sheet_ratio: f64::from(results.clean_sheets) / n as f64,
            failed_to_score_ratio: f64::from(results.failed_to_score) / n as f64,
        },
        results,
        trend,
        goals_trend,
        consistency,
        momentum,
        confidence: if n >= 6 {
            Confidence::High
        } else if n >= 4 {
            Confidence::Medium
        } else {
            Confidence::Low
        },
        matches_analyzed: n,
    }
}

/// Last three performances against the rest of the window. Fewer than six
/// matches collapses one side to the overall mean, damping the signal.
fn momentum(performances: &[f64]) -> f64 {
    let n = performances.len();
    let recent = if n >= MOMENTUM_WINDOW {
        mean(&performances[n - MOMENTUM_WINDOW..])
    } else {
        mean(performances)
    };
    let earlier = if n >= 2 * MOMENTUM_WINDOW {
        mean(&performances[..n - MOMENTUM_WINDOW])
    } else {
        mean(performances)
    };
    recent - earlier
}

fn window_trends(window: &[MatchRecord], team_id: u32) -> (Trend, Trend) {
    let mid = window.len() / 2;
    let (first_half, second_half) = window.split_at(mid);

    let points = |matches: &[MatchRecord]| -> i64 {
        matches
            .iter()
            .map(|m| {
                if m.is_win_for(team_id) {
                    3
                } else if m.home_goals == m.away_goals {
                    1
                } else {
                    0
                }
            })
            .sum()
    };
    let goals = |matches: &[MatchRecord]| -> i64 {
        matches.iter().map(|m| i64::from(m.goals_for(team_id))).sum()
    };

    let point_diff = (points(second_half) - points(first_half)) as f64;
    let goals_diff = (goals(second_half) - goals(first_half)) as f64;
    (
        classify_trend(point_diff, POINTS_TREND_STEP),
        classify_trend(goals_diff, GOALS_TREND_STEP),
    )
}

fn classify_trend(diff: f64, strong_step: f64) -> Trend {
    if diff > strong_step {
        Trend::StronglyImproving
    } else if diff > 0.0 {
        Trend::SlightlyImproving
    } else if diff < -strong_step {
        Trend::StronglyDeclining
    } else if diff < 0.0 {
        Trend::SlightlyDeclining
    } else {
        Trend::Stable
    }
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn std_dev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let variance = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    variance.sqrt()
}
