use crate::poisson::{poisson_cdf, poisson_point};
use crate::types::{AlternativeMarkets, TotalGoalsMarkets};

const EXACT_SCORE_MAX_GOALS: usize = 4;
const EXACT_SCORE_TOP_N: usize = 5;

/// Secondary markets derived from the expected-goals pair: likeliest exact
/// scores, over/under totals, and both-teams-to-score.
pub fn alternative_markets(home_xg: f64, away_xg: f64) -> AlternativeMarkets {
    let total_xg = home_xg + away_xg;
    AlternativeMarkets {
        exact_scores: exact_score_probabilities(home_xg, away_xg),
        total_goals: TotalGoalsMarkets {
            under_1_5: under_probability(total_xg, 1.5),
            under_2_5: under_probability(total_xg, 2.5),
            under_3_5: under_probability(total_xg, 3.5),
            over_1_5: over_probability(total_xg, 1.5),
            over_2_5: over_probability(total_xg, 2.5),
            over_3_5: over_probability(total_xg, 3.5),
        },
        both_teams_to_score: btts_probability(home_xg, away_xg),
    }
}

/// The five likeliest scorelines on a 0..=4 grid, most likely first.
pub fn exact_score_probabilities(home_xg: f64, away_xg: f64) -> Vec<(String, f64)> {
    let mut scores = Vec::with_capacity((EXACT_SCORE_MAX_GOALS + 1).pow(2));
    for home_goals in 0..=EXACT_SCORE_MAX_GOALS {
        for away_goals in 0..=EXACT_SCORE_MAX_GOALS {
            let p = poisson_point(home_goals, home_xg) * poisson_point(away_goals, away_xg);
            scores.push((format!("{home_goals}-{away_goals}"), p));
        }
    }
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    scores.truncate(EXACT_SCORE_TOP_N);
    scores
}

/// P(total goals under threshold); half-goal lines make this an inclusive
/// cdf at the floored threshold.
pub fn under_probability(expected: f64, threshold: f64) -> f64 {
    poisson_cdf(threshold.max(0.0) as u32, expected)
}

pub fn over_probability(expected: f64, threshold: f64) -> f64 {
    1.0 - under_probability(expected, threshold)
}

pub fn btts_probability(home_xg: f64, away_xg: f64) -> f64 {
    let no_home_goal = poisson_point(0, home_xg);
    let no_away_goal = poisson_point(0, away_xg);
    (1.0 - no_home_goal) * (1.0 - no_away_goal)
}
