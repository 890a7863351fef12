use crate::types::{ExpectedGoals, OutcomeProbabilities};

pub const MAX_GOALS: usize = 10;

pub const HOME_WIN_CAP: f64 = 0.75;
pub const AWAY_WIN_CAP: f64 = 0.65;
pub const DRAW_FLOOR: f64 = 0.15;
pub const AWAY_WIN_FLOOR: f64 = 0.10;
const EXCESS_TO_DRAW: f64 = 0.6;
const EXCESS_TO_OTHER: f64 = 0.4;

const CLOSE_STRENGTH_DIFF: f64 = 0.2;
const CLOSE_POSITION_DIFF: i64 = 5;
const CLOSE_POINTS_DIFF: i64 = 10;

const CLOSE_HOME_BOOST: f64 = 1.01;
const CLOSE_AWAY_PENALTY: f64 = 0.99;
const OPEN_HOME_BOOST: f64 = 1.02;
const OPEN_AWAY_PENALTY: f64 = 0.98;

const CLOSE_RATIO_BOUNDS: (f64, f64) = (0.9, 1.1);
const OPEN_RATIO_BOUNDS: (f64, f64) = (0.8, 1.2);
const H2H_FACTOR_BOUNDS: (f64, f64) = (0.9, 1.1);

/// Everything the model needs to know about one side of a fixture.
#[derive(Debug, Clone)]
pub struct TeamOutlook {
    pub goals_per_game: f64,
    pub attack_strength: f64,
    pub defense_strength: f64,
    pub position: Option<i64>,
    pub points: Option<i64>,
}

impl TeamOutlook {
    pub fn neutral() -> Self {
        Self {
            goals_per_game: 1.5,
            attack_strength: 1.0,
            defense_strength: 1.0,
            position: None,
            points: None,
        }
    }
}

/// 1X2 probabilities and expected goals from both teams' outlooks and the
/// head-to-head factor.
pub fn outcome_probabilities(
    home: &TeamOutlook,
    away: &TeamOutlook,
    h2h_factor: f64,
) -> (OutcomeProbabilities, ExpectedGoals) {
    // Tight matchups get narrower adjustment ranges so a coin-flip fixture
    // is not talked into a strong favourite.
    let strength_diff = (home.attack_strength - away.attack_strength).abs();
    let position_diff = (home.position.unwrap_or(0) - away.position.unwrap_or(0)).abs();
    let points_diff = (home.points.unwrap_or(0) - away.points.unwrap_or(0)).abs();
    let is_close = strength_diff < CLOSE_STRENGTH_DIFF
        && position_diff <= CLOSE_POSITION_DIFF
        && points_diff <= CLOSE_POINTS_DIFF;

    let (home_boost, away_penalty, ratio_bounds) = if is_close {
        (CLOSE_HOME_BOOST, CLOSE_AWAY_PENALTY, CLOSE_RATIO_BOUNDS)
    } else {
        (OPEN_HOME_BOOST, OPEN_AWAY_PENALTY, OPEN_RATIO_BOUNDS)
    };

    let mut home_xg = home.goals_per_game * home_boost;
    let mut away_xg = away.goals_per_game * away_penalty;

    home_xg *= (home.attack_strength / away.defense_strength)
        .clamp(ratio_bounds.0, ratio_bounds.1);
    away_xg *= (away.attack_strength / home.defense_strength)
        .clamp(ratio_bounds.0, ratio_bounds.1);

    let h2h = h2h_factor.clamp(H2H_FACTOR_BOUNDS.0, H2H_FACTOR_BOUNDS.1);
    home_xg *= h2h;
    away_xg /= h2h;

    let (home_win, draw, away_win) = grid_outcomes(home_xg, away_xg, MAX_GOALS);
    let (home_win, draw, away_win) = apply_plausibility_clamps(home_win, draw, away_win);

    let total = home_win + draw + away_win;
    (
        OutcomeProbabilities {
            home_win: home_win / total,
            draw: draw / total,
            away_win: away_win / total,
        },
        ExpectedGoals {
            home: home_xg,
            away: away_xg,
            total: home_xg + away_xg,
        },
    )
}

/// Sum an independent-Poisson scoreline grid into win/draw/loss mass.
pub fn grid_outcomes(home_xg: f64, away_xg: f64, max_goals: usize) -> (f64, f64, f64) {
    let pmf_home = poisson_pmf(home_xg, max_goals);
    let pmf_away = poisson_pmf(away_xg, max_goals);

    let mut home_win = 0.0;
    let mut draw = 0.0;
    let mut away_win = 0.0;
    for (i, p_i) in pmf_home.iter().enumerate() {
        for (j, p_j) in pmf_away.iter().enumerate() {
            let p = p_i * p_j;
            if i > j {
                home_win += p;
            } else if i < j {
                away_win += p;
            } else {
                draw += p;
            }
        }
    }
    (home_win, draw, away_win)
}

/// Caps and floors in strict order: cap home, cap away, floor draw, floor
/// away. Redistribution keeps the total constant and no component ever
/// drops below zero.
fn apply_plausibility_clamps(
    mut home_win: f64,
    mut draw: f64,
    mut away_win: f64,
) -> (f64, f64, f64) {
    if home_win > HOME_WIN_CAP {
        let excess = home_win - HOME_WIN_CAP;
        home_win = HOME_WIN_CAP;
        draw += excess * EXCESS_TO_DRAW;
        away_win += excess * EXCESS_TO_OTHER;
    }

    if away_win > AWAY_WIN_CAP {
        let excess = away_win - AWAY_WIN_CAP;
        away_win = AWAY_WIN_CAP;
        draw += excess * EXCESS_TO_DRAW;
        home_win += excess * EXCESS_TO_OTHER;
    }

    if draw < DRAW_FLOOR {
        let shortage = DRAW_FLOOR - draw;
        draw = DRAW_FLOOR;
        if home_win > away_win {
            home_win = (home_win - shortage).max(0.0);
        } else {
            away_win = (away_win - shortage).max(0.0);
        }
    }

    if away_win < AWAY_WIN_FLOOR {
        let shortage = AWAY_WIN_FLOOR - away_win;
        away_win = AWAY_WIN_FLOOR;
        home_win = (home_win - shortage).max(0.0);
    }

    (home_win, draw, away_win)
}

/// Poisson pmf for k = 0..=max_k via the multiplicative recurrence; the
/// truncated tail mass is folded into the last bucket so the vector sums
/// to one.
pub fn poisson_pmf(lambda: f64, max_k: usize) -> Vec<f64> {
    let lambda = lambda.max(0.0);
    let mut out = vec![0.0; max_k + 1];
    out[0] = (-lambda).exp();
    for k in 1..=max_k {
        out[k] = out[k - 1] * lambda / k as f64;
    }
    let sum: f64 = out.iter().sum();
    if sum < 1.0 {
        out[max_k] += 1.0 - sum;
    }
    out
}

/// Exact Poisson point mass, without tail folding. Used where individual
/// scorelines are reported rather than aggregated.
pub fn poisson_point(k: usize, lambda: f64) -> f64 {
    let lambda = lambda.max(0.0);
    let mut p = (-lambda).exp();
    for i in 1..=k {
        p *= lambda / i as f64;
    }
    p
}

/// P(X <= k) for a Poisson rate.
pub fn poisson_cdf(k: u32, lambda: f64) -> f64 {
    let lambda = lambda.max(0.0);
    let mut term = (-lambda).exp();
    let mut total = term;
    for i in 1..=k {
        term *= lambda / f64::from(i);
        total += term;
    }
    total.min(1.0)
}
