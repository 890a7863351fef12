use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::cache::ResultCache;
use crate::form::analyze_form;
use crate::h2h::get_h2h_statistics;
use crate::history::fetch_team_history;
use crate::markets::alternative_markets;
use crate::poisson::{TeamOutlook, grid_outcomes, outcome_probabilities, poisson_cdf};
use crate::provider::DataProvider;
use crate::standings::get_league_standings;
use crate::strength::compute_strength;
use crate::team_stats::get_team_statistics;
use crate::types::{
    CardsEstimate, Confidence, ExpectedGoals, OutcomeProbabilities, Prediction, PredictionMeta,
    TeamAnalysisPair, TeamSideAnalysis,
};

const BASE_CARDS_PER_MATCH: f64 = 3.5;
const TIGHT_MATCH_XG_DIFF: f64 = 0.5;
const ONE_SIDED_XG_DIFF: f64 = 1.0;
const TIGHT_MATCH_CARDS_FACTOR: f64 = 1.2;
const ONE_SIDED_CARDS_FACTOR: f64 = 0.9;
const HOME_CARDS_SHARE: f64 = 0.45;

const SIMPLE_HOME_ADVANTAGE: f64 = 1.2;
const SIMPLE_XG_MIN: f64 = 0.3;
const SIMPLE_XG_MAX: f64 = 4.0;
const SIMPLE_MAX_GOALS: usize = 5;
const SIMPLE_DEFENSE_BASE: f64 = 2.0;

const PREDICTION_CACHE_HOURS: u64 = 1;
const DEFAULT_PREDICT_WORKERS: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FixtureRequest {
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub league_id: u32,
}

/// Orchestrates the prediction pipeline over an injected provider and
/// cache. Every public method is total: internal failures degrade to the
/// documented fallback prediction, never an error or panic.
pub struct MatchPredictor<P: DataProvider, C: ResultCache> {
    provider: P,
    cache: C,
}

impl<P: DataProvider, C: ResultCache> MatchPredictor<P, C> {
    pub fn new(provider: P, cache: C) -> Self {
        Self { provider, cache }
    }

    /// Full prediction for one fixture: history, form, season statistics,
    /// standings context, strength, head-to-head, Poisson model, cards,
    /// and secondary markets.
    pub fn predict(&self, home_team_id: u32, away_team_id: u32, league_id: u32) -> Prediction {
        let cache_params = [
            ("home_team_id", home_team_id.to_string()),
            ("away_team_id", away_team_id.to_string()),
            ("league_id", league_id.to_string()),
        ];
        if let Some(value) =
            self.cache
                .get("predictions", &cache_params, Some(PREDICTION_CACHE_HOURS))
            && let Ok(prediction) = serde_json::from_value::<Prediction>(value)
        {
            debug!("prediction cache hit for {home_team_id} vs {away_team_id}");
            return prediction;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.predict_inner(home_team_id, away_team_id, league_id)
        }));
        let prediction = match result {
            Ok(prediction) => prediction,
            Err(_) => {
                error!("prediction pipeline panicked for {home_team_id} vs {away_team_id}");
                Prediction::fallback("prediction pipeline failed unexpectedly")
            }
        };

        if prediction.metadata.error.is_none()
            && let Ok(value) = serde_json::to_value(&prediction)
        {
            self.cache.set("predictions", &cache_params, value, None);
        }
        prediction
    }

    fn predict_inner(&self, home_team_id: u32, away_team_id: u32, league_id: u32) -> Prediction {
        let provider: &dyn DataProvider = &self.provider;
        let cache: &dyn ResultCache = &self.cache;

        let home_history = fetch_team_history(provider, cache, home_team_id, league_id, None);
        let away_history = fetch_team_history(provider, cache, away_team_id, league_id, None);
        let home_form = analyze_form(&home_history.current_league, home_team_id);
        let away_form = analyze_form(&away_history.current_league, away_team_id);

        let mut home_stats = get_team_statistics(provider, cache, home_team_id, league_id);
        let mut away_stats = get_team_statistics(provider, cache, away_team_id, league_id);

        // Nothing at all from the provider means there is nothing to model;
        // hand back the documented fallback instead of dressing up noise.
        if !home_stats.available
            && !away_stats.available
            && home_history.current_league.is_empty()
            && away_history.current_league.is_empty()
        {
            return Prediction::fallback("no provider data available");
        }

        let standings = get_league_standings(provider, cache, league_id);
        if let Some(rank) = standings.get(&home_team_id) {
            home_stats.position = Some(rank.rank);
            home_stats.points = Some(rank.points);
        }
        if let Some(rank) = standings.get(&away_team_id) {
            away_stats.position = Some(rank.rank);
            away_stats.points = Some(rank.points);
        }

        let home_strength = compute_strength(Some(&home_stats), &home_form);
        let away_strength = compute_strength(Some(&away_stats), &away_form);

        let h2h = get_h2h_statistics(provider, cache, home_team_id, away_team_id);

        let home_outlook = TeamOutlook {
            goals_per_game: home_stats.goals_per_game(),
            attack_strength: home_strength.attack_strength,
            defense_strength: home_strength.defense_strength,
            position: home_stats.position,
            points: home_stats.points,
        };
        let away_outlook = TeamOutlook {
            goals_per_game: away_stats.goals_per_game(),
            attack_strength: away_strength.attack_strength,
            defense_strength: away_strength.defense_strength,
            position: away_stats.position,
            points: away_stats.points,
        };

        let (probabilities, expected_goals) =
            outcome_probabilities(&home_outlook, &away_outlook, h2h.h2h_factor);
        let cards = cards_estimate(&expected_goals);
        let markets = alternative_markets(expected_goals.home, expected_goals.away);

        let confidence = home_strength.confidence.min(away_strength.confidence);
        let metadata = PredictionMeta {
            confidence,
            home_games_analyzed: home_stats.fixtures.played,
            away_games_analyzed: away_stats.fixtures.played,
            error: None,
        };
        let team_analysis = TeamAnalysisPair {
            home: TeamSideAnalysis {
                form: home_stats.form.clone(),
                recent_form: home_form,
                strength: home_strength,
            },
            away: TeamSideAnalysis {
                form: away_stats.form.clone(),
                recent_form: away_form,
                strength: away_strength,
            },
        };

        Prediction {
            probabilities,
            expected_goals,
            cards,
            markets: Some(markets),
            team_analysis: Some(team_analysis),
            metadata,
        }
    }

    /// Fast degraded path: season statistics only, flat home advantage,
    /// bounded expected goals, no form or head-to-head input.
    pub fn simple_predict(
        &self,
        home_team_id: u32,
        away_team_id: u32,
        league_id: u32,
    ) -> Prediction {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.simple_predict_inner(home_team_id, away_team_id, league_id)
        }));
        match result {
            Ok(prediction) => prediction,
            Err(_) => {
                error!("simple prediction panicked for {home_team_id} vs {away_team_id}");
                Prediction::fallback("prediction pipeline failed unexpectedly")
            }
        }
    }

    fn simple_predict_inner(
        &self,
        home_team_id: u32,
        away_team_id: u32,
        league_id: u32,
    ) -> Prediction {
        let provider: &dyn DataProvider = &self.provider;
        let cache: &dyn ResultCache = &self.cache;
        let home_stats = get_team_statistics(provider, cache, home_team_id, league_id);
        let away_stats = get_team_statistics(provider, cache, away_team_id, league_id);

        let home_attack = home_stats.goals_per_game();
        let home_defense = SIMPLE_DEFENSE_BASE - home_stats.goals_against_per_game();
        let away_attack = away_stats.goals_per_game();
        let away_defense = SIMPLE_DEFENSE_BASE - away_stats.goals_against_per_game();

        let home_xg = (home_attack * away_defense * SIMPLE_HOME_ADVANTAGE)
            .clamp(SIMPLE_XG_MIN, SIMPLE_XG_MAX);
        let away_xg = (away_attack * home_defense).clamp(SIMPLE_XG_MIN, SIMPLE_XG_MAX);

        let (home_win, draw, away_win) = grid_outcomes(home_xg, away_xg, SIMPLE_MAX_GOALS);
        let total = home_win + draw + away_win;

        let games = home_stats.fixtures.played.min(away_stats.fixtures.played);
        let confidence = if games >= 10 {
            Confidence::High
        } else if games >= 5 {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        let expected_goals = ExpectedGoals {
            home: home_xg,
            away: away_xg,
            total: home_xg + away_xg,
        };
        let cards = cards_estimate(&expected_goals);

        Prediction {
            probabilities: OutcomeProbabilities {
                home_win: home_win / total,
                draw: draw / total,
                away_win: away_win / total,
            },
            expected_goals,
            cards,
            markets: None,
            team_analysis: None,
            metadata: PredictionMeta {
                confidence,
                home_games_analyzed: home_stats.fixtures.played,
                away_games_analyzed: away_stats.fixtures.played,
                error: None,
            },
        }
    }

    /// Predict many fixtures, preserving input order. The worker pool only
    /// overlaps provider latency; each prediction is independent, and a
    /// failing fixture yields its fallback rather than a gap.
    pub fn predict_batch(&self, fixtures: &[FixtureRequest]) -> Vec<Prediction> {
        with_predict_pool(|| {
            fixtures
                .par_iter()
                .map(|f| self.predict(f.home_team_id, f.away_team_id, f.league_id))
                .collect()
        })
    }
}

/// Expected cards from an intensity heuristic: tight fixtures run hotter,
/// one-sided fixtures cool down.
fn cards_estimate(expected_goals: &ExpectedGoals) -> CardsEstimate {
    let xg_gap = (expected_goals.home - expected_goals.away).abs();
    let intensity = if xg_gap < TIGHT_MATCH_XG_DIFF {
        TIGHT_MATCH_CARDS_FACTOR
    } else if xg_gap > ONE_SIDED_XG_DIFF {
        ONE_SIDED_CARDS_FACTOR
    } else {
        1.0
    };
    let total = BASE_CARDS_PER_MATCH * intensity;
    CardsEstimate {
        total,
        home: total * HOME_CARDS_SHARE,
        away: total * (1.0 - HOME_CARDS_SHARE),
        over_2_5: 1.0 - poisson_cdf(2, total),
        over_3_5: 1.0 - poisson_cdf(3, total),
        over_4_5: 1.0 - poisson_cdf(4, total),
    }
}

fn with_predict_pool<T: Send>(action: impl FnOnce() -> T + Send) -> T {
    let workers = predict_parallelism();
    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

fn predict_parallelism() -> usize {
    std::env::var("PREDICT_PARALLELISM")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(DEFAULT_PREDICT_WORKERS)
        .clamp(1, 8)
}
