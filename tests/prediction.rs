use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use matchcast::cache::MemoryCache;
use matchcast::poisson::{AWAY_WIN_CAP, AWAY_WIN_FLOOR, DRAW_FLOOR, HOME_WIN_CAP};
use matchcast::predictor::{FixtureRequest, MatchPredictor};
use matchcast::provider::DataProvider;
use matchcast::team_stats::get_team_statistics;
use matchcast::types::Confidence;

const STRONG: u32 = 50;
const WEAK: u32 = 51;
const LEAGUE: u32 = 39;

struct UnreachableProvider;

impl DataProvider for UnreachableProvider {
    fn request(&self, _endpoint: &str, _params: &[(&str, String)]) -> Option<Value> {
        None
    }
}

/// Canned provider for the two test teams. Counts requests so cache tests
/// can assert the provider was left alone.
struct ScriptedProvider {
    calls: AtomicUsize,
    fail_h2h: bool,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_h2h: false,
        }
    }

    fn without_h2h() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_h2h: true,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataProvider for ScriptedProvider {
    fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Option<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let param = |name: &str| {
            params
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.as_str())
        };
        match endpoint {
            "teams/statistics" => {
                let team: u32 = param("team")?.parse().ok()?;
                known_team(team).then(|| stats_payload(team))
            }
            "fixtures" => {
                let team: u32 = param("team")?.parse().ok()?;
                known_team(team).then(|| fixtures_payload(team, param("league").is_some()))
            }
            "fixtures/headtohead" => (!self.fail_h2h).then(h2h_payload),
            "standings" => Some(standings_payload()),
            _ => None,
        }
    }
}

fn known_team(team: u32) -> bool {
    team == STRONG || team == WEAK
}

fn fixture_row(
    date: &str,
    home: u32,
    away: u32,
    home_goals: u32,
    away_goals: u32,
    league: u32,
) -> Value {
    json!({
        "fixture": {"id": home * 10_000 + away, "date": date},
        "teams": {"home": {"id": home}, "away": {"id": away}},
        "goals": {"home": home_goals, "away": away_goals},
        "league": {"id": league, "season": 2024}
    })
}

fn fixtures_payload(team: u32, league_scoped: bool) -> Value {
    let opponent = 90;
    let mut rows: Vec<Value> = (0u32..8)
        .map(|i| {
            let date = format!("2025-01-{:02}T15:00:00+00:00", i + 1);
            let (goals_for, goals_against) = if team == STRONG {
                (2 + i % 2, 0)
            } else {
                (0, 1 + i % 2)
            };
            if i % 2 == 0 {
                fixture_row(&date, team, opponent, goals_for, goals_against, LEAGUE)
            } else {
                fixture_row(&date, opponent, team, goals_against, goals_for, LEAGUE)
            }
        })
        .collect();
    if !league_scoped {
        rows.push(fixture_row(
            "2025-01-20T19:45:00+00:00",
            team,
            opponent,
            1,
            1,
            999,
        ));
    }
    json!({"errors": [], "response": rows})
}

fn stats_payload(team: u32) -> Value {
    let (wins, draws, losses, goals_for, goals_against, clean_sheets, failed) = if team == STRONG {
        (14, 4, 2, 45, 15, 9, 2)
    } else {
        (3, 5, 12, 15, 35, 2, 8)
    };
    json!({
        "errors": [],
        "response": {
            "form": "WWDLW",
            "fixtures": {
                "played": {"home": 10, "away": 10, "total": 20},
                "wins": {"home": wins / 2, "away": wins - wins / 2, "total": wins},
                "draws": {"home": draws / 2, "away": draws - draws / 2, "total": draws},
                "loses": {"home": losses / 2, "away": losses - losses / 2, "total": losses}
            },
            "goals": {
                "for": {
                    "total": {"home": goals_for / 2, "away": goals_for - goals_for / 2, "total": goals_for},
                    "average": {"total": format!("{:.1}", goals_for as f64 / 20.0)}
                },
                "against": {
                    "total": {"home": goals_against / 2, "away": goals_against - goals_against / 2, "total": goals_against},
                    "average": {"total": format!("{:.1}", goals_against as f64 / 20.0)}
                }
            },
            "clean_sheet": {"home": clean_sheets / 2, "away": clean_sheets - clean_sheets / 2, "total": clean_sheets},
            "failed_to_score": {"home": failed / 2, "away": failed - failed / 2, "total": failed},
            "biggest": {"streak": {"wins": 4, "draws": 2, "loses": 2}}
        }
    })
}

fn h2h_payload() -> Value {
    let rows = vec![
        fixture_row("2025-01-10T15:00:00+00:00", STRONG, WEAK, 2, 0, LEAGUE),
        fixture_row("2024-09-10T15:00:00+00:00", WEAK, STRONG, 1, 1, LEAGUE),
        fixture_row("2024-02-10T15:00:00+00:00", STRONG, WEAK, 3, 1, LEAGUE),
    ];
    json!({"errors": [], "response": rows})
}

fn standings_payload() -> Value {
    json!({
        "errors": [],
        "response": [{
            "league": {
                "standings": [[
                    {"rank": 2, "points": 46, "team": {"id": STRONG}},
                    {"rank": 18, "points": 14, "team": {"id": WEAK}}
                ]]
            }
        }]
    })
}

#[test]
fn unreachable_provider_returns_exact_fallback() {
    let predictor = MatchPredictor::new(UnreachableProvider, MemoryCache::new());
    let prediction = predictor.predict(STRONG, WEAK, LEAGUE);

    assert_eq!(prediction.probabilities.home_win, 0.40);
    assert_eq!(prediction.probabilities.draw, 0.25);
    assert_eq!(prediction.probabilities.away_win, 0.35);
    assert_eq!(prediction.expected_goals.home, 1.5);
    assert_eq!(prediction.expected_goals.away, 1.3);
    assert_eq!(prediction.cards.total, 3.5);
    assert_eq!(prediction.metadata.confidence, Confidence::Low);
    assert!(prediction.metadata.error.is_some());
}

#[test]
fn full_pipeline_produces_coherent_prediction() {
    let predictor = MatchPredictor::new(ScriptedProvider::new(), MemoryCache::new());
    let prediction = predictor.predict(STRONG, WEAK, LEAGUE);

    assert!(prediction.metadata.error.is_none());
    let p = &prediction.probabilities;
    assert!((p.home_win + p.draw + p.away_win - 1.0).abs() < 1e-9);
    for prob in [p.home_win, p.draw, p.away_win] {
        assert!((0.0..=1.0).contains(&prob));
    }
    assert!(p.home_win <= HOME_WIN_CAP + 1e-9);
    assert!(p.away_win <= AWAY_WIN_CAP + 1e-9);
    assert!(p.draw >= DRAW_FLOOR - 1e-9);
    assert!(p.away_win >= AWAY_WIN_FLOOR - 1e-9);

    // The in-form side at home must be the favourite.
    assert!(p.home_win > p.away_win);
    assert!(prediction.expected_goals.home > prediction.expected_goals.away);
    assert!(
        (prediction.expected_goals.total
            - prediction.expected_goals.home
            - prediction.expected_goals.away)
            .abs()
            < 1e-9
    );

    assert_eq!(prediction.metadata.confidence, Confidence::High);
    assert_eq!(prediction.metadata.home_games_analyzed, 20);
    assert_eq!(prediction.metadata.away_games_analyzed, 20);

    let markets = prediction.markets.expect("full path attaches markets");
    assert_eq!(markets.exact_scores.len(), 5);
    let analysis = prediction
        .team_analysis
        .expect("full path attaches analysis");
    assert!(analysis.home.strength.overall_strength > analysis.away.strength.overall_strength);

    assert!(prediction.cards.over_2_5 >= prediction.cards.over_3_5);
    assert!(prediction.cards.over_3_5 >= prediction.cards.over_4_5);
}

#[test]
fn team_statistics_are_idempotent_within_ttl() {
    let provider = ScriptedProvider::new();
    let cache = MemoryCache::new();

    let first = get_team_statistics(&provider, &cache, STRONG, LEAGUE);
    let calls_after_first = provider.call_count();
    let second = get_team_statistics(&provider, &cache, STRONG, LEAGUE);

    assert_eq!(first, second);
    assert_eq!(provider.call_count(), calls_after_first);
}

#[test]
fn prediction_cache_spares_the_provider() {
    let provider = ScriptedProvider::new();
    let predictor = MatchPredictor::new(&provider, MemoryCache::new());

    let first = predictor.predict(STRONG, WEAK, LEAGUE);
    let calls_after_first = provider.call_count();
    let second = predictor.predict(STRONG, WEAK, LEAGUE);

    assert_eq!(first, second);
    assert_eq!(provider.call_count(), calls_after_first);
}

#[test]
fn missing_h2h_degrades_to_neutral_not_failure() {
    let predictor = MatchPredictor::new(ScriptedProvider::without_h2h(), MemoryCache::new());
    let prediction = predictor.predict(STRONG, WEAK, LEAGUE);
    assert!(prediction.metadata.error.is_none());
    assert!(prediction.probabilities.home_win > prediction.probabilities.away_win);
}

#[test]
fn batch_preserves_order_and_substitutes_fallbacks() {
    let predictor = MatchPredictor::new(ScriptedProvider::new(), MemoryCache::new());
    let fixtures = [
        FixtureRequest {
            home_team_id: STRONG,
            away_team_id: WEAK,
            league_id: LEAGUE,
        },
        FixtureRequest {
            home_team_id: 1,
            away_team_id: 2,
            league_id: LEAGUE,
        },
        FixtureRequest {
            home_team_id: WEAK,
            away_team_id: STRONG,
            league_id: LEAGUE,
        },
    ];

    let results = predictor.predict_batch(&fixtures);
    assert_eq!(results.len(), 3);

    assert!(results[0].metadata.error.is_none());
    // The unknown pairing fails internally and must surface as the fixed
    // fallback, not an omission.
    assert!(results[1].metadata.error.is_some());
    assert_eq!(results[1].probabilities.home_win, 0.40);
    assert!(results[2].metadata.error.is_none());

    // Order check: the strong side hosts the first fixture and travels in
    // the last, so the home-win estimates must differ accordingly.
    assert!(results[0].probabilities.home_win > results[2].probabilities.home_win);
}

#[test]
fn simple_predict_stays_within_bounds() {
    let predictor = MatchPredictor::new(ScriptedProvider::new(), MemoryCache::new());
    let prediction = predictor.simple_predict(STRONG, WEAK, LEAGUE);

    assert!(prediction.metadata.error.is_none());
    let p = &prediction.probabilities;
    assert!((p.home_win + p.draw + p.away_win - 1.0).abs() < 1e-9);
    assert!(prediction.expected_goals.home >= 0.3);
    assert!(prediction.expected_goals.home <= 4.0);
    assert!(prediction.expected_goals.away >= 0.3);
    assert!(prediction.expected_goals.away <= 4.0);
    assert!(prediction.markets.is_none());
    assert!(prediction.team_analysis.is_none());
    assert_eq!(prediction.metadata.confidence, Confidence::High);
}

#[test]
fn simple_predict_without_data_uses_defaults() {
    let predictor = MatchPredictor::new(UnreachableProvider, MemoryCache::new());
    let prediction = predictor.simple_predict(STRONG, WEAK, LEAGUE);

    assert!(prediction.metadata.error.is_none());
    assert_eq!(prediction.metadata.confidence, Confidence::Low);
    let p = &prediction.probabilities;
    assert!((p.home_win + p.draw + p.away_win - 1.0).abs() < 1e-9);
    // Flat home advantage on otherwise identical defaults.
    assert!(p.home_win > p.away_win);
}
