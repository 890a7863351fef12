use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GOALS_PER_GAME: f64 = 1.5;
pub const DEFAULT_GOALS_AGAINST_PER_GAME: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    StronglyImproving,
    SlightlyImproving,
    Stable,
    SlightlyDeclining,
    StronglyDeclining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    High,
    Medium,
    Low,
}

/// One completed match, perspective-independent. Produced by the history
/// aggregator and the h2h fetch; never mutated after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: String,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub home_goals: u32,
    pub away_goals: u32,
    pub league_id: u32,
    pub season: i32,
    pub venue: Option<String>,
}

impl MatchRecord {
    pub fn result(&self) -> char {
        if self.home_goals > self.away_goals {
            'H'
        } else if self.home_goals < self.away_goals {
            'A'
        } else {
            'D'
        }
    }

    pub fn involves(&self, team_id: u32) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }

    pub fn is_home(&self, team_id: u32) -> bool {
        self.home_team_id == team_id
    }

    pub fn goals_for(&self, team_id: u32) -> u32 {
        if self.is_home(team_id) {
            self.home_goals
        } else {
            self.away_goals
        }
    }

    pub fn goals_against(&self, team_id: u32) -> u32 {
        if self.is_home(team_id) {
            self.away_goals
        } else {
            self.home_goals
        }
    }

    pub fn is_win_for(&self, team_id: u32) -> bool {
        self.goals_for(team_id) > self.goals_against(team_id)
    }

    pub fn parsed_date(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.date.trim()).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureTally {
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalStats {
    pub total: u32,
    pub per_game: f64,
    pub by_minute: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VenueSplit {
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountSplit {
    pub total: u32,
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardTotals {
    pub yellow: u32,
    pub red: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

/// Derived per-game metrics. Only present when at least one fixture was
/// played; callers fall back to neutral defaults otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonMetrics {
    pub points_per_game: f64,
    pub goals_per_game: f64,
    pub goals_against_per_game: f64,
    pub clean_sheet_percentage: f64,
    pub scoring_consistency: f64,
    pub home_win_percentage: f64,
    pub away_win_percentage: f64,
    pub defensive_stability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStatistics {
    pub available: bool,
    pub team_id: u32,
    pub league_id: u32,
    pub season: i32,
    pub fixtures: FixtureTally,
    pub goals_for: GoalStats,
    pub goals_against: GoalStats,
    pub home: VenueSplit,
    pub away: VenueSplit,
    pub clean_sheets: CountSplit,
    pub failed_to_score: CountSplit,
    pub cards: CardTotals,
    pub form: String,
    pub streaks: StreakRecord,
    /// League table context, filled in from standings when available.
    pub position: Option<i64>,
    pub points: Option<i64>,
    pub metrics: Option<SeasonMetrics>,
}

impl TeamStatistics {
    pub fn unavailable(team_id: u32, league_id: u32, season: i32) -> Self {
        Self {
            available: false,
            team_id,
            league_id,
            season,
            fixtures: FixtureTally::default(),
            goals_for: GoalStats::default(),
            goals_against: GoalStats::default(),
            home: VenueSplit::default(),
            away: VenueSplit::default(),
            clean_sheets: CountSplit::default(),
            failed_to_score: CountSplit::default(),
            cards: CardTotals::default(),
            form: String::new(),
            streaks: StreakRecord::default(),
            position: None,
            points: None,
            metrics: None,
        }
    }

    pub fn goals_per_game(&self) -> f64 {
        self.metrics
            .as_ref()
            .map_or(DEFAULT_GOALS_PER_GAME, |m| m.goals_per_game)
    }

    pub fn goals_against_per_game(&self) -> f64 {
        self.metrics
            .as_ref()
            .map_or(DEFAULT_GOALS_AGAINST_PER_GAME, |m| m.goals_against_per_game)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormResults {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub points: u32,
    pub clean_sheets: u32,
    pub failed_to_score: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormAverages {
    pub weighted_points: f64,
    pub points_per_game: f64,
    pub goals_scored: f64,
    pub goals_conceded: f64,
    pub clean_sheet_ratio: f64,
    pub failed_to_score_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    pub form_factor: f64,
    pub form_rating: f64,
    pub averages: FormAverages,
    pub results: FormResults,
    pub trend: Trend,
    pub goals_trend: Trend,
    pub consistency: f64,
    pub momentum: f64,
    pub confidence: Confidence,
    pub matches_analyzed: usize,
}

impl FormRecord {
    pub fn neutral() -> Self {
        Self {
            form_factor: 1.0,
            form_rating: 50.0,
            averages: FormAverages::default(),
            results: FormResults::default(),
            trend: Trend::Stable,
            goals_trend: Trend::Stable,
            consistency: 0.0,
            momentum: 0.0,
            confidence: Confidence::Low,
            matches_analyzed: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct H2HAnalysis {
    pub weighted_dominance: f64,
    pub recent_dominance: f64,
    pub overall_dominance: f64,
    pub venue_advantage: f64,
    pub result_consistency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct H2HMeetingSummary {
    pub date: String,
    pub home_goals: u32,
    pub away_goals: u32,
    pub hosted_by_home: bool,
    pub goal_difference: i64,
}

/// Head-to-head summary between a designated home team and away team.
/// All home_/away_ fields are from the designated home team's perspective,
/// not the venue of the historical meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct H2HRecord {
    pub h2h_factor: f64,
    pub home_wins: u32,
    pub away_wins: u32,
    pub draws: u32,
    pub avg_home_goals: f64,
    pub avg_away_goals: f64,
    pub analysis: H2HAnalysis,
    pub recent_meetings: Vec<H2HMeetingSummary>,
    pub confidence: Confidence,
    pub matches_analyzed: usize,
}

impl H2HRecord {
    pub fn neutral() -> Self {
        Self {
            h2h_factor: 1.0,
            home_wins: 0,
            away_wins: 0,
            draws: 0,
            avg_home_goals: 0.0,
            avg_away_goals: 0.0,
            analysis: H2HAnalysis::default(),
            recent_meetings: Vec::new(),
            confidence: Confidence::Low,
            matches_analyzed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthIndex {
    pub attack_strength: f64,
    pub defense_strength: f64,
    pub overall_strength: f64,
    pub attack_score: f64,
    pub defense_score: f64,
    pub form_score: f64,
    pub confidence: Confidence,
}

impl StrengthIndex {
    pub fn neutral() -> Self {
        Self {
            attack_strength: 1.0,
            defense_strength: 1.0,
            overall_strength: 1.0,
            attack_score: 0.0,
            defense_score: 0.0,
            form_score: 0.0,
            confidence: Confidence::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedGoals {
    pub home: f64,
    pub away: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardsEstimate {
    pub total: f64,
    pub home: f64,
    pub away: f64,
    #[serde(rename = "over_2.5")]
    pub over_2_5: f64,
    #[serde(rename = "over_3.5")]
    pub over_3_5: f64,
    #[serde(rename = "over_4.5")]
    pub over_4_5: f64,
}

impl CardsEstimate {
    pub fn default_cards() -> Self {
        Self {
            total: 3.5,
            home: 1.6,
            away: 1.9,
            over_2_5: 0.70,
            over_3_5: 0.45,
            over_4_5: 0.25,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalGoalsMarkets {
    #[serde(rename = "under_1.5")]
    pub under_1_5: f64,
    #[serde(rename = "under_2.5")]
    pub under_2_5: f64,
    #[serde(rename = "under_3.5")]
    pub under_3_5: f64,
    #[serde(rename = "over_1.5")]
    pub over_1_5: f64,
    #[serde(rename = "over_2.5")]
    pub over_2_5: f64,
    #[serde(rename = "over_3.5")]
    pub over_3_5: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlternativeMarkets {
    pub exact_scores: Vec<(String, f64)>,
    pub total_goals: TotalGoalsMarkets,
    pub both_teams_to_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSideAnalysis {
    pub form: String,
    pub recent_form: FormRecord,
    pub strength: StrengthIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAnalysisPair {
    pub home: TeamSideAnalysis,
    pub away: TeamSideAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionMeta {
    pub confidence: Confidence,
    pub home_games_analyzed: u32,
    pub away_games_analyzed: u32,
    pub error: Option<String>,
}

/// The final prediction entity handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub probabilities: OutcomeProbabilities,
    pub expected_goals: ExpectedGoals,
    pub cards: CardsEstimate,
    pub markets: Option<AlternativeMarkets>,
    pub team_analysis: Option<TeamAnalysisPair>,
    pub metadata: PredictionMeta,
}

pub const FALLBACK_HOME_WIN: f64 = 0.40;
pub const FALLBACK_DRAW: f64 = 0.25;
pub const FALLBACK_AWAY_WIN: f64 = 0.35;
pub const FALLBACK_HOME_XG: f64 = 1.5;
pub const FALLBACK_AWAY_XG: f64 = 1.3;

impl Prediction {
    /// The fixed neutral prediction returned whenever the pipeline cannot
    /// complete normally. Never raises; the error note explains why.
    pub fn fallback(note: &str) -> Self {
        Self {
            probabilities: OutcomeProbabilities {
                home_win: FALLBACK_HOME_WIN,
                draw: FALLBACK_DRAW,
                away_win: FALLBACK_AWAY_WIN,
            },
            expected_goals: ExpectedGoals {
                home: FALLBACK_HOME_XG,
                away: FALLBACK_AWAY_XG,
                total: FALLBACK_HOME_XG + FALLBACK_AWAY_XG,
            },
            cards: CardsEstimate::default_cards(),
            markets: None,
            team_analysis: None,
            metadata: PredictionMeta {
                confidence: Confidence::Low,
                home_games_analyzed: 0,
                away_games_analyzed: 0,
                error: Some(note.to_string()),
            },
        }
    }
}
