//! Statistical match-outcome prediction engine for football fixtures.
//!
//! Raw match history and season statistics come in through an injected
//! [`provider::DataProvider`]; team strength, form, and head-to-head
//! analysis feed an independent-Poisson scoreline model, and the
//! [`predictor::MatchPredictor`] assembles the final prediction. Every
//! entry point degrades to a documented fallback instead of failing.

pub mod cache;
pub mod form;
pub mod h2h;
pub mod history;
pub mod http_client;
pub mod markets;
pub mod poisson;
pub mod predictor;
pub mod provider;
pub mod standings;
pub mod strength;
pub mod team_stats;
pub mod types;

pub use cache::{FileCache, MemoryCache, ResultCache};
pub use predictor::{FixtureRequest, MatchPredictor};
pub use provider::{ApiFootballProvider, DataProvider};
pub use types::Prediction;
