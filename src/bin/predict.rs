use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use matchcast::cache::FileCache;
use matchcast::predictor::MatchPredictor;
use matchcast::provider::ApiFootballProvider;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let home_team_id = parse_arg(args.next(), "home_team_id")?;
    let away_team_id = parse_arg(args.next(), "away_team_id")?;
    let league_id = parse_arg(args.next(), "league_id")?;

    let provider = ApiFootballProvider::from_env()?;
    let cache = FileCache::open_default();
    let predictor = MatchPredictor::new(provider, cache);

    let prediction = predictor.predict(home_team_id, away_team_id, league_id);
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

fn parse_arg(arg: Option<String>, name: &str) -> Result<u32> {
    let raw = arg
        .ok_or_else(|| anyhow!("usage: predict <home_team_id> <away_team_id> <league_id>"))?;
    raw.trim()
        .parse::<u32>()
        .with_context(|| format!("{name} must be a numeric id, got {raw:?}"))
}
