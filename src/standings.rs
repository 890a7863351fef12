use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::history::season_for;
use crate::provider::{DataProvider, response_array};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRank {
    pub rank: i64,
    pub points: i64,
}

/// League table context keyed by team id. Purely advisory: the close-match
/// test in the Poisson model is the only consumer, so a missing table
/// degrades to an empty map.
pub fn get_league_standings(
    provider: &dyn DataProvider,
    cache: &dyn ResultCache,
    league_id: u32,
) -> HashMap<u32, TeamRank> {
    let season = season_for(Utc::now());
    let cache_params = [
        ("league", league_id.to_string()),
        ("season", season.to_string()),
    ];
    if let Some(value) = cache.get("standings", &cache_params, None)
        && let Ok(table) = serde_json::from_value::<HashMap<u32, TeamRank>>(value)
    {
        debug!("standings cache hit for league {league_id}");
        return table;
    }

    let Some(payload) = provider.request("standings", &cache_params) else {
        warn!("no standings for league {league_id}");
        return HashMap::new();
    };

    let table = parse_standings(&payload);
    if !table.is_empty()
        && let Ok(value) = serde_json::to_value(&table)
    {
        cache.set("standings", &cache_params, value, None);
    }
    table
}

/// Standings arrive as response[0].league.standings[0]: one group per
/// league stage, each a ranked list of rows.
pub fn parse_standings(payload: &serde_json::Value) -> HashMap<u32, TeamRank> {
    let mut table = HashMap::new();
    let Some(first) = response_array(payload).first() else {
        return table;
    };
    let Some(groups) = first
        .get("league")
        .and_then(|l| l.get("standings"))
        .and_then(|s| s.as_array())
    else {
        return table;
    };
    for group in groups {
        let Some(rows) = group.as_array() else {
            continue;
        };
        for row in rows {
            let Some(team_id) = row
                .get("team")
                .and_then(|t| t.get("id"))
                .and_then(|id| id.as_u64())
            else {
                continue;
            };
            let rank = row.get("rank").and_then(|r| r.as_i64()).unwrap_or(0);
            let points = row.get("points").and_then(|p| p.as_i64()).unwrap_or(0);
            table
                .entry(team_id as u32)
                .or_insert(TeamRank { rank, points });
        }
    }
    table
}
