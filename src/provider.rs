use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::warn;

use crate::http_client::http_client;

const DEFAULT_BASE_URL: &str = "https://api-football-v1.p.rapidapi.com/v3";
const DEFAULT_DELAY_MS: u64 = 300;

/// Boundary to the sports-data API. `None` covers every failure mode:
/// network errors, non-200 statuses, API-level error fields, unparseable
/// bodies. Callers never distinguish between them.
pub trait DataProvider: Send + Sync {
    fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Option<Value>;
}

impl<P: DataProvider + ?Sized> DataProvider for &P {
    fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Option<Value> {
        (**self).request(endpoint, params)
    }
}

/// The `response` list of a provider payload. Missing, null, or non-array
/// values all read as empty, so malformed payloads degrade to "no data".
pub fn response_array(payload: &Value) -> &[Value] {
    payload
        .get("response")
        .and_then(|r| r.as_array())
        .map_or(&[], |a| a.as_slice())
}

/// The `response` mapping of a payload, for endpoints that return a single
/// object (team statistics) rather than a list.
pub fn response_object(payload: &Value) -> Option<&Value> {
    let response = payload.get("response")?;
    if response.is_object() && response.as_object().is_some_and(|o| !o.is_empty()) {
        Some(response)
    } else {
        None
    }
}

pub struct ApiFootballProvider {
    base_url: String,
    host: String,
    api_key: String,
    delay: Duration,
}

impl ApiFootballProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let host = reqwest::Url::parse(base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            host,
            api_key: api_key.to_string(),
            delay: Duration::from_millis(provider_delay_ms()),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("API_FOOTBALL_KEY").context("API_FOOTBALL_KEY is not set")?;
        let base_url = std::env::var("API_FOOTBALL_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(&base_url, &api_key))
    }
}

impl DataProvider for ApiFootballProvider {
    fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Option<Value> {
        // Politeness delay before every call, batch or not.
        std::thread::sleep(self.delay);

        let client = match http_client() {
            Ok(client) => client,
            Err(err) => {
                warn!("provider client unavailable: {err}");
                return None;
            }
        };

        let url = format!("{}/{endpoint}", self.base_url);
        let resp = client
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .query(params)
            .send();
        let resp = match resp {
            Ok(resp) => resp,
            Err(err) => {
                warn!("provider request to {endpoint} failed: {err}");
                return None;
            }
        };
        if !resp.status().is_success() {
            warn!("provider request to {endpoint} returned {}", resp.status());
            return None;
        }

        let payload: Value = match resp.json() {
            Ok(payload) => payload,
            Err(err) => {
                warn!("provider response from {endpoint} was not json: {err}");
                return None;
            }
        };

        // API-level errors arrive as a non-empty `errors` array or mapping
        // on an otherwise successful response.
        let api_error = match payload.get("errors") {
            Some(Value::Array(errs)) => !errs.is_empty(),
            Some(Value::Object(errs)) => !errs.is_empty(),
            _ => false,
        };
        if api_error {
            warn!("provider reported api errors for {endpoint}");
            return None;
        }

        Some(payload)
    }
}

fn provider_delay_ms() -> u64 {
    std::env::var("PROVIDER_DELAY_MS")
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(DEFAULT_DELAY_MS)
        .clamp(0, 5_000)
}
