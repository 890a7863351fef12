use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "matchcast";
const CACHE_FILE: &str = "result_cache.json";

const DAY_HOURS: u64 = 24;
const WEEK_HOURS: u64 = 7 * 24;

/// Standings, fixture lists, and prediction-adjacent data only move when new
/// matches are played, so they keep for a week; everything else ages out
/// daily. `last_match_time` handles the "new results played since" case.
pub fn default_ttl_hours(data_type: &str) -> u64 {
    match data_type {
        "standings" | "fixtures" | "predictions" => WEEK_HOURS,
        _ => DAY_HOURS,
    }
}

/// Semantic cache key: digest of the data type plus the sorted parameter
/// pairs, so parameter order never splits entries.
pub fn cache_key(data_type: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    hasher.update(data_type.as_bytes());
    for (name, value) in sorted {
        hasher.update([0u8]);
        hasher.update(name.as_bytes());
        hasher.update([b'=']);
        hasher.update(value.as_bytes());
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Shared result cache. Writes are idempotent (entries are derived,
/// reproducible values), so last-write-wins is fine.
pub trait ResultCache: Send + Sync {
    fn get(
        &self,
        data_type: &str,
        params: &[(&str, String)],
        max_age_hours: Option<u64>,
    ) -> Option<Value>;

    fn set(
        &self,
        data_type: &str,
        params: &[(&str, String)],
        value: Value,
        last_match_time: Option<DateTime<Utc>>,
    );

    /// Drop entries of one data type, or everything when `None`.
    fn clear(&self, data_type: Option<&str>);
}

impl<C: ResultCache + ?Sized> ResultCache for &C {
    fn get(
        &self,
        data_type: &str,
        params: &[(&str, String)],
        max_age_hours: Option<u64>,
    ) -> Option<Value> {
        (**self).get(data_type, params, max_age_hours)
    }

    fn set(
        &self,
        data_type: &str,
        params: &[(&str, String)],
        value: Value,
        last_match_time: Option<DateTime<Utc>>,
    ) {
        (**self).set(data_type, params, value, last_match_time)
    }

    fn clear(&self, data_type: Option<&str>) {
        (**self).clear(data_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    data_type: String,
    value: Value,
    stored_at: i64,
    last_match_time: Option<i64>,
}

impl CacheEntry {
    fn is_fresh(&self, max_age_hours: Option<u64>, now: i64) -> bool {
        let limit_hours = max_age_hours.unwrap_or_else(|| default_ttl_hours(&self.data_type));
        let age_secs = now - self.stored_at;
        if age_secs >= (limit_hours * 3600) as i64 {
            return false;
        }
        // A match played after the entry was written invalidates it
        // regardless of age.
        if let Some(last_match) = self.last_match_time
            && last_match > self.stored_at
        {
            return false;
        }
        true
    }
}

fn new_entry(
    data_type: &str,
    value: Value,
    last_match_time: Option<DateTime<Utc>>,
) -> CacheEntry {
    CacheEntry {
        data_type: data_type.to_string(),
        value,
        stored_at: Utc::now().timestamp(),
        last_match_time: last_match_time.map(|t| t.timestamp()),
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultCache for MemoryCache {
    fn get(
        &self,
        data_type: &str,
        params: &[(&str, String)],
        max_age_hours: Option<u64>,
    ) -> Option<Value> {
        let key = cache_key(data_type, params);
        let entries = self.entries.read().expect("cache lock poisoned");
        let entry = entries.get(&key)?;
        if !entry.is_fresh(max_age_hours, Utc::now().timestamp()) {
            debug!("cache entry for {data_type} is stale");
            return None;
        }
        Some(entry.value.clone())
    }

    fn set(
        &self,
        data_type: &str,
        params: &[(&str, String)],
        value: Value,
        last_match_time: Option<DateTime<Utc>>,
    ) {
        let key = cache_key(data_type, params);
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(key, new_entry(data_type, value, last_match_time));
    }

    fn clear(&self, data_type: Option<&str>) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        match data_type {
            Some(data_type) => entries.retain(|_, e| e.data_type != data_type),
            None => entries.clear(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheFileData {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

/// File-backed cache. Loads once, serves from memory, and persists each
/// write with a tmp-file swap. A missing path means memory-only operation.
pub struct FileCache {
    path: Option<PathBuf>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl FileCache {
    pub fn open(path: PathBuf) -> Self {
        let entries = load_cache_file(&path);
        Self {
            path: Some(path),
            entries: RwLock::new(entries),
        }
    }

    pub fn open_default() -> Self {
        match default_cache_path() {
            Some(path) => Self::open(path),
            None => Self {
                path: None,
                entries: RwLock::new(HashMap::new()),
            },
        }
    }

    fn persist(&self, entries: &HashMap<String, CacheEntry>) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        let Some(dir) = path.parent() else {
            return;
        };
        let _ = fs::create_dir_all(dir);
        let data = CacheFileData {
            version: CACHE_VERSION,
            entries: entries.clone(),
        };
        let Ok(json) = serde_json::to_string(&data) else {
            return;
        };
        let tmp = path.with_extension("json.tmp");
        if fs::write(&tmp, json).is_ok() {
            let _ = fs::rename(&tmp, path);
        }
    }
}

impl ResultCache for FileCache {
    fn get(
        &self,
        data_type: &str,
        params: &[(&str, String)],
        max_age_hours: Option<u64>,
    ) -> Option<Value> {
        let key = cache_key(data_type, params);
        let entries = self.entries.read().expect("cache lock poisoned");
        let entry = entries.get(&key)?;
        if !entry.is_fresh(max_age_hours, Utc::now().timestamp()) {
            return None;
        }
        Some(entry.value.clone())
    }

    fn set(
        &self,
        data_type: &str,
        params: &[(&str, String)],
        value: Value,
        last_match_time: Option<DateTime<Utc>>,
    ) {
        let key = cache_key(data_type, params);
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(key, new_entry(data_type, value, last_match_time));
        self.persist(&entries);
    }

    fn clear(&self, data_type: Option<&str>) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        match data_type {
            Some(data_type) => entries.retain(|_, e| e.data_type != data_type),
            None => entries.clear(),
        }
        self.persist(&entries);
    }
}

/// Corrupt, missing, or version-mismatched cache files read as empty; cache
/// IO never blocks computation.
fn load_cache_file(path: &PathBuf) -> HashMap<String, CacheEntry> {
    let Ok(raw) = fs::read_to_string(path) else {
        return HashMap::new();
    };
    let data = serde_json::from_str::<CacheFileData>(&raw).unwrap_or_default();
    if data.version != CACHE_VERSION {
        return HashMap::new();
    }
    data.entries
}

fn default_cache_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(CACHE_FILE));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(CACHE_DIR)
            .join(CACHE_FILE),
    )
}
