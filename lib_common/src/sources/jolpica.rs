//! # Jolpica (Ergast) Standings Source
//!
//! Two layers:
//!
//! - [`JolpicaClient`] wraps the season-oriented API: schedule, driver
//!   standings and results. These change slowly and the API is rate limited,
//!   so every lookup goes through a [`ResultCache`] first.
//! - [`JolpicaSource`] turns the latest classified race of a season into a raw
//!   race record. It is the second link of the fallback chain: not live, but
//!   real data.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::LiveSource;
use crate::error::FeedError;
use crate::retrieve::{ApiClient, ResultCache};
use crate::RawRecord;

pub const JOLPICA_BASE: &str = "https://api.jolpi.ca/ergast/f1/";

/// Cached client for the season/standings API.
pub struct JolpicaClient {
    client: ApiClient,
    cache: Mutex<ResultCache>,
}

impl JolpicaClient {
    pub const NAME: &'static str = "jolpica";

    pub fn new(base_url: &str, timeout: Duration, cache_ttl: Duration) -> Result<Self, FeedError> {
        Ok(Self {
            client: ApiClient::new(Self::NAME, base_url, timeout)?,
            cache: Mutex::new(ResultCache::new(cache_ttl)),
        })
    }

    /// Race calendar for `season` (`current` or a year).
    pub async fn get_schedule(&self, season: &str) -> Result<RawRecord, FeedError> {
        self.cached(&format!("schedule:{}", season), &format!("{}.json", season))
            .await
    }

    pub async fn get_driver_standings(&self, season: &str) -> Result<RawRecord, FeedError> {
        self.cached(
            &format!("standings:{}", season),
            &format!("{}/driverStandings.json", season),
        )
        .await
    }

    /// Classification of the most recent race of `season`.
    pub async fn get_latest_results(&self, season: &str) -> Result<RawRecord, FeedError> {
        self.cached(
            &format!("results:{}", season),
            &format!("{}/last/results.json", season),
        )
        .await
    }

    async fn cached(&self, key: &str, path: &str) -> Result<RawRecord, FeedError> {
        let hit = self.lock_cache().get(key);
        if let Some(data) = hit {
            log::debug!("[{}] cache hit for {}", Self::NAME, key);
            return Ok(data);
        }

        let data = self.client.get_json(path, &[]).await?;
        if is_empty_payload(&data) {
            log::warn!("[{}] empty payload for {}, not caching", Self::NAME, key);
        } else {
            self.lock_cache().put(key, data.clone());
        }
        Ok(data)
    }

    // A panic while holding the lock cannot leave a half-written entry, so a
    // poisoned cache is still usable.
    fn lock_cache(&self) -> MutexGuard<'_, ResultCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_empty_payload(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Secondary source: the latest classified race of a season.
pub struct JolpicaSource {
    client: Arc<JolpicaClient>,
    season: String,
}

impl JolpicaSource {
    pub fn new(client: Arc<JolpicaClient>, season: &str) -> Self {
        Self {
            client,
            season: season.to_string(),
        }
    }
}

#[async_trait]
impl LiveSource for JolpicaSource {
    fn name(&self) -> &str {
        JolpicaClient::NAME
    }

    async fn fetch(&self) -> Result<RawRecord, FeedError> {
        let results = self.client.get_latest_results(&self.season).await?;
        map_latest_results(&results)
    }
}

/// Maps an Ergast `results.json` document to a raw race record.
///
/// Uses the last race in the `RaceTable`. Fails with `NoSessionFound` when
/// there is no race or the race has no classified results.
pub fn map_latest_results(results: &Value) -> Result<RawRecord, FeedError> {
    let race = results
        .pointer("/MRData/RaceTable/Races")
        .and_then(Value::as_array)
        .and_then(|races| races.last())
        .ok_or_else(|| FeedError::no_session(JolpicaClient::NAME, "no races in RaceTable"))?;

    let classified = race
        .get("Results")
        .and_then(Value::as_array)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| FeedError::no_session(JolpicaClient::NAME, "race has no results"))?;

    let mut ranked: Vec<&Value> = classified.iter().collect();
    ranked.sort_by_key(|result| {
        int_of(result.get("position"))
            .filter(|p| *p >= 1)
            .unwrap_or(i64::MAX)
    });

    let laps = ranked
        .first()
        .and_then(|winner| int_of(winner.get("laps")))
        .unwrap_or(0);

    // Renumbered 1..N so an unclassified entry never comes out as P0.
    let drivers: Vec<Value> = ranked
        .into_iter()
        .zip(1i64..)
        .map(|(result, position)| {
            let gap = if position == 1 {
                "LEAD".to_string()
            } else {
                result
                    .pointer("/Time/time")
                    .or_else(|| result.get("status"))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string()
            };

            let mut driver = json!({
                "id": str_at(result, "/Driver/driverId"),
                "team": str_at(result, "/Constructor/constructorId"),
                "position": position,
                "lapTime": gap,
            });
            if let Some(code) = result.pointer("/Driver/code").and_then(Value::as_str) {
                driver["code"] = json!(code);
            }
            driver
        })
        .collect();

    Ok(json!({
        "race": str_at(race, "/raceName"),
        "season": str_at(race, "/season"),
        "round": str_at(race, "/round"),
        "date": str_at(race, "/date"),
        "lap": laps,
        "totalLaps": laps,
        "drivers": drivers,
        "is_live": false,
        "source": JolpicaClient::NAME,
    }))
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or("")
}

/// Ergast encodes numbers as strings; accept both.
fn int_of(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
