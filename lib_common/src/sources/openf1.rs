//! # OpenF1 Live-Timing Source
//!
//! The primary source. One attempt is five requests against the OpenF1 API,
//! all keyed by the session found in the first one:
//!
//! 1. `sessions`  - find the session key for the configured meeting
//! 2. `laps`      - current lap = highest `lap_number` seen
//! 3. `position`  - latest position per driver
//! 4. `intervals` - latest gap to the car ahead per driver
//! 5. `drivers`   - acronym and team per driver number
//!
//! Any failed request fails the whole attempt; there is no stitching of
//! partial results. The join itself is a pure function ([`join_timing`]) so
//! it can be exercised without a network.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{synthetic_gap, LiveSource};
use crate::error::FeedError;
use crate::retrieve::ApiClient;
use crate::RawRecord;

pub const OPENF1_BASE: &str = "https://api.openf1.org/v1/";

/// Lap reported when the session has no lap data yet.
const DEFAULT_CURRENT_LAP: i64 = 42;
/// Sort key for entries that carry no position.
const UNKNOWN_POSITION: i64 = 99;
/// Page size for the per-session collections.
const PAGE_LIMIT: &str = "1000";

/// Which session to follow and how to label it.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenF1Query {
    pub meeting_name: String,
    pub year: i32,
    pub session_name: String,
    /// Display name of the event, e.g. `Las Vegas Grand Prix`.
    pub race_label: String,
    pub season: String,
    pub round: String,
    pub total_laps: i64,
}

impl Default for OpenF1Query {
    fn default() -> Self {
        Self {
            meeting_name: "Las Vegas".to_string(),
            year: 2024,
            session_name: "Race".to_string(),
            race_label: "Las Vegas Grand Prix".to_string(),
            season: "2024".to_string(),
            round: "23".to_string(),
            total_laps: 50,
        }
    }
}

pub struct OpenF1Source {
    client: ApiClient,
    query: OpenF1Query,
}

impl OpenF1Source {
    pub const NAME: &'static str = "openf1";

    pub fn new(base_url: &str, timeout: Duration, query: OpenF1Query) -> Result<Self, FeedError> {
        Ok(Self {
            client: ApiClient::new(Self::NAME, base_url, timeout)?,
            query,
        })
    }

    pub fn query(&self) -> &OpenF1Query {
        &self.query
    }

    /// GETs a per-session collection and insists on a JSON array.
    async fn session_collection(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<Value>, FeedError> {
        let url = self.client.url_for(path, query)?;
        match self.client.fetch_json(url.clone()).await? {
            Value::Array(items) => Ok(items),
            other => Err(FeedError::Decode {
                source_name: Self::NAME.to_string(),
                url: url.to_string(),
                message: format!("expected a JSON array, got {}", json_kind(&other)),
            }),
        }
    }
}

#[async_trait]
impl LiveSource for OpenF1Source {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch(&self) -> Result<RawRecord, FeedError> {
        let year = self.query.year.to_string();
        let sessions = self
            .session_collection(
                "sessions",
                &[
                    ("meeting_name", self.query.meeting_name.as_str()),
                    ("year", year.as_str()),
                    ("session_name", self.query.session_name.as_str()),
                    ("limit", "1"),
                ],
            )
            .await?;

        let session = sessions.first().ok_or_else(|| {
            FeedError::no_session(
                Self::NAME,
                format!(
                    "no {} {} session in {}",
                    self.query.meeting_name, self.query.session_name, self.query.year
                ),
            )
        })?;

        let session_key = match session.get("session_key") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(FeedError::no_session(Self::NAME, "session has no session_key")),
        };
        let key = session_key.as_str();
        log::debug!("[{}] following session {}", Self::NAME, key);

        let laps = self
            .session_collection("laps", &[("session_key", key), ("limit", PAGE_LIMIT)])
            .await?;
        let positions = self
            .session_collection("position", &[("session_key", key), ("limit", PAGE_LIMIT)])
            .await?;
        let intervals = self
            .session_collection("intervals", &[("session_key", key), ("limit", PAGE_LIMIT)])
            .await?;
        let drivers = self.session_collection("drivers", &[("session_key", key)]).await?;

        if positions.is_empty() {
            return Err(FeedError::no_session(Self::NAME, "no position data for session"));
        }

        Ok(join_timing(&self.query, session, &laps, &positions, &intervals, &drivers))
    }
}

/// Joins the per-session collections into one raw race record.
///
/// Per driver, the position and interval entries with the greatest `date`
/// win; on equal dates the first one seen is kept. Drivers are ranked by the
/// reported position (missing last, ties by car number) and numbered 1..N in
/// that order, so positions are unique and contiguous.
pub fn join_timing(
    query: &OpenF1Query,
    session: &Value,
    laps: &[Value],
    positions: &[Value],
    intervals: &[Value],
    drivers: &[Value],
) -> RawRecord {
    let current_lap = laps
        .iter()
        .map(|lap| lap.get("lap_number").and_then(Value::as_i64).unwrap_or(1))
        .max()
        .unwrap_or(DEFAULT_CURRENT_LAP);

    let latest_positions = latest_by_driver(positions);
    let latest_intervals = latest_by_driver(intervals);
    let driver_info: HashMap<i64, &Value> = drivers
        .iter()
        .filter_map(|d| d.get("driver_number").and_then(Value::as_i64).map(|n| (n, d)))
        .collect();

    let mut ranked: Vec<(i64, &Value)> = latest_positions.into_iter().collect();
    ranked.sort_by(|(num_a, a), (num_b, b)| {
        position_of(a)
            .unwrap_or(UNKNOWN_POSITION)
            .cmp(&position_of(b).unwrap_or(UNKNOWN_POSITION))
            .then(num_a.cmp(num_b))
    });

    // Renumbered 1..N: a stale latest entry can repeat another driver's
    // position, and some entries carry none at all.
    let drivers_out: Vec<Value> = ranked
        .into_iter()
        .zip(1i64..)
        .map(|((number, _), position)| {
            let info = driver_info.get(&number).copied();

            let acronym = info
                .and_then(|i| i.get("name_acronym"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("DR{}", number));

            let team = info
                .and_then(|i| i.get("team_name"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_lowercase()
                .replace(' ', "_");

            let gap = latest_intervals
                .get(&number)
                .and_then(|i| format_interval(i.get("interval")))
                .unwrap_or_else(|| synthetic_gap(position));

            json!({
                "id": acronym.to_lowercase(),
                "code": acronym,
                "team": team,
                "position": position,
                "lapTime": gap,
            })
        })
        .collect();

    json!({
        "race": query.race_label,
        "season": query.season,
        "round": query.round,
        "lap": current_lap,
        "totalLaps": query.total_laps,
        "date": session.get("date_start").and_then(Value::as_str).unwrap_or(""),
        "drivers": drivers_out,
        "is_live": true,
        "source": OpenF1Source::NAME,
    })
}

/// Keeps, per `driver_number`, the entry with the greatest `date`.
///
/// OpenF1 dates are ISO-8601 strings in a single offset, so lexical order is
/// chronological order.
fn latest_by_driver(entries: &[Value]) -> HashMap<i64, &Value> {
    let mut latest: HashMap<i64, &Value> = HashMap::new();
    for entry in entries {
        let Some(number) = entry.get("driver_number").and_then(Value::as_i64) else {
            continue;
        };
        let newer = latest
            .get(&number)
            .map_or(true, |current| date_of(entry).cmp(date_of(current)) == Ordering::Greater);
        if newer {
            latest.insert(number, entry);
        }
    }
    latest
}

fn date_of(entry: &Value) -> &str {
    entry.get("date").and_then(Value::as_str).unwrap_or("")
}

fn position_of(entry: &Value) -> Option<i64> {
    entry.get("position").and_then(Value::as_i64)
}

/// An interval worth showing, or `None` when the gap must be synthesized.
fn format_interval(interval: Option<&Value>) -> Option<String> {
    match interval? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => n.as_f64().filter(|g| *g != 0.0).map(|g| format!("+{:.3}", g)),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Value {
        json!({"session_key": 9644, "date_start": "2024-11-23T06:00:00+00:00"})
    }

    #[test]
    fn latest_entries_win_and_drivers_sort_by_position() {
        let positions = vec![
            json!({"driver_number": 1, "position": 1, "date": "2024-11-23T06:00:00"}),
            json!({"driver_number": 4, "position": 2, "date": "2024-11-23T06:00:00"}),
            json!({"driver_number": 1, "position": 2, "date": "2024-11-23T07:00:00"}),
            json!({"driver_number": 4, "position": 1, "date": "2024-11-23T07:00:00"}),
        ];
        let intervals = vec![
            json!({"driver_number": 1, "interval": 0.5, "date": "2024-11-23T06:59:00"}),
            json!({"driver_number": 1, "interval": 2.25, "date": "2024-11-23T07:00:00"}),
        ];
        let drivers = vec![
            json!({"driver_number": 1, "name_acronym": "VER", "team_name": "Red Bull Racing"}),
            json!({"driver_number": 4, "name_acronym": "NOR", "team_name": "McLaren"}),
        ];
        let laps = vec![json!({"lap_number": 49}), json!({"lap_number": 50})];

        let record = join_timing(&OpenF1Query::default(), &session(), &laps, &positions, &intervals, &drivers);

        assert_eq!(record["lap"], 50);
        assert_eq!(record["is_live"], true);
        assert_eq!(record["date"], "2024-11-23T06:00:00+00:00");
        let out = record["drivers"].as_array().unwrap();
        assert_eq!(out[0]["code"], "NOR");
        assert_eq!(out[0]["position"], 1);
        assert_eq!(out[0]["lapTime"], "LEAD");
        assert_eq!(out[1]["id"], "ver");
        assert_eq!(out[1]["team"], "red_bull_racing");
        assert_eq!(out[1]["lapTime"], "+2.250");
    }

    #[test]
    fn equal_dates_keep_the_first_entry() {
        let positions = vec![
            json!({"driver_number": 16, "position": 3, "date": "2024-11-23T07:00:00"}),
            json!({"driver_number": 16, "position": 5, "date": "2024-11-23T07:00:00"}),
            json!({"driver_number": 55, "position": 4, "date": "2024-11-23T07:00:00"}),
        ];
        let record = join_timing(&OpenF1Query::default(), &session(), &[], &positions, &[], &[]);
        assert_eq!(record["drivers"][0]["code"], "DR16");
        assert_eq!(record["drivers"][1]["code"], "DR55");
    }

    #[test]
    fn positions_are_renumbered_from_one() {
        let positions = vec![
            json!({"driver_number": 44, "position": 1, "date": "2024-11-23T07:00:00"}),
            json!({"driver_number": 81, "position": 1, "date": "2024-11-23T06:10:00"}),
            json!({"driver_number": 14, "date": "2024-11-23T07:00:00"}),
        ];
        let record = join_timing(&OpenF1Query::default(), &session(), &[], &positions, &[], &[]);

        let out = record["drivers"].as_array().unwrap();
        let order: Vec<(&str, i64)> = out
            .iter()
            .map(|d| (d["code"].as_str().unwrap(), d["position"].as_i64().unwrap()))
            .collect();
        assert_eq!(order, vec![("DR44", 1), ("DR81", 2), ("DR14", 3)]);
        assert_eq!(out[0]["lapTime"], "LEAD");
        assert_eq!(out[2]["lapTime"], "+2.468");
    }

    #[test]
    fn unknown_driver_degrades_to_numbered_code() {
        let positions = vec![
            json!({"driver_number": 1, "position": 1, "date": "d"}),
            json!({"driver_number": 4, "position": 2, "date": "d"}),
            json!({"driver_number": 43, "position": 3, "date": "d"}),
        ];
        let intervals = vec![json!({"driver_number": 43, "interval": null, "date": "d"})];

        let record = join_timing(&OpenF1Query::default(), &session(), &[], &positions, &intervals, &[]);
        let driver = &record["drivers"][2];

        assert_eq!(record["lap"], DEFAULT_CURRENT_LAP);
        assert_eq!(driver["code"], "DR43");
        assert_eq!(driver["id"], "dr43");
        assert_eq!(driver["team"], "");
        assert_eq!(driver["lapTime"], "+2.468");
    }

    #[test]
    fn string_intervals_pass_through() {
        assert_eq!(format_interval(Some(&json!("+1 LAP"))), Some("+1 LAP".to_string()));
        assert_eq!(format_interval(Some(&json!(""))), None);
        assert_eq!(format_interval(Some(&json!(0.0))), None);
        assert_eq!(format_interval(None), None);
    }
}
