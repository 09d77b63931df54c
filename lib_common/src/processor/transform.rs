//! # Payload Transformer
//!
//! Turns a raw race record (any source) into the [`RacePayload`] clients
//! render. Pure: the same record and options always give the same payload,
//! and malformed input degrades to defaults instead of failing.
//!
//! Sectors, map coordinates, pit stops and tyres are not measured. They are
//! deterministic functions of position and race progress so the dashboard has
//! something plausible to draw without telemetry.

use std::f64::consts::PI;

use serde_json::Value;

use super::payload::{Coordinates, DriverRecord, RacePayload, Sectors, SessionStatus, Tyre, Weather};
use crate::gap::synthetic_gap;
use crate::RawRecord;

/// Laps assumed when the record does not say.
pub const DEFAULT_TOTAL_LAPS: i64 = 50;
/// Lap-time sentinel some feeds use in place of a real value.
const LIVE_SENTINEL: &str = "LIVE";

/// Fixed session values that replace whatever the record reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOverride {
    pub status: SessionStatus,
    pub lap: i64,
    pub total_laps: i64,
}

impl Default for SessionOverride {
    /// Las Vegas, lap 42 of 50.
    fn default() -> Self {
        Self {
            status: SessionStatus::Race,
            lap: 42,
            total_laps: DEFAULT_TOTAL_LAPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    /// When set, status, lap and total laps come from here instead of the record.
    pub session_override: Option<SessionOverride>,
    pub weather: Weather,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            session_override: Some(SessionOverride::default()),
            weather: Weather {
                condition: "Clear".to_string(),
                temp: 21.0,
            },
        }
    }
}

impl TransformOptions {
    /// Options that trust the record's lap counts and classify the session by name.
    pub fn from_record() -> Self {
        Self {
            session_override: None,
            ..Self::default()
        }
    }
}

/// `round((total - pos + 1) / total * 100, 1)`, clamped to `[0, 100]`.
///
/// `total` is floored at 1. An unknown position (`<= 0`) scores 0.
pub fn win_probability(position: i64, total_drivers: usize) -> f64 {
    if position <= 0 {
        return 0.0;
    }
    let total = total_drivers.max(1) as f64;
    let raw = (total - position as f64 + 1.0) / total * 100.0;
    round_to(raw, 1).clamp(0.0, 100.0)
}

/// Builds the client payload for one tick.
pub fn transform(raw: &RawRecord, options: &TransformOptions) -> RacePayload {
    let race = raw.get("race").and_then(Value::as_str).unwrap_or("").to_string();

    let (status, lap, total_laps) = match options.session_override {
        Some(fixed) => (fixed.status, fixed.lap, fixed.total_laps),
        None => (
            SessionStatus::from_race_name(&race),
            int_field(raw, "lap").unwrap_or(0),
            int_field(raw, "totalLaps")
                .filter(|laps| *laps > 0)
                .unwrap_or(DEFAULT_TOTAL_LAPS),
        ),
    };

    let progress = if total_laps > 0 {
        lap as f64 / total_laps as f64
    } else {
        0.0
    };

    let entries: Vec<&Value> = raw
        .get("drivers")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter(|d| d.is_object()).collect())
        .unwrap_or_default();
    let total = entries.len();

    let mut drivers: Vec<DriverRecord> = entries
        .into_iter()
        .map(|entry| shape_driver(entry, total, progress))
        .collect();
    drivers.sort_by_key(|d| if d.position >= 1 { d.position } else { i64::MAX });

    RacePayload {
        race,
        lap,
        total_laps,
        status,
        weather: options.weather.clone(),
        drivers,
    }
}

fn shape_driver(entry: &Value, total: usize, progress: f64) -> DriverRecord {
    let id = entry.get("id").and_then(Value::as_str).unwrap_or("").to_string();
    let position = int_field(entry, "position").unwrap_or(0);

    let code = entry
        .get("code")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| id.chars().take(3).collect::<String>().to_uppercase());

    let pit_stops = pit_stops_at(progress);

    DriverRecord {
        code,
        team: entry.get("team").and_then(Value::as_str).unwrap_or("").to_string(),
        position,
        lap_time: lap_time_for(entry.get("lapTime"), position),
        win_probability: win_probability(position, total),
        sectors: sectors_for(position),
        coordinates: coordinates_for(position, progress),
        pit_stops,
        tyre: tyre_for(progress, pit_stops),
        id,
    }
}

/// The record's lap time unless it is missing or the `LIVE` sentinel.
fn lap_time_for(value: Option<&Value>, position: i64) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() && s != LIVE_SENTINEL => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(gap) if gap != 0.0 => format!("+{:.3}", gap),
            _ => synthetic_gap(position),
        },
        _ => synthetic_gap(position),
    }
}

fn sectors_for(position: i64) -> Sectors {
    let base_lap = 96.0 + position as f64 * 0.15;
    Sectors {
        s1: round_to(base_lap * 0.33, 3),
        s2: round_to(base_lap * 0.34, 3),
        s3: round_to(base_lap * 0.33, 3),
    }
}

/// A point on a circle of radius 40 around (50, 50); each position trails the
/// one ahead by 2% of a lap.
fn coordinates_for(position: i64, progress: f64) -> Coordinates {
    let driver_progress = (progress - position as f64 * 0.02).rem_euclid(1.0);
    let angle = driver_progress * 2.0 * PI;
    Coordinates {
        x: 50.0 + 40.0 * angle.cos(),
        y: 50.0 + 40.0 * angle.sin(),
    }
}

fn pit_stops_at(progress: f64) -> u32 {
    u32::from(progress > 0.3) + u32::from(progress > 0.7)
}

fn tyre_for(progress: f64, pit_stops: u32) -> Tyre {
    if pit_stops >= 2 {
        Tyre::Hard
    } else if progress < 0.3 {
        Tyre::Soft
    } else {
        Tyre::Medium
    }
}

/// Integer field that may arrive as a JSON number or a numeric string.
fn int_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Rounds the exact value of `value` to `decimals` places, ties to even.
///
/// Goes through float formatting, which is correctly rounded, instead of
/// scaling: `v * 10^n` is itself rounded and can land on the wrong side of a
/// half (6.25 -> 6.3, 32.0265 -> 32.027).
fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}
