//! # Simulation Source
//!
//! A deterministic stand-in for the live feeds: a fixed Las Vegas roster with
//! proportional gaps. It cannot fail, which is what lets the fallback chain
//! promise a record on every tick. It is a display placeholder, not timing data.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{synthetic_gap, LiveSource};
use crate::error::FeedError;
use crate::RawRecord;

/// `(id, code, team)` in running order.
const ROSTER: [(&str, &str, &str); 10] = [
    ("verstappen", "VER", "red_bull"),
    ("norris", "NOR", "mclaren"),
    ("antonelli", "ANT", "mercedes"),
    ("piastri", "PIA", "mclaren"),
    ("leclerc", "LEC", "ferrari"),
    ("sainz", "SAI", "ferrari"),
    ("hamilton", "HAM", "mercedes"),
    ("perez", "PER", "red_bull"),
    ("alonso", "ALO", "aston_martin"),
    ("stroll", "STR", "aston_martin"),
];

#[derive(Debug, Clone, Default)]
pub struct SimulationSource;

impl SimulationSource {
    pub const NAME: &'static str = "simulation";

    pub fn new() -> Self {
        Self
    }

    /// The simulated record. Infallible; identical on every call.
    pub fn generate(&self) -> RawRecord {
        let drivers: Vec<Value> = ROSTER
            .iter()
            .zip(1i64..)
            .map(|(&(id, code, team), position)| {
                json!({
                    "id": id,
                    "code": code,
                    "team": team,
                    "position": position,
                    "lapTime": synthetic_gap(position),
                })
            })
            .collect();

        json!({
            "race": "Las Vegas Grand Prix",
            "season": "2024",
            "round": "23",
            "date": "2024-11-23",
            "drivers": drivers,
            "is_live": false,
            "source": Self::NAME,
        })
    }
}

#[async_trait]
impl LiveSource for SimulationSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch(&self) -> Result<RawRecord, FeedError> {
        Ok(self.generate())
    }
}
