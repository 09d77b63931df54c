//! Client-facing payload model. Field names are the wire contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Practice,
    Qualifying,
    Race,
}

impl SessionStatus {
    /// Classifies a session from its event name.
    pub fn from_race_name(race: &str) -> Self {
        if race.contains("Qualifying") {
            SessionStatus::Qualifying
        } else if race.contains("Practice") {
            SessionStatus::Practice
        } else {
            SessionStatus::Race
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tyre {
    Soft,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub condition: String,
    pub temp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sectors {
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRecord {
    pub id: String,
    pub code: String,
    pub team: String,
    pub position: i64,
    pub lap_time: String,
    pub win_probability: f64,
    pub sectors: Sectors,
    pub coordinates: Coordinates,
    pub pit_stops: u32,
    pub tyre: Tyre,
}

/// One tick's worth of display data. Drivers are in position order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RacePayload {
    pub race: String,
    pub lap: i64,
    pub total_laps: i64,
    pub status: SessionStatus,
    pub weather: Weather,
    pub drivers: Vec<DriverRecord>,
}
