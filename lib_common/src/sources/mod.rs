//! # Upstream Sources
//!
//! Every provider the fallback chain can draw a raw race record from.
//!
//! ## Contained Modules:
//! - **`openf1`**: the live-timing API (sessions, laps, positions, intervals and
//!   drivers joined by a session key). Primary source.
//! - **`jolpica`**: the Ergast-compatible season/standings API, with a cached
//!   client for schedule, standings and results. Secondary source.
//! - **`simulation`**: a fixed roster that always succeeds. Terminal fallback
//!   and the only source in simulation-only mode.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

use async_trait::async_trait;

use crate::error::FeedError;
use crate::RawRecord;

pub mod jolpica;
pub mod openf1;
pub mod simulation;

pub use jolpica::{JolpicaClient, JolpicaSource, JOLPICA_BASE};
pub use openf1::{OpenF1Query, OpenF1Source, OPENF1_BASE};
pub use simulation::SimulationSource;

pub use crate::gap::{synthetic_gap, GAP_STEP_SECS};

/// A provider of raw race records.
///
/// Implementations may fail freely; the fallback chain logs the error and
/// moves on to the next provider.
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// Short name used in logs and in the `source` field of records.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<RawRecord, FeedError>;
}
