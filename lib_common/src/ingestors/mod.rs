//! # Data Ingestors Module
//!
//! Long-running tasks that pull data into the system and push it out to
//! subscribers.
//!
//! ## Contained Modules:
//! - **`race_polling`**: the self-scheduling tick loop that collects a race
//!   record through the fallback chain, shapes it and broadcasts it.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// The self-scheduling collect/transform/broadcast loop.
pub mod race_polling;

// --- Public API Re-exports ---
pub use race_polling::{PollResult, RacePollingPlugin, DEFAULT_TICK_INTERVAL};
