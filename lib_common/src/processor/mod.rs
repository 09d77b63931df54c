//! # Payload Processor
//!
//! Shapes raw race records into the display payload broadcast to clients.
//!
//! - **`payload`**: the wire model (`RacePayload`, `DriverRecord`, ...).
//! - **`transform`**: the pure raw -> payload function and its derivations
//!   (win probability, sectors, coordinates, pit stops, tyres).

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod payload;
pub mod transform;

pub use payload::{Coordinates, DriverRecord, RacePayload, Sectors, SessionStatus, Tyre, Weather};
pub use transform::{transform, win_probability, SessionOverride, TransformOptions, DEFAULT_TOTAL_LAPS};

/// Transforms with the default options (fixed session override, clear weather).
pub fn process_data(raw: &crate::RawRecord) -> RacePayload {
    transform(raw, &TransformOptions::default())
}
