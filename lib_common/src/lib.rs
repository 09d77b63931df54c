//! # lib_common
//!
//! Shared engine for the live race feed. Modules are gated by Cargo features
//! so a consumer can pull in just the payload model or the whole pipeline.
//!
//! Pipeline, leaves first:
//! `retrieve` (HTTP + cache) -> `sources` (OpenF1, Jolpica, simulation) ->
//! `core` (fallback chain, dispatcher) -> `processor` (payload shaping) ->
//! `ingestors` (the tick loop tying them together).

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod error;
pub mod gap;

#[cfg(feature = "retrieve")]
pub mod retrieve;

#[cfg(feature = "sources")]
pub mod sources;

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "processor")]
pub mod processor;

#[cfg(feature = "ingestors")]
pub mod ingestors;

pub use error::FeedError;

/// An opaque JSON tree as produced by an upstream source or the simulation.
///
/// Only the `processor` interprets its fields, and it does so defensively.
pub type RawRecord = serde_json::Value;
